//! Failures of the app record store.

use thiserror::Error;

pub type HydraResult<T> = Result<T, HydraError>;

/// Only storage and encoding fail. A record without `appId`, an unknown id
/// or a taken id on insert are ordinary `None`/`false` results.
#[derive(Debug, Error)]
pub enum HydraError {
    /// The redb file could not be created, opened or locked.
    #[error("failed to open record store: {0}")]
    Open(String),

    /// Beginning or committing a redb transaction failed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// The `apps` table could not be opened.
    #[error("apps table error: {0}")]
    Table(String),

    /// Lookup or iteration over `apps` failed.
    #[error("read error: {0}")]
    Read(String),

    /// Putting or deleting a record failed.
    #[error("write error: {0}")]
    Write(String),

    /// A record could not be encoded as JSON.
    #[error("cannot encode app record: {0}")]
    Serialize(String),

    /// A stored document is not a valid app record, for example one with
    /// an unknown strategy code.
    #[error("cannot decode stored app record: {0}")]
    Deserialize(String),

    /// Raised by `RecordBackend` implementations other than redb.
    #[error("backend error: {0}")]
    Backend(String),
}
