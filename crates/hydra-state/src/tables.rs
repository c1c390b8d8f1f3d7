//! redb table definitions for the Hydra record store.

use redb::TableDefinition;

/// App records keyed by `appId`, values are JSON-serialized `AppRecord`s.
pub const APPS: TableDefinition<&str, &[u8]> = TableDefinition::new("apps");
