//! Catalogs shared across Hydra crates.
//!
//! Strategies and server states travel as small integer codes on the wire
//! and in persisted records. Each catalog also round-trips through its
//! SCREAMING_SNAKE name so operators can type `ROUND_ROBIN` instead of `1`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to decode a catalog value from its code or name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown {catalog} code: {code}")]
    UnknownCode { catalog: &'static str, code: u8 },

    #[error("unknown {catalog} name: {name}")]
    UnknownName { catalog: &'static str, name: String },
}

/// Declare a catalog enum with fixed integer codes and canonical names.
macro_rules! catalog {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every value in code order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(self) -> u8 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.code()
            }
        }

        impl TryFrom<u8> for $name {
            type Error = CatalogError;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(CatalogError::UnknownCode { catalog: $label, code }),
                }
            }
        }

        impl FromStr for $name {
            type Err = CatalogError;

            /// Accepts either the canonical name (case-insensitive) or the numeric code.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if let Ok(code) = trimmed.parse::<u8>() {
                    return $name::try_from(code);
                }
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| CatalogError::UnknownName {
                        catalog: $label,
                        name: trimmed.to_string(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

catalog! {
    /// How load is spread across the servers of one application.
    LocalStrategy, "local strategy" {
        Indifferent = 0 => "INDIFFERENT",
        RoundRobin = 1 => "ROUND_ROBIN",
        /// Prefer the least loaded server.
        ServerLoad = 2 => "SERVER_LOAD",
    }
}

catalog! {
    /// How load is spread across clouds hosting an application.
    CloudStrategy, "cloud strategy" {
        Indifferent = 0 => "INDIFFERENT",
        RoundRobin = 1 => "ROUND_ROBIN",
        Cheapest = 2 => "CHEAPEST",
        CloudLoad = 3 => "CLOUD_LOAD",
    }
}

catalog! {
    /// Availability of a server (or of a whole application).
    ServerState, "server state" {
        Ready = 0 => "READY",
        Unavailable = 1 => "UNAVAILABLE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_catalog() {
        assert_eq!(LocalStrategy::ServerLoad.code(), 2);
        assert_eq!(CloudStrategy::CloudLoad.code(), 3);
        assert_eq!(ServerState::Unavailable.code(), 1);
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&CloudStrategy::Cheapest).unwrap(), "2");
        let state: ServerState = serde_json::from_str("0").unwrap();
        assert_eq!(state, ServerState::Ready);
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = serde_json::from_str::<LocalStrategy>("7").unwrap_err();
        assert!(err.to_string().contains("unknown local strategy code: 7"));
        assert_eq!(
            ServerState::try_from(9),
            Err(CatalogError::UnknownCode { catalog: "server state", code: 9 })
        );
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("round_robin".parse::<LocalStrategy>(), Ok(LocalStrategy::RoundRobin));
        assert_eq!("CHEAPEST".parse::<CloudStrategy>(), Ok(CloudStrategy::Cheapest));
        assert_eq!(" 1 ".parse::<ServerState>(), Ok(ServerState::Unavailable));
        assert!("SIDEWAYS".parse::<CloudStrategy>().is_err());
    }

    #[test]
    fn display_uses_canonical_name() {
        assert_eq!(LocalStrategy::ServerLoad.to_string(), "SERVER_LOAD");
    }
}
