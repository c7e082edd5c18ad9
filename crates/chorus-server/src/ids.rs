//! Branded string identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, time-ordered id.
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7()))
            }

            /// Wrap an existing string without validation.
            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Borrow the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

branded_id!(
    /// Identity of one WebSocket connection, stable for its lifetime.
    ClientId,
    "client"
);
branded_id!(
    /// Identity of one started sound. Changes on every replace.
    SoundId,
    "snd"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_has_prefix() {
        let id = ClientId::new();
        assert!(id.as_str().starts_with("client_"), "got: {id}");
    }

    #[test]
    fn sound_id_has_prefix() {
        let id = SoundId::new();
        assert!(id.as_str().starts_with("snd_"), "got: {id}");
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(ClientId::new(), ClientId::new());
        assert_ne!(SoundId::new(), SoundId::new());
    }

    #[test]
    fn serializes_as_bare_string() {
        let id = ClientId::from_raw("client_abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"client_abc\"");
    }

    #[test]
    fn display_and_from_str_agree() {
        let id = ClientId::new();
        let parsed: ClientId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
