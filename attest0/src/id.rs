//! Typed ID wrappers for agents, ledger actors, interactions, and logics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up an agent's public identifier with
/// its ledger address, or an interaction id with a conversation id.
/// These are just strings underneath; the ledger decides their format.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True if the ID is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(AgentId, "Public identifier of an agent in the identity registry.");
typed_id!(
    ActorAddress,
    "Ledger address of an actor; names the partition that actor owns."
);
typed_id!(
    InteractionId,
    "Correlation identifier for one logical exchange. Empty until minted."
);
typed_id!(LogicId, "Identifier of the deployed interaction logic on the ledger.");

/// Normalize a user-supplied identifier or address.
///
/// Trims whitespace and prefixes bare 64-character hex strings with `0x`.
/// Anything else is returned trimmed but otherwise untouched.
pub fn normalize_identifier(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with("0x") {
        return trimmed.to_owned();
    }
    if trimmed.len() == 64 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return format!("0x{trimmed}");
    }
    trimmed.to_owned()
}
