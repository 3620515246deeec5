//! Availability scopes and the legacy name-suffix convention.
//!
//! Documents may declare `availability` explicitly. Older documents encode it
//! in the last two characters of the cluster name instead:
//!
//! | suffix | scope    |
//! |--------|----------|
//! | `in`   | internal |
//! | `ex`   | external |
//! | `ie`   | both     |
//!
//! Anything else cannot be served and rejects the document.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fragment::model::ListenerIdentity;

/// Which listeners a cluster or route may be reached from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Internal,
    External,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot derive availability from name {name:?}: expected suffix \"in\", \"ex\" or \"ie\"")]
pub struct AvailabilityError {
    pub name: String,
}

impl Availability {
    /// Derive the scope from the name suffix convention.
    pub fn from_name_suffix(name: &str) -> Result<Self, AvailabilityError> {
        let suffix = name
            .len()
            .checked_sub(2)
            .and_then(|start| name.get(start..));

        match suffix {
            Some("in") => Ok(Availability::Internal),
            Some("ex") => Ok(Availability::External),
            Some("ie") => Ok(Availability::Both),
            _ => Err(AvailabilityError { name: name.to_string() }),
        }
    }

    /// Whether a listener with the given identity may serve this scope.
    pub fn serves(self, listener: ListenerIdentity) -> bool {
        matches!(
            (self, listener),
            (Availability::Both, _)
                | (Availability::Internal, ListenerIdentity::Internal)
                | (Availability::External, ListenerIdentity::External)
        )
    }

    /// Listeners this scope is reachable from.
    pub fn listeners(self) -> impl Iterator<Item = ListenerIdentity> {
        ListenerIdentity::ALL.into_iter().filter(move |l| self.serves(*l))
    }
}
