//! Observer identities.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable key for one subscribing UI unit.
///
/// Identities are minted by the caller and compared by value. Nothing in the
/// store keeps an observer alive; its owner calls
/// [`Subscription::unsubscribe`](crate::Subscription::unsubscribe) on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObserverId(Uuid);

impl ObserverId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ObserverId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
