use serde::{Deserialize, Serialize};
use std::fmt;

/// Bus address of a node kind.
///
/// Addresses are handed out by the system assembler, one per node kind. The
/// registry refuses a second node claiming an address that is already live,
/// which makes "one instance per kind" an invariant of the [`Manager`].
///
/// [`Manager`]: crate::scheduling::Manager
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Address(u32);

impl Address {
    /// Broadcast destination, or "unaddressed" when used as a source
    pub const BROADCAST: Address = Address(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_broadcast(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Address {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<Address> for u32 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast() {
        assert!(Address::BROADCAST.is_broadcast());
        assert!(Address::default().is_broadcast());
        assert!(!Address::new(4).is_broadcast());
        assert_eq!(Address::from(4u32).raw(), 4);
        assert_eq!(Address::new(12).to_string(), "#12");
    }
}
