//! Identity types for optimistic reconciliation
//!
//! Both identifiers are 64-bit counters. Neither is ever reused within a
//! reconciler instance.

use std::fmt;

/// Locally generated sequence number for an optimistic move
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MoveId(pub u64);

impl MoveId {
    pub const FIRST: MoveId = MoveId(1);

    #[inline]
    pub fn new(id: u64) -> Self {
        MoveId(id)
    }

    /// The id following this one
    #[inline]
    pub fn next(self) -> Self {
        MoveId(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for MoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move(#{})", self.0)
    }
}

impl fmt::Display for MoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Authoritative state revision
///
/// Advances only when the authority accepts a move or the client resyncs,
/// never on local optimistic application.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub u64);

impl Version {
    /// Revision of a freshly constructed reconciler
    pub const INITIAL: Version = Version(1);

    #[inline]
    pub fn new(v: u64) -> Self {
        Version(v)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// The revision following this one, saturating at `u64::MAX`
    #[inline]
    pub fn next(self) -> Self {
        Version(self.0.saturating_add(1))
    }

    /// True if `self` is strictly newer than `other`
    #[inline]
    pub fn is_newer_than(self, other: Version) -> bool {
        self.0 > other.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::INITIAL
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_version_starts_at_one() {
        assert_eq!(Version::default(), Version::INITIAL);
        assert_eq!(Version::INITIAL.as_u64(), 1);
        assert_eq!(Version::INITIAL.next(), Version::new(2));
    }

    #[test]
    fn test_version_next_saturates() {
        let last = Version::new(u64::MAX);
        assert_eq!(last.next(), last);
        assert!(!last.next().is_newer_than(last));
    }

    #[test]
    fn test_move_id_display() {
        assert_eq!(MoveId::new(7).to_string(), "#7");
        assert_eq!(format!("{:?}", MoveId::FIRST), "Move(#1)");
        assert_eq!(Version::new(3).to_string(), "v3");
    }

    proptest! {
        #[test]
        fn prop_next_version_is_newer(v in 0u64..u64::MAX) {
            let version = Version::new(v);
            prop_assert!(version.next().is_newer_than(version));
            prop_assert!(!version.is_newer_than(version));
        }

        #[test]
        fn prop_move_id_ordering_follows_next(id in 0u64..u64::MAX) {
            let id = MoveId::new(id);
            prop_assert!(id.next() > id);
        }
    }
}
