//! Stable ID newtypes for schema tree entities.
//!
//! `NodeRef` and `LeafRef` are distinct newtype wrappers over `u16`
//! (the schema tree is arena-indexed, mirroring the original's
//! `ScvalHandle`), so a node index can never be mistaken for a leaf
//! index at the type level.

use std::fmt;

/// Sentinel meaning "no node/leaf here", matching the original's
/// `INVALIDHANDLE = 0xffff`.
const INVALID: u16 = 0xffff;

/// Index of a node in a [`crate::tree::Tree`]'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub u16);

/// Index of a leaf (interned identifier) in a [`crate::tree::Tree`]'s leaf pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafRef(pub u16);

impl NodeRef {
    pub const INVALID: NodeRef = NodeRef(INVALID);

    pub fn is_valid(self) -> bool {
        self.0 != INVALID
    }
}

impl LeafRef {
    pub const INVALID: LeafRef = LeafRef(INVALID);

    pub fn is_valid(self) -> bool {
        self.0 != INVALID
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LeafRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_sentinel_is_not_valid() {
        assert!(!NodeRef::INVALID.is_valid());
        assert!(!LeafRef::INVALID.is_valid());
    }

    #[test]
    fn concrete_refs_are_valid() {
        assert!(NodeRef(0).is_valid());
        assert!(LeafRef(41).is_valid());
    }

    #[test]
    fn display_prints_inner_value() {
        assert_eq!(format!("{}", NodeRef(7)), "7");
        assert_eq!(format!("{}", LeafRef(3)), "3");
    }
}
