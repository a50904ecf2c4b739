use thiserror::Error;

/// Errors reported by this crate.
///
/// Lookups and mutations never fail; errors come only from rejected configuration
/// and from [`BTree::verify`](crate::BTree::verify).
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    #[error("illegal branching factor {0}, must be at least 2")]
    InvalidBranchingFactor(usize),

    #[error("page of {page_size} bytes cannot hold a node of {slot_size}-byte entries")]
    PageTooSmall { page_size: usize, slot_size: usize },

    #[error("invariant violated in {node}: {kind}")]
    Invariant { node: NodeRef, kind: InvariantViolation },
}

/// Identifies a node in a structural error.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeRef {
    /// Slot index of the node in the tree's node store.
    pub index: usize,
    /// Distance from the root (the root is at depth 0).
    pub depth: usize,
    /// Whether the node is a leaf.
    pub leaf: bool,
}

impl core::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kind = if self.leaf { "leaf" } else { "inner" };
        write!(f, "{kind} node #{} at depth {}", self.index, self.depth)
    }
}

/// The structural rule a node broke.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum InvariantViolation {
    #[error("length {len} exceeds capacity {capacity}")]
    Overfull { len: usize, capacity: usize },

    #[error("length {len} below minimum {min}")]
    Underfull { len: usize, min: usize },

    #[error("keys not strictly increasing at index {index}")]
    Unordered { index: usize },

    #[error("lesser child's maximum is not below separator {index}")]
    LesserChildOutOfOrder { index: usize },

    #[error("greater child's minimum is not above separator {index}")]
    GreaterChildOutOfOrder { index: usize },

    #[error("inner node holds no entries")]
    EmptyInnerNode,

    #[error("child count {children} does not match length {len} + 1")]
    ChildCount { len: usize, children: usize },

    #[error("leaf at depth {found}, expected {expected}")]
    LeafDepth { expected: usize, found: usize },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
