use core::num::NonZero;

type RawNodeId = u32;

/// Identifies a node slot in the tree's [`Arena`](super::arena::Arena).
///
/// This is the in-memory stand-in for a page identifier: a node laid onto a page
/// file would be addressed by the same kind of small integer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub(crate) struct NodeId(NonZero<RawNodeId>);

impl NodeId {
    pub(crate) const MAX: usize = (RawNodeId::MAX - 1) as usize;

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX, "`NodeId::from_index()` - `index` > `NodeId::MAX`!");
        // `index + 1` cannot be zero and cannot overflow.
        #[allow(clippy::cast_possible_truncation)]
        Self(NonZero::new((index + 1) as RawNodeId).unwrap())
    }

    #[inline]
    pub(crate) const fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}
