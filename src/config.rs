use core::mem::size_of;

use crate::error::{Error, Result};
use crate::order::NaturalOrder;
use crate::raw::NodeId;

/// Branching factor used by [`Config::default`] and [`BTree::new`](crate::BTree::new).
pub const DEFAULT_BRANCHING_FACTOR: usize = 16;

/// Default disk page size of the page file a tree is meant to be laid onto.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Immutable tree configuration: the minimum degree `t` and the key ordering.
///
/// Every node holds at most `2t` entries and, except for the root, at least `t`.
/// The tree owns its configuration and lends it to node operations; it is never
/// changed after construction.
///
/// # Examples
///
/// ```
/// use termos_btree::{Config, Error, NaturalOrder};
///
/// let config = Config::new(4, NaturalOrder).unwrap();
/// assert_eq!(config.capacity(), 8);
///
/// assert_eq!(Config::new(1, NaturalOrder).unwrap_err(), Error::InvalidBranchingFactor(1));
/// ```
#[derive(Clone, Debug)]
pub struct Config<C> {
    branching_factor: usize,
    comparator: C,
}

impl<C> Config<C> {
    /// Creates a configuration with minimum degree `branching_factor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBranchingFactor`] if `branching_factor < 2`.
    pub fn new(branching_factor: usize, comparator: C) -> Result<Self> {
        if branching_factor < 2 {
            return Err(Error::InvalidBranchingFactor(branching_factor));
        }
        Ok(Self {
            branching_factor,
            comparator,
        })
    }

    /// Creates a configuration whose full node fits in one page of `page_size` bytes.
    ///
    /// A full inner node occupies `2t` entry slots of `slot_size` bytes plus `2t + 1`
    /// child identifiers. The largest `t` that fits is chosen.
    ///
    /// ```
    /// use termos_btree::{Config, DEFAULT_PAGE_SIZE, NaturalOrder};
    ///
    /// let config = Config::fitting_page(DEFAULT_PAGE_SIZE, 16, NaturalOrder).unwrap();
    /// assert_eq!(config.branching_factor(), 102);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::PageTooSmall`] if fewer than two entries per half-node fit.
    pub fn fitting_page(page_size: usize, slot_size: usize, comparator: C) -> Result<Self> {
        let id_size = size_of::<NodeId>();
        let branching_factor = page_size.saturating_sub(id_size) / (2 * (slot_size + id_size));
        if branching_factor < 2 {
            return Err(Error::PageTooSmall { page_size, slot_size });
        }
        Self::new(branching_factor, comparator)
    }

    /// The minimum degree `t`.
    #[inline]
    pub const fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    /// Maximum entries per node, `2t`.
    #[inline]
    pub const fn capacity(&self) -> usize {
        2 * self.branching_factor
    }

    /// Minimum entries per non-root node, `t`.
    #[inline]
    pub const fn min_len(&self) -> usize {
        self.branching_factor
    }

    /// The key ordering.
    #[inline]
    pub const fn comparator(&self) -> &C {
        &self.comparator
    }
}

impl Default for Config<NaturalOrder> {
    fn default() -> Self {
        Self {
            branching_factor: DEFAULT_BRANCHING_FACTOR,
            comparator: NaturalOrder,
        }
    }
}
