use core::fmt;
use core::iter::FusedIterator;

use tracing::{debug, trace};

use crate::config::Config;
use crate::error::Result;
use crate::order::{Comparator, NaturalOrder};
use crate::raw::{Entry, RawBTree};

/// An ordered index based on a classic [B-Tree].
///
/// Entries live in leaf and inner nodes alike, each node holding between `t` and
/// `2t` entries (the root may hold fewer). Keys are ordered by the [`Comparator`]
/// `C` fixed at construction, so the key type needs no [`Ord`] implementation of
/// its own.
///
/// Next to the keyed entries the tree has one slot for the *null key*, addressed
/// as `None` wherever a key is passed as `Option<&K>`. The null entry sorts before
/// every other key and never enters a node.
///
/// Nodes carry no parent or sibling links. Ordered traversal is driven by keys:
/// [`next_entry`](BTree::next_entry) descends from the root on every call, which
/// is also how [`entries`](BTree::entries) advances.
///
/// [B-Tree]: https://en.wikipedia.org/wiki/B-tree
///
/// # Examples
///
/// ```
/// use termos_btree::BTree;
///
/// let mut stock = BTree::new();
/// stock.insert("pears", 12);
/// stock.insert("apples", 3);
/// stock.put(None, Some(0));
///
/// assert_eq!(stock.get(Some(&"apples")), Some(&3));
/// assert_eq!(stock.get(None), Some(&0));
/// assert_eq!(stock.len(), 3);
///
/// let keys: Vec<_> = stock.entries().map(|(key, _)| key.copied()).collect();
/// assert_eq!(keys, [None, Some("apples"), Some("pears")]);
///
/// // Putting no value removes the entry.
/// assert_eq!(stock.put(Some("pears"), None), Some((Some("pears"), 12)));
/// assert_eq!(stock.len(), 2);
/// ```
#[derive(Clone)]
pub struct BTree<K, V, C = NaturalOrder> {
    config: Config<C>,
    raw: RawBTree<K, V>,
    null_entry: Option<V>,
}

/// A lazy iterator over the entries of a [`BTree`], in key order.
///
/// This `struct` is created by [`BTree::entries`]. Each step looks up the successor
/// of the previously returned key. Cloning the iterator saves its position.
pub struct Entries<'a, K, V, C> {
    tree: &'a BTree<K, V, C>,
    cursor: Cursor<'a, K>,
}

enum Cursor<'a, K> {
    Start,
    After(Option<&'a K>),
    Done,
}

/// Renders the node hierarchy of a [`BTree`], one node per line.
///
/// Created by [`BTree::structure`].
pub struct Structure<'a, K, V> {
    raw: &'a RawBTree<K, V>,
}

fn borrowed<K, V>(entry: &Entry<K, V>) -> (Option<&K>, &V) {
    (Some(&entry.key), &entry.value)
}

fn owned<K, V>(entry: Entry<K, V>) -> (Option<K>, V) {
    let (key, value) = entry.into_pair();
    (Some(key), value)
}

impl<K, V> BTree<K, V> {
    /// Makes a new, empty `BTree` ordered by [`Ord`] with the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use termos_btree::{BTree, DEFAULT_BRANCHING_FACTOR};
    ///
    /// let tree: BTree<u32, &str> = BTree::new();
    /// assert!(tree.is_empty());
    /// assert_eq!(tree.config().branching_factor(), DEFAULT_BRANCHING_FACTOR);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }
}

impl<K, V, C> BTree<K, V, C> {
    /// Makes a new, empty `BTree` with the given configuration.
    #[must_use]
    pub fn with_config(config: Config<C>) -> Self {
        debug!(
            target: "termos_btree::tree",
            branching_factor = config.branching_factor(),
            capacity = config.capacity(),
            "created tree"
        );
        Self {
            raw: RawBTree::new(config.capacity()),
            config,
            null_entry: None,
        }
    }

    /// Makes a new, empty `BTree` with minimum degree `branching_factor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBranchingFactor`](crate::Error::InvalidBranchingFactor)
    /// if `branching_factor < 2`.
    ///
    /// # Examples
    ///
    /// ```
    /// use termos_btree::{BTree, Error, ReverseOrder};
    ///
    /// let mut tree: BTree<i32, char, _> = BTree::with_branching_factor(2, ReverseOrder).unwrap();
    /// tree.extend([(1, 'a'), (3, 'c'), (2, 'b')]);
    /// assert_eq!(tree.first_entry(), Some((Some(&3), &'c')));
    ///
    /// assert!(matches!(
    ///     BTree::<i32, char, _>::with_branching_factor(1, ReverseOrder),
    ///     Err(Error::InvalidBranchingFactor(1))
    /// ));
    /// ```
    pub fn with_branching_factor(branching_factor: usize, comparator: C) -> Result<Self> {
        Config::new(branching_factor, comparator).map(Self::with_config)
    }

    /// Returns the number of entries in the tree, the null entry included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len() + if self.null_entry.is_some() { 1 } else { 0 }
    }

    /// Returns `true` if the tree contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.null_entry.is_none()
    }

    /// Removes every entry, including the null entry.
    ///
    /// The tree shrinks back to a single empty leaf.
    pub fn clear(&mut self) {
        trace!(target: "termos_btree::tree", len = self.len(), "clear");
        self.raw.clear(self.config.capacity());
        self.null_entry = None;
    }

    /// Returns the number of nodes the tree currently occupies.
    ///
    /// An empty tree still has its root leaf.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.raw.node_count()
    }

    /// Returns the number of node levels, 1 while the root is a leaf.
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns the configuration the tree was built with.
    #[must_use]
    pub const fn config(&self) -> &Config<C> {
        &self.config
    }

    /// Returns a [`Display`](fmt::Display) adapter printing every node's keys,
    /// children indented under their parent. The null entry is not shown.
    ///
    /// # Examples
    ///
    /// ```
    /// use termos_btree::{BTree, NaturalOrder};
    ///
    /// let mut tree: BTree<i32, ()> = BTree::with_branching_factor(2, NaturalOrder).unwrap();
    /// tree.extend((1..=5).map(|key| (key, ())));
    /// assert_eq!(tree.structure().to_string(), "inner [3]\n  leaf [1, 2]\n  leaf [4, 5]\n");
    /// ```
    #[must_use]
    pub const fn structure(&self) -> Structure<'_, K, V> {
        Structure { raw: &self.raw }
    }
}

impl<K, V, C: Comparator<K>> BTree<K, V, C> {
    /// Returns a reference to the value stored under `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use termos_btree::BTree;
    ///
    /// let mut tree = BTree::new();
    /// tree.insert(1, "a");
    /// assert_eq!(tree.get(Some(&1)), Some(&"a"));
    /// assert_eq!(tree.get(Some(&2)), None);
    /// assert_eq!(tree.get(None), None);
    /// ```
    #[must_use]
    pub fn get(&self, key: Option<&K>) -> Option<&V> {
        self.get_entry(key).map(|(_, value)| value)
    }

    /// Returns the stored entry for `key`.
    ///
    /// The returned key is the one stored in the tree, which can differ from `key`
    /// when the comparator treats distinct keys as equal.
    #[must_use]
    pub fn get_entry(&self, key: Option<&K>) -> Option<(Option<&K>, &V)> {
        match key {
            None => self.null_entry.as_ref().map(|value| (None, value)),
            Some(key) => self.raw.get(&self.config, key).map(borrowed),
        }
    }

    /// Returns `true` if the tree holds an entry for `key`.
    #[must_use]
    pub fn contains_key(&self, key: Option<&K>) -> bool {
        self.get_entry(key).is_some()
    }

    /// Stores `value` under `key`, returning the entry it replaced.
    ///
    /// A `None` value removes the entry for `key` instead, returning it. The
    /// replaced entry carries the key that was stored, not the one passed in.
    pub fn put(&mut self, key: Option<K>, value: Option<V>) -> Option<(Option<K>, V)> {
        let Some(value) = value else {
            return self.remove(key.as_ref());
        };
        match key {
            None => self.null_entry.replace(value).map(|old| (None, old)),
            Some(key) => self.raw.put(&self.config, Entry::new(key, value)).map(owned),
        }
    }

    /// Stores `value` under a non-null `key`, returning the value it replaced.
    ///
    /// # Examples
    ///
    /// ```
    /// use termos_btree::BTree;
    ///
    /// let mut tree = BTree::new();
    /// assert_eq!(tree.insert(37, "a"), None);
    /// assert_eq!(tree.insert(37, "b"), Some("a"));
    /// assert_eq!(tree.get(Some(&37)), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.raw.put(&self.config, Entry::new(key, value)).map(|old| old.value)
    }

    /// Removes the entry for `key` and returns it.
    pub fn remove(&mut self, key: Option<&K>) -> Option<(Option<K>, V)> {
        match key {
            None => self.null_entry.take().map(|value| (None, value)),
            Some(key) => self.raw.remove(&self.config, key).map(owned),
        }
    }

    /// Returns the first entry in key order. The null entry comes first when present.
    #[must_use]
    pub fn first_entry(&self) -> Option<(Option<&K>, &V)> {
        match &self.null_entry {
            Some(value) => Some((None, value)),
            None => self.raw.first().map(borrowed),
        }
    }

    /// Returns the last entry in key order.
    #[must_use]
    pub fn last_entry(&self) -> Option<(Option<&K>, &V)> {
        self.raw
            .last()
            .map(borrowed)
            .or_else(|| self.null_entry.as_ref().map(|value| (None, value)))
    }

    /// Returns the entry with the smallest key greater than `key`.
    ///
    /// `key` need not be stored. The successor of the null key is the smallest
    /// non-null key. Each call descends from the root.
    ///
    /// # Examples
    ///
    /// ```
    /// use termos_btree::BTree;
    ///
    /// let tree: BTree<_, _> = [(10, 'a'), (20, 'b'), (30, 'c')].into_iter().collect();
    /// assert_eq!(tree.next_entry(None), Some((Some(&10), &'a')));
    /// assert_eq!(tree.next_entry(Some(&10)), Some((Some(&20), &'b')));
    /// assert_eq!(tree.next_entry(Some(&25)), Some((Some(&30), &'c')));
    /// assert_eq!(tree.next_entry(Some(&30)), None);
    /// ```
    #[must_use]
    pub fn next_entry(&self, key: Option<&K>) -> Option<(Option<&K>, &V)> {
        let next = match key {
            None => self.raw.first(),
            Some(key) => self.raw.next(&self.config, key),
        };
        next.map(borrowed)
    }

    /// Removes and returns the first entry in key order.
    pub fn remove_first(&mut self) -> Option<(Option<K>, V)> {
        match self.null_entry.take() {
            Some(value) => Some((None, value)),
            None => self.raw.remove_first(&self.config).map(owned),
        }
    }

    /// Removes and returns the last entry in key order.
    pub fn remove_last(&mut self) -> Option<(Option<K>, V)> {
        self.raw
            .remove_last(&self.config)
            .map(owned)
            .or_else(|| self.null_entry.take().map(|value| (None, value)))
    }

    /// Gets an iterator over the entries of the tree, in key order.
    ///
    /// The iterator borrows the tree, so the tree cannot change while it is alive.
    ///
    /// # Examples
    ///
    /// ```
    /// use termos_btree::BTree;
    ///
    /// let mut tree = BTree::new();
    /// tree.insert(3, "c");
    /// tree.insert(1, "a");
    /// tree.put(None, Some("null"));
    ///
    /// let mut entries = tree.entries();
    /// assert_eq!(entries.next(), Some((None, &"null")));
    /// let saved = entries.clone();
    /// assert_eq!(entries.next(), Some((Some(&1), &"a")));
    /// assert_eq!(entries.next(), Some((Some(&3), &"c")));
    /// assert_eq!(entries.next(), None);
    /// assert_eq!(saved.count(), 2);
    /// ```
    pub fn entries(&self) -> Entries<'_, K, V, C> {
        Entries {
            tree: self,
            cursor: Cursor::Start,
        }
    }

    /// Checks the structural invariants of every node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`](crate::Error::Invariant) naming the first node
    /// found to be overfull, underfull, out of order, missing children, or with
    /// leaves at different depths.
    pub fn verify(&self) -> Result<()> {
        self.raw.verify(&self.config)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: Comparator<K>> fmt::Debug for BTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

impl<K, V> Default for BTree<K, V> {
    fn default() -> Self {
        BTree::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for BTree<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = BTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K, V, C: Comparator<K>> Extend<(K, V)> for BTree<K, V, C> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, C: Comparator<K>> Extend<(Option<K>, V)> for BTree<K, V, C> {
    fn extend<T: IntoIterator<Item = (Option<K>, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.put(key, Some(value));
        }
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for BTree<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<'a, K, V, C: Comparator<K>> IntoIterator for &'a BTree<K, V, C> {
    type Item = (Option<&'a K>, &'a V);
    type IntoIter = Entries<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

impl<'a, K, V, C: Comparator<K>> Iterator for Entries<'a, K, V, C> {
    type Item = (Option<&'a K>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let next = match self.cursor {
            Cursor::Start => self.tree.first_entry(),
            Cursor::After(key) => self.tree.next_entry(key),
            Cursor::Done => return None,
        };
        self.cursor = next.map_or(Cursor::Done, |(key, _)| Cursor::After(key));
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.cursor {
            Cursor::Done => (0, Some(0)),
            _ => (0, Some(self.tree.len())),
        }
    }
}

impl<K, V, C: Comparator<K>> FusedIterator for Entries<'_, K, V, C> {}

impl<K, V, C> Clone for Entries<'_, K, V, C> {
    fn clone(&self) -> Self {
        Entries {
            tree: self.tree,
            cursor: self.cursor,
        }
    }
}

impl<K: fmt::Debug, V, C> fmt::Debug for Entries<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entries").field("cursor", &self.cursor).finish()
    }
}

impl<K> Clone for Cursor<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Cursor<'_, K> {}

impl<K: fmt::Debug> fmt::Debug for Cursor<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Start => f.write_str("Start"),
            Cursor::After(key) => f.debug_tuple("After").field(key).finish(),
            Cursor::Done => f.write_str("Done"),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Display for Structure<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt_structure(f)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    fn small<V>() -> BTree<i32, V> {
        BTree::with_branching_factor(2, NaturalOrder).unwrap()
    }

    #[test]
    fn null_entry_sorts_first_and_counts() {
        let mut tree = small();
        tree.extend((1..=3).map(|key| (key, key)));
        assert_eq!(tree.put(None, Some(0)), None);
        assert_eq!(tree.put(None, Some(-1)), Some((None, 0)));

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.first_entry(), Some((None, &-1)));
        assert_eq!(tree.last_entry(), Some((Some(&3), &3)));
        assert_eq!(tree.next_entry(None), Some((Some(&1), &1)));
        tree.verify().unwrap();
    }

    #[test]
    fn lone_null_entry_is_first_and_last() {
        let mut tree = small();
        tree.put(None, Some(7));

        assert_eq!(tree.first_entry(), Some((None, &7)));
        assert_eq!(tree.last_entry(), Some((None, &7)));
        assert_eq!(tree.next_entry(None), None);
        assert_eq!(tree.remove_last(), Some((None, 7)));
        assert!(tree.is_empty());
    }

    #[test]
    fn remove_first_takes_null_entry_first() {
        let mut tree = small();
        tree.extend([(Some(1), 10), (None, 0), (Some(2), 20)]);

        assert_eq!(tree.remove_first(), Some((None, 0)));
        assert_eq!(tree.remove_first(), Some((Some(1), 10)));
        assert_eq!(tree.remove_last(), Some((Some(2), 20)));
        assert_eq!(tree.remove_first(), None);
        assert_eq!(tree.remove_last(), None);
    }

    #[test]
    fn put_without_value_removes() {
        let mut tree = small();
        tree.insert(5, 50);
        tree.put(None, Some(0));

        assert_eq!(tree.put(Some(5), None), Some((Some(5), 50)));
        assert_eq!(tree.put(Some(5), None), None);
        assert_eq!(tree.put(None, None), Some((None, 0)));
        assert!(tree.is_empty());
    }

    #[test]
    fn clear_drops_null_entry_and_nodes() {
        let mut tree = small();
        tree.extend((0..100).map(|key| (key, key)));
        tree.put(None, Some(-1));
        assert!(tree.height() > 1);

        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.get(None), None);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.entries().next(), None);
    }

    #[test]
    fn entries_are_fused_and_restartable() {
        let mut tree = small();
        tree.extend((0..20).map(|key| (key, key * 2)));

        let mut entries = tree.entries();
        let restart = entries.clone();
        assert_eq!(entries.by_ref().count(), 20);
        assert_eq!(entries.next(), None);
        assert_eq!(entries.next(), None);

        let keys: Vec<i32> = restart.filter_map(|(key, _)| key.copied()).collect();
        assert_eq!(keys, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn debug_lists_entries_in_order() {
        let mut tree = small();
        tree.extend([(2, 'b'), (1, 'a')]);
        tree.put(None, Some('n'));
        assert_eq!(alloc::format!("{tree:?}"), "{None: 'n', Some(1): 'a', Some(2): 'b'}");
    }

    #[test]
    fn structure_shows_levels() {
        let mut tree: BTree<i32, ()> = BTree::with_branching_factor(2, NaturalOrder).unwrap();
        tree.extend((1..=8).map(|key| (key, ())));
        assert_eq!(
            tree.structure().to_string(),
            "inner [3, 6]\n  leaf [1, 2]\n  leaf [4, 5]\n  leaf [7, 8]\n"
        );
    }
}
