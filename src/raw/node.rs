use core::cmp::Ordering;

use smallvec::SmallVec;

use super::node_id::NodeId;
use crate::config::Config;
use crate::order::Comparator;

/// Nodes holding at most this many entries are scanned linearly.
pub(crate) const LINEAR_SEARCH_MAX: usize = 7;

// Nodes of small trees stay inline; larger branching factors spill to the heap once.
const INLINE_ENTRIES: usize = 8;

pub(crate) type EntryVec<K, V> = SmallVec<[Entry<K, V>; INLINE_ENTRIES]>;
pub(crate) type ChildVec = SmallVec<[NodeId; INLINE_ENTRIES + 1]>;

/// A key/value pair stored in a node.
#[derive(Clone)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> Entry<K, V> {
    pub(crate) const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub(crate) fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

/// Result of searching for a key in a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SearchResult {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is where it would be inserted.
    NotFound(usize),
}

/// Searches `entries` for `key`: linear scan for short nodes, binary search otherwise.
#[inline]
pub(crate) fn search<K, V, C: Comparator<K>>(config: &Config<C>, entries: &[Entry<K, V>], key: &K) -> SearchResult {
    if entries.len() > LINEAR_SEARCH_MAX {
        binary_search(config, entries, key)
    } else {
        linear_search(config, entries, key)
    }
}

fn linear_search<K, V, C: Comparator<K>>(config: &Config<C>, entries: &[Entry<K, V>], key: &K) -> SearchResult {
    for (index, entry) in entries.iter().enumerate() {
        match config.comparator().compare(&entry.key, key) {
            Ordering::Less => {}
            Ordering::Equal => return SearchResult::Found(index),
            Ordering::Greater => return SearchResult::NotFound(index),
        }
    }
    SearchResult::NotFound(entries.len())
}

fn binary_search<K, V, C: Comparator<K>>(config: &Config<C>, entries: &[Entry<K, V>], key: &K) -> SearchResult {
    let mut low = 0;
    let mut high = entries.len();
    while low < high {
        let mid = low + (high - low) / 2;
        match config.comparator().compare(&entries[mid].key, key) {
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
            Ordering::Equal => return SearchResult::Found(mid),
        }
    }
    SearchResult::NotFound(low)
}

fn entry_vec<K, V>(capacity: usize) -> EntryVec<K, V> {
    SmallVec::with_capacity(capacity)
}

fn child_vec(capacity: usize) -> ChildVec {
    SmallVec::with_capacity(capacity + 1)
}

#[derive(Clone)]
#[allow(clippy::large_enum_variant)]
pub(crate) enum Node<K, V> {
    Leaf(LeafNode<K, V>),
    Inner(InnerNode<K, V>),
}

// Classic B-tree: every node, leaf or inner, stores live entries.
#[derive(Clone)]
pub(crate) struct LeafNode<K, V> {
    entries: EntryVec<K, V>,
}

#[derive(Clone)]
pub(crate) struct InnerNode<K, V> {
    entries: EntryVec<K, V>,
    // Always `entries.len() + 1` children; child[i] < entries[i] < child[i + 1].
    children: ChildVec,
}

impl<K, V> Node<K, V> {
    /// Creates a new empty leaf node.
    pub(crate) fn new_leaf(capacity: usize) -> Self {
        Node::Leaf(LeafNode::with_capacity(capacity))
    }

    /// Returns true if this is a leaf node.
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Returns the number of entries in this node.
    pub(crate) fn len(&self) -> usize {
        self.entries().len()
    }

    pub(crate) fn entries(&self) -> &[Entry<K, V>] {
        match self {
            Node::Leaf(leaf) => &leaf.entries,
            Node::Inner(inner) => &inner.entries,
        }
    }

    fn entries_mut(&mut self) -> &mut EntryVec<K, V> {
        match self {
            Node::Leaf(leaf) => &mut leaf.entries,
            Node::Inner(inner) => &mut inner.entries,
        }
    }

    /// Returns the inner node, panicking if this is a leaf.
    pub(crate) fn as_inner(&self) -> &InnerNode<K, V> {
        match self {
            Node::Inner(inner) => inner,
            Node::Leaf(_) => panic!("expected inner node"),
        }
    }

    /// Returns the inner node mutably, panicking if this is a leaf.
    pub(crate) fn as_inner_mut(&mut self) -> &mut InnerNode<K, V> {
        match self {
            Node::Inner(inner) => inner,
            Node::Leaf(_) => panic!("expected inner node"),
        }
    }

    #[inline]
    pub(crate) fn search<C: Comparator<K>>(&self, config: &Config<C>, key: &K) -> SearchResult {
        search(config, self.entries(), key)
    }

    /// Swaps the entry at `index` for `entry`, returning the old one.
    pub(crate) fn replace(&mut self, index: usize, entry: Entry<K, V>) -> Entry<K, V> {
        core::mem::replace(&mut self.entries_mut()[index], entry)
    }

    /// Removes the first entry, together with the first child of an inner node.
    pub(crate) fn pop_front(&mut self) -> (Entry<K, V>, Option<NodeId>) {
        assert!(self.len() > 0, "`Node::pop_front()` - node is empty!");
        match self {
            Node::Leaf(leaf) => (leaf.entries.remove(0), None),
            Node::Inner(inner) => (inner.entries.remove(0), Some(inner.children.remove(0))),
        }
    }

    /// Removes the last entry, together with the last child of an inner node.
    pub(crate) fn pop_back(&mut self) -> (Entry<K, V>, Option<NodeId>) {
        let popped = match self {
            Node::Leaf(leaf) => leaf.entries.pop().map(|entry| (entry, None)),
            Node::Inner(inner) => inner.entries.pop().map(|entry| (entry, inner.children.pop())),
        };
        popped.expect("`Node::pop_back()` - node is empty!")
    }

    /// Prepends an entry; an inner node also takes `child` as its new first child.
    pub(crate) fn push_front(&mut self, entry: Entry<K, V>, child: Option<NodeId>) {
        match (self, child) {
            (Node::Leaf(leaf), None) => leaf.entries.insert(0, entry),
            (Node::Inner(inner), Some(child)) => {
                inner.entries.insert(0, entry);
                inner.children.insert(0, child);
            }
            _ => panic!("rotation between a leaf and an inner node"),
        }
    }

    /// Appends an entry; an inner node also takes `child` as its new last child.
    pub(crate) fn push_back(&mut self, entry: Entry<K, V>, child: Option<NodeId>) {
        match (self, child) {
            (Node::Leaf(leaf), None) => leaf.entries.push(entry),
            (Node::Inner(inner), Some(child)) => {
                inner.entries.push(entry);
                inner.children.push(child);
            }
            _ => panic!("rotation between a leaf and an inner node"),
        }
    }

    /// Absorbs `separator` and every entry (and child) of `greater`, its right sibling.
    pub(crate) fn join(&mut self, separator: Entry<K, V>, greater: Node<K, V>) {
        match (self, greater) {
            (Node::Leaf(lesser), Node::Leaf(greater)) => {
                lesser.entries.push(separator);
                lesser.entries.extend(greater.entries);
            }
            (Node::Inner(lesser), Node::Inner(greater)) => {
                lesser.entries.push(separator);
                lesser.entries.extend(greater.entries);
                lesser.children.extend(greater.children);
            }
            _ => panic!("join between a leaf and an inner node"),
        }
    }
}

impl<K, V> LeafNode<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: entry_vec(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn insert(&mut self, index: usize, entry: Entry<K, V>) {
        self.entries.insert(index, entry);
    }

    pub(crate) fn remove(&mut self, index: usize) -> Entry<K, V> {
        self.entries.remove(index)
    }

    /// Splits this full leaf while inserting `entry` at `index`.
    ///
    /// Returns the promoted entry and the new greater sibling. This node keeps `t`
    /// entries and the sibling receives `t`:
    /// - `index == t`: `entry` itself is promoted, the sibling is `[t, 2t)`.
    /// - `index < t`: the entry at `t - 1` is promoted and `entry` lands in this node.
    /// - `index > t`: the entry at `t` is promoted and `entry` lands in the sibling.
    pub(crate) fn split<C>(&mut self, config: &Config<C>, index: usize, entry: Entry<K, V>) -> (Entry<K, V>, Self) {
        let t = config.min_len();
        debug_assert_eq!(self.len(), config.capacity());

        let mut greater = Self::with_capacity(config.capacity());
        greater.entries.extend(self.entries.drain(t..));

        match index.cmp(&t) {
            Ordering::Equal => (entry, greater),
            Ordering::Less => {
                let promoted = self.entries.pop().expect("`LeafNode::split()` - node is not full!");
                self.entries.insert(index, entry);
                (promoted, greater)
            }
            Ordering::Greater => {
                let promoted = greater.entries.remove(0);
                greater.entries.insert(index - t - 1, entry);
                (promoted, greater)
            }
        }
    }
}

impl<K, V> InnerNode<K, V> {
    /// Creates a root holding a single separator between two subtrees.
    pub(crate) fn new_root(capacity: usize, lesser: NodeId, entry: Entry<K, V>, greater: NodeId) -> Self {
        let mut root = Self {
            entries: entry_vec(capacity),
            children: child_vec(capacity),
        };
        root.entries.push(entry);
        root.children.push(lesser);
        root.children.push(greater);
        root
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> NodeId {
        self.children[index]
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn first_child(&self) -> NodeId {
        self.children[0]
    }

    pub(crate) fn last_child(&self) -> NodeId {
        self.children[self.children.len() - 1]
    }

    /// Inserts `entry` at `index` with `greater` as the child to its right.
    pub(crate) fn insert_child(&mut self, index: usize, entry: Entry<K, V>, greater: NodeId) {
        self.entries.insert(index, entry);
        self.children.insert(index + 1, greater);
    }

    /// Removes the entry at `index` and the child to its right.
    pub(crate) fn remove_child(&mut self, index: usize) -> (Entry<K, V>, NodeId) {
        let entry = self.entries.remove(index);
        let child = self.children.remove(index + 1);
        (entry, child)
    }

    /// Splits this full node while absorbing a split of `child[index]`.
    ///
    /// `entry` is the entry promoted from the child and `greater_child` the child's new
    /// sibling. Promotion follows the same rules as [`LeafNode::split`]; every child
    /// stays next to the entries it was adjacent to.
    pub(crate) fn split<C>(
        &mut self,
        config: &Config<C>,
        index: usize,
        entry: Entry<K, V>,
        greater_child: NodeId,
    ) -> (Entry<K, V>, Self) {
        let t = config.min_len();
        debug_assert_eq!(self.len(), config.capacity());

        let mut greater = Self {
            entries: entry_vec(config.capacity()),
            children: child_vec(config.capacity()),
        };
        greater.entries.extend(self.entries.drain(t..));

        match index.cmp(&t) {
            Ordering::Equal => {
                greater.children.push(greater_child);
                greater.children.extend(self.children.drain(t + 1..));
                (entry, greater)
            }
            Ordering::Less => {
                greater.children.extend(self.children.drain(t..));
                let promoted = self.entries.pop().expect("`InnerNode::split()` - node is not full!");
                self.insert_child(index, entry, greater_child);
                (promoted, greater)
            }
            Ordering::Greater => {
                greater.children.extend(self.children.drain(t + 1..));
                let promoted = greater.entries.remove(0);
                greater.insert_child(index - t - 1, entry, greater_child);
                (promoted, greater)
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::order::NaturalOrder;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    fn config(t: usize) -> Config<NaturalOrder> {
        Config::new(t, NaturalOrder).unwrap()
    }

    fn leaf(config: &Config<NaturalOrder>, keys: &[i32]) -> LeafNode<i32, i32> {
        let mut leaf = LeafNode::with_capacity(config.capacity());
        for (index, &key) in keys.iter().enumerate() {
            leaf.insert(index, Entry::new(key, key * 10));
        }
        leaf
    }

    fn inner(config: &Config<NaturalOrder>, keys: &[i32]) -> InnerNode<i32, i32> {
        let mut node = InnerNode::new_root(config.capacity(), id(0), Entry::new(keys[0], keys[0] * 10), id(1));
        for (index, &key) in keys.iter().enumerate().skip(1) {
            node.insert_child(index, Entry::new(key, key * 10), id(index + 1));
        }
        node
    }

    fn id(index: usize) -> NodeId {
        NodeId::from_index(index)
    }

    fn keys<K: Copy, V>(entries: &[Entry<K, V>]) -> Vec<K> {
        entries.iter().map(|entry| entry.key).collect()
    }

    fn ids(children: &[NodeId]) -> Vec<usize> {
        children.iter().map(|child| child.to_index()).collect()
    }

    #[test]
    fn leaf_split_promotes_new_entry_at_midpoint() {
        let config = config(3);
        let mut lesser = leaf(&config, &[10, 20, 30, 40, 50, 60]);
        let (promoted, greater) = lesser.split(&config, 3, Entry::new(35, 350));

        assert_eq!(promoted.key, 35);
        assert_eq!(keys(&lesser.entries), [10, 20, 30]);
        assert_eq!(keys(&greater.entries), [40, 50, 60]);
    }

    #[test]
    fn leaf_split_below_midpoint_promotes_last_kept_entry() {
        let config = config(3);
        let mut lesser = leaf(&config, &[10, 20, 30, 40, 50, 60]);
        let (promoted, greater) = lesser.split(&config, 1, Entry::new(15, 150));

        assert_eq!(promoted.key, 30);
        assert_eq!(keys(&lesser.entries), [10, 15, 20]);
        assert_eq!(keys(&greater.entries), [40, 50, 60]);
    }

    #[test]
    fn leaf_split_above_midpoint_promotes_first_moved_entry() {
        let config = config(3);
        let mut lesser = leaf(&config, &[10, 20, 30, 40, 50, 60]);
        let (promoted, greater) = lesser.split(&config, 5, Entry::new(55, 550));

        assert_eq!(promoted.key, 40);
        assert_eq!(keys(&lesser.entries), [10, 20, 30]);
        assert_eq!(keys(&greater.entries), [50, 55, 60]);
    }

    #[test]
    fn leaf_split_at_the_ends() {
        let config = config(2);

        let mut lesser = leaf(&config, &[10, 20, 30, 40]);
        let (promoted, greater) = lesser.split(&config, 0, Entry::new(5, 50));
        assert_eq!(promoted.key, 20);
        assert_eq!(keys(&lesser.entries), [5, 10]);
        assert_eq!(keys(&greater.entries), [30, 40]);

        let mut lesser = leaf(&config, &[10, 20, 30, 40]);
        let (promoted, greater) = lesser.split(&config, 4, Entry::new(50, 500));
        assert_eq!(promoted.key, 30);
        assert_eq!(keys(&lesser.entries), [10, 20]);
        assert_eq!(keys(&greater.entries), [40, 50]);
    }

    #[test]
    fn inner_split_at_midpoint_gives_new_child_to_sibling() {
        let config = config(3);
        let mut lesser = inner(&config, &[10, 20, 30, 40, 50, 60]);
        let (promoted, greater) = lesser.split(&config, 3, Entry::new(35, 350), id(100));

        assert_eq!(promoted.key, 35);
        assert_eq!(keys(&lesser.entries), [10, 20, 30]);
        assert_eq!(ids(lesser.children()), [0, 1, 2, 3]);
        assert_eq!(keys(&greater.entries), [40, 50, 60]);
        assert_eq!(ids(greater.children()), [100, 4, 5, 6]);
    }

    #[test]
    fn inner_split_below_midpoint_keeps_new_child() {
        let config = config(3);
        let mut lesser = inner(&config, &[10, 20, 30, 40, 50, 60]);
        let (promoted, greater) = lesser.split(&config, 1, Entry::new(15, 150), id(100));

        assert_eq!(promoted.key, 30);
        assert_eq!(keys(&lesser.entries), [10, 15, 20]);
        assert_eq!(ids(lesser.children()), [0, 1, 100, 2]);
        assert_eq!(keys(&greater.entries), [40, 50, 60]);
        assert_eq!(ids(greater.children()), [3, 4, 5, 6]);
    }

    #[test]
    fn inner_split_above_midpoint_moves_new_child() {
        let config = config(3);
        let mut lesser = inner(&config, &[10, 20, 30, 40, 50, 60]);
        let (promoted, greater) = lesser.split(&config, 5, Entry::new(55, 550), id(100));

        assert_eq!(promoted.key, 40);
        assert_eq!(keys(&lesser.entries), [10, 20, 30]);
        assert_eq!(ids(lesser.children()), [0, 1, 2, 3]);
        assert_eq!(keys(&greater.entries), [50, 55, 60]);
        assert_eq!(ids(greater.children()), [4, 5, 100, 6]);
    }

    #[test]
    fn join_pulls_separator_down() {
        let config = config(2);
        let mut lesser = Node::Inner(inner(&config, &[10]));
        let greater = Node::Inner(InnerNode::new_root(config.capacity(), id(2), Entry::new(30, 300), id(3)));
        lesser.join(Entry::new(20, 200), greater);

        assert_eq!(keys(lesser.entries()), [10, 20, 30]);
        assert_eq!(ids(lesser.as_inner().children()), [0, 1, 2, 3]);
    }

    #[test]
    fn pops_and_pushes_carry_children() {
        let config = config(2);
        let mut node = Node::Inner(inner(&config, &[10, 20, 30]));

        let (first, child) = node.pop_front();
        assert_eq!((first.key, child), (10, Some(id(0))));
        let (last, child) = node.pop_back();
        assert_eq!((last.key, child), (30, Some(id(3))));
        assert_eq!(ids(node.as_inner().children()), [1, 2]);

        node.push_front(Entry::new(5, 50), Some(id(7)));
        node.push_back(Entry::new(35, 350), Some(id(8)));
        assert_eq!(keys(node.entries()), [5, 20, 35]);
        assert_eq!(ids(node.as_inner().children()), [7, 1, 2, 8]);
    }

    #[test]
    #[should_panic(expected = "rotation between a leaf and an inner node")]
    fn leaf_rejects_child() {
        let config = config(2);
        let mut node = Node::Leaf(leaf(&config, &[10]));
        node.push_back(Entry::new(20, 200), Some(id(0)));
    }

    proptest! {
        #[test]
        fn linear_and_binary_search_agree(
            mut keys in prop::collection::vec(-100i32..100, 0..40),
            probe in -110i32..110,
        ) {
            keys.sort_unstable();
            keys.dedup();
            let config = config(32);
            let entries: Vec<Entry<i32, ()>> = keys.iter().map(|&key| Entry::new(key, ())).collect();

            let expected = match keys.binary_search(&probe) {
                Ok(index) => SearchResult::Found(index),
                Err(index) => SearchResult::NotFound(index),
            };
            prop_assert_eq!(linear_search(&config, &entries, &probe), expected);
            prop_assert_eq!(binary_search(&config, &entries, &probe), expected);
            prop_assert_eq!(search(&config, &entries, &probe), expected);
        }
    }
}
