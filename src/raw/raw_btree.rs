use core::cmp::Ordering;
use core::fmt;

use tracing::trace;

use super::arena::Arena;
use super::node::{Entry, InnerNode, Node, SearchResult};
use super::node_id::NodeId;
use crate::config::Config;
use crate::error::{Error, InvariantViolation, NodeRef, Result};
use crate::order::Comparator;

/// The core B-tree backing `BTree`.
///
/// Nodes live in an arena and refer to their children by [`NodeId`]. There are no
/// parent or sibling links: every operation descends from the root, and ordered
/// traversal re-derives its position from the last key it returned.
#[derive(Clone)]
pub(crate) struct RawBTree<K, V> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K, V>>,
    /// The only node without a parent. Starts, and ends after `clear`, as an empty leaf.
    root: NodeId,
    /// Number of entries stored in nodes.
    len: usize,
}

/// A node split that the parent has to absorb.
pub(crate) struct Split<K, V> {
    /// Entry moving up to become a separator in the parent.
    promoted: Entry<K, V>,
    /// The new sibling, greater than `promoted`.
    greater: NodeId,
}

/// Outcome of an insertion into a subtree.
pub(crate) enum PutResult<K, V> {
    /// A new entry was stored without a split.
    Inserted,
    /// An entry with an equal key was swapped out.
    Replaced(Entry<K, V>),
    /// A new entry was stored and the subtree root split.
    Split(Split<K, V>),
}

impl<K, V> RawBTree<K, V> {
    /// Creates an empty tree whose nodes hold up to `capacity` entries.
    pub(crate) fn new(capacity: usize) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::new_leaf(capacity));
        Self { nodes, root, len: 0 }
    }

    /// Returns the number of entries in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree holds no entries.
    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of live nodes.
    pub(crate) const fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of levels, counting the root.
    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut node = self.nodes.get(self.root);
        while let Node::Inner(inner) = node {
            node = self.nodes.get(inner.first_child());
            height += 1;
        }
        height
    }

    /// Drops every node and starts over from an empty leaf root.
    pub(crate) fn clear(&mut self, capacity: usize) {
        self.nodes.clear();
        self.root = self.nodes.alloc(Node::new_leaf(capacity));
        self.len = 0;
    }

    /// Returns the smallest entry.
    pub(crate) fn first(&self) -> Option<&Entry<K, V>> {
        self.first_in(self.root)
    }

    /// Returns the largest entry.
    pub(crate) fn last(&self) -> Option<&Entry<K, V>> {
        self.last_in(self.root)
    }

    fn first_in(&self, id: NodeId) -> Option<&Entry<K, V>> {
        let mut node = self.nodes.get(id);
        while let Node::Inner(inner) = node {
            node = self.nodes.get(inner.first_child());
        }
        node.entries().first()
    }

    fn last_in(&self, id: NodeId) -> Option<&Entry<K, V>> {
        let mut node = self.nodes.get(id);
        while let Node::Inner(inner) = node {
            node = self.nodes.get(inner.last_child());
        }
        node.entries().last()
    }

    /// Replaces an inner root left without entries by its only child.
    fn collapse_root(&mut self) {
        let Node::Inner(root) = self.nodes.get(self.root) else {
            return;
        };
        if root.len() > 0 {
            return;
        }
        let child = root.first_child();
        self.nodes.free(self.root);
        self.root = child;
        trace!(target: "termos_btree::merge", height = self.height(), "collapsed root");
    }

    /// Writes one line per node, children indented under their parent.
    pub(crate) fn fmt_structure(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        K: fmt::Debug,
    {
        self.fmt_node(f, self.root, 0)
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result
    where
        K: fmt::Debug,
    {
        let node = self.nodes.get(id);
        let kind = if node.is_leaf() { "leaf" } else { "inner" };
        write!(f, "{:indent$}{kind} ", "", indent = 2 * depth)?;
        f.debug_list().entries(node.entries().iter().map(|entry| &entry.key)).finish()?;
        writeln!(f)?;
        if let Node::Inner(inner) = node {
            for &child in inner.children() {
                self.fmt_node(f, child, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl<K, V> RawBTree<K, V> {
    /// Looks up the entry with a key equal to `key`.
    pub(crate) fn get<C: Comparator<K>>(&self, config: &Config<C>, key: &K) -> Option<&Entry<K, V>> {
        let mut node = self.nodes.get(self.root);
        loop {
            match node.search(config, key) {
                // Inner entries are real data; the descent can stop at any level.
                SearchResult::Found(index) => return Some(&node.entries()[index]),
                SearchResult::NotFound(index) => match node {
                    Node::Leaf(_) => return None,
                    Node::Inner(inner) => node = self.nodes.get(inner.child(index)),
                },
            }
        }
    }

    /// Inserts `entry`, returning the entry it replaced.
    pub(crate) fn put<C: Comparator<K>>(&mut self, config: &Config<C>, entry: Entry<K, V>) -> Option<Entry<K, V>> {
        match self.put_into(config, self.root, entry) {
            PutResult::Replaced(old) => Some(old),
            PutResult::Inserted => {
                self.len += 1;
                None
            }
            PutResult::Split(Split { promoted, greater }) => {
                let root = InnerNode::new_root(config.capacity(), self.root, promoted, greater);
                self.root = self.nodes.alloc(Node::Inner(root));
                self.len += 1;
                trace!(target: "termos_btree::split", height = self.height(), "split root");
                None
            }
        }
    }

    fn put_into<C: Comparator<K>>(&mut self, config: &Config<C>, id: NodeId, entry: Entry<K, V>) -> PutResult<K, V> {
        let node = self.nodes.get_mut(id);
        let index = match node.search(config, &entry.key) {
            SearchResult::Found(index) => return PutResult::Replaced(node.replace(index, entry)),
            SearchResult::NotFound(index) => index,
        };

        let child = match node {
            Node::Leaf(leaf) => {
                if leaf.len() < config.capacity() {
                    leaf.insert(index, entry);
                    return PutResult::Inserted;
                }
                let (promoted, greater) = leaf.split(config, index, entry);
                let greater = self.nodes.alloc(Node::Leaf(greater));
                return PutResult::Split(Split { promoted, greater });
            }
            Node::Inner(inner) => inner.child(index),
        };

        match self.put_into(config, child, entry) {
            PutResult::Split(split) => {
                let inner = self.nodes.get_mut(id).as_inner_mut();
                if inner.len() < config.capacity() {
                    inner.insert_child(index, split.promoted, split.greater);
                    return PutResult::Inserted;
                }
                let (promoted, greater) = inner.split(config, index, split.promoted, split.greater);
                let greater = self.nodes.alloc(Node::Inner(greater));
                PutResult::Split(Split { promoted, greater })
            }
            other => other,
        }
    }

    /// Removes the entry with a key equal to `key`.
    pub(crate) fn remove<C: Comparator<K>>(&mut self, config: &Config<C>, key: &K) -> Option<Entry<K, V>> {
        let removed = self.remove_from(config, self.root, key)?;
        self.after_remove();
        Some(removed)
    }

    /// Removes the smallest entry.
    pub(crate) fn remove_first<C: Comparator<K>>(&mut self, config: &Config<C>) -> Option<Entry<K, V>> {
        if self.is_empty() {
            return None;
        }
        let removed = self.remove_first_from(config, self.root);
        self.after_remove();
        Some(removed)
    }

    /// Removes the largest entry.
    pub(crate) fn remove_last<C: Comparator<K>>(&mut self, config: &Config<C>) -> Option<Entry<K, V>> {
        if self.is_empty() {
            return None;
        }
        let removed = self.remove_last_from(config, self.root);
        self.after_remove();
        Some(removed)
    }

    fn after_remove(&mut self) {
        self.collapse_root();
        self.len -= 1;
    }

    fn remove_from<C: Comparator<K>>(&mut self, config: &Config<C>, id: NodeId, key: &K) -> Option<Entry<K, V>> {
        let node = self.nodes.get_mut(id);
        match node.search(config, key) {
            SearchResult::Found(index) => match node {
                Node::Leaf(leaf) => Some(leaf.remove(index)),
                Node::Inner(inner) => {
                    let (lesser, greater) = (inner.child(index), inner.child(index + 1));
                    Some(self.remove_separator(config, id, index, lesser, greater))
                }
            },
            SearchResult::NotFound(index) => {
                let Node::Inner(inner) = node else {
                    return None;
                };
                let child = inner.child(index);
                let removed = self.remove_from(config, child, key)?;
                self.balance(config, id, index);
                Some(removed)
            }
        }
    }

    /// Removes separator `index` of inner node `id`, filling the gap with its
    /// predecessor or successor taken from the longer of the two adjacent children.
    fn remove_separator<C: Comparator<K>>(
        &mut self,
        config: &Config<C>,
        id: NodeId,
        index: usize,
        lesser: NodeId,
        greater: NodeId,
    ) -> Entry<K, V> {
        let (replacement, shrunk) = if self.nodes.get(lesser).len() >= self.nodes.get(greater).len() {
            (self.remove_last_from(config, lesser), index)
        } else {
            (self.remove_first_from(config, greater), index + 1)
        };
        let removed = self.nodes.get_mut(id).replace(index, replacement);
        self.balance(config, id, shrunk);
        removed
    }

    fn remove_first_from<C: Comparator<K>>(&mut self, config: &Config<C>, id: NodeId) -> Entry<K, V> {
        match self.nodes.get_mut(id) {
            Node::Leaf(leaf) => leaf.remove(0),
            Node::Inner(inner) => {
                let child = inner.first_child();
                let removed = self.remove_first_from(config, child);
                self.balance(config, id, 0);
                removed
            }
        }
    }

    fn remove_last_from<C: Comparator<K>>(&mut self, config: &Config<C>, id: NodeId) -> Entry<K, V> {
        match self.nodes.get_mut(id) {
            Node::Leaf(leaf) => leaf.remove(leaf.len() - 1),
            Node::Inner(inner) => {
                let (child, index) = (inner.last_child(), inner.len());
                let removed = self.remove_last_from(config, child);
                self.balance(config, id, index);
                removed
            }
        }
    }

    /// Repairs child `index` of inner node `id` after it lost an entry.
    fn balance<C: Comparator<K>>(&mut self, config: &Config<C>, id: NodeId, index: usize) {
        let last = self.nodes.get(id).len();
        if last == 0 {
            return;
        }
        if index == last {
            self.join_or_rotate(config, id, index - 1);
        } else if index == 0 {
            self.join_or_rotate(config, id, 0);
        } else if !self.join_or_rotate(config, id, index - 1) {
            self.join_or_rotate(config, id, index);
        }
    }

    /// Merges or rotates children `index` and `index + 1` of inner node `id`.
    ///
    /// Returns false when neither applies, which is not an error.
    fn join_or_rotate<C: Comparator<K>>(&mut self, config: &Config<C>, id: NodeId, index: usize) -> bool {
        let parent = self.nodes.get(id).as_inner();
        let (lesser, greater) = (parent.child(index), parent.child(index + 1));
        let lesser_len = self.nodes.get(lesser).len();
        let greater_len = self.nodes.get(greater).len();
        let t = config.min_len();

        // The separator comes down into the merged node too.
        if lesser_len + greater_len < config.capacity() {
            let (separator, greater) = self.nodes.get_mut(id).as_inner_mut().remove_child(index);
            let greater = self.nodes.take(greater);
            self.nodes.get_mut(lesser).join(separator, greater);
            return true;
        }

        if lesser_len > t && greater_len < t {
            // Clockwise: lesser's last entry goes up, the separator goes down into greater.
            let (entry, child) = self.nodes.get_mut(lesser).pop_back();
            let separator = self.nodes.get_mut(id).replace(index, entry);
            self.nodes.get_mut(greater).push_front(separator, child);
            return true;
        }

        if greater_len > t && lesser_len < t {
            // Counterclockwise: greater's first entry goes up, the separator goes down into lesser.
            let (entry, child) = self.nodes.get_mut(greater).pop_front();
            let separator = self.nodes.get_mut(id).replace(index, entry);
            self.nodes.get_mut(lesser).push_back(separator, child);
            return true;
        }

        trace!(target: "termos_btree::balance", index, lesser_len, greater_len, "no repair made");
        false
    }

    /// Returns the entry following `key`, which need not be present.
    pub(crate) fn next<C: Comparator<K>>(&self, config: &Config<C>, key: &K) -> Option<&Entry<K, V>> {
        self.next_in(config, self.root, key)
    }

    fn next_in<C: Comparator<K>>(&self, config: &Config<C>, id: NodeId, key: &K) -> Option<&Entry<K, V>> {
        let node = self.nodes.get(id);
        match (node, node.search(config, key)) {
            (Node::Leaf(_), SearchResult::Found(index)) => node.entries().get(index + 1),
            (Node::Leaf(_), SearchResult::NotFound(index)) => node.entries().get(index),
            (Node::Inner(inner), SearchResult::Found(index)) => self.first_in(inner.child(index + 1)),
            (Node::Inner(inner), SearchResult::NotFound(index)) => self
                .next_in(config, inner.child(index), key)
                .or_else(|| node.entries().get(index)),
        }
    }

    /// Checks occupancy, key order, separator placement and leaf depth of every node.
    pub(crate) fn verify<C: Comparator<K>>(&self, config: &Config<C>) -> Result<()> {
        let mut leaf_depth = None;
        self.verify_node(config, self.root, 0, &mut leaf_depth)
    }

    fn verify_node<C: Comparator<K>>(
        &self,
        config: &Config<C>,
        id: NodeId,
        depth: usize,
        leaf_depth: &mut Option<usize>,
    ) -> Result<()> {
        let node = self.nodes.get(id);
        let violation = |kind| Error::Invariant {
            node: NodeRef {
                index: id.to_index(),
                depth,
                leaf: node.is_leaf(),
            },
            kind,
        };
        let less = |a: &K, b: &K| config.comparator().compare(a, b) == Ordering::Less;

        let len = node.len();
        if len > config.capacity() {
            return Err(violation(InvariantViolation::Overfull {
                len,
                capacity: config.capacity(),
            }));
        }
        if depth > 0 && len < config.min_len() {
            return Err(violation(InvariantViolation::Underfull {
                len,
                min: config.min_len(),
            }));
        }
        for (index, pair) in node.entries().windows(2).enumerate() {
            if !less(&pair[0].key, &pair[1].key) {
                return Err(violation(InvariantViolation::Unordered { index: index + 1 }));
            }
        }

        let inner = match node {
            Node::Leaf(_) => {
                return match *leaf_depth {
                    Some(expected) if expected != depth => Err(violation(InvariantViolation::LeafDepth {
                        expected,
                        found: depth,
                    })),
                    Some(_) => Ok(()),
                    None => {
                        *leaf_depth = Some(depth);
                        Ok(())
                    }
                };
            }
            Node::Inner(inner) => inner,
        };

        if len == 0 {
            return Err(violation(InvariantViolation::EmptyInnerNode));
        }
        if inner.children().len() != len + 1 {
            return Err(violation(InvariantViolation::ChildCount {
                len,
                children: inner.children().len(),
            }));
        }
        for (index, entry) in node.entries().iter().enumerate() {
            if let Some(max) = self.last_in(inner.child(index)) {
                if !less(&max.key, &entry.key) {
                    return Err(violation(InvariantViolation::LesserChildOutOfOrder { index }));
                }
            }
            if let Some(min) = self.first_in(inner.child(index + 1)) {
                if !less(&entry.key, &min.key) {
                    return Err(violation(InvariantViolation::GreaterChildOutOfOrder { index }));
                }
            }
        }
        for &child in inner.children() {
            self.verify_node(config, child, depth + 1, leaf_depth)?;
        }
        Ok(())
    }
}
