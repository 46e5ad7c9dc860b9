//! [`BstMap`] ordered map on an unbalanced binary search tree.
//!
//! # Differences compared to [`std::collections::BTreeMap`]
//!
//! The tree is never rebalanced. Inserting keys in sorted order produces a tree that is
//! really a linked list, with lookups costing O(n); [`BstMap::height`] and
//! [`BstMap::last_visits`] make this measurable.
//!
//! [`BstMap::insert`] does not replace the value of an existing key, it returns `false` and
//! leaves the map unchanged.
//!
//! Positions in the map are [`Cursor`]s and [`CursorMut`]s which, like C++ iterators,
//! can step in both directions and sit on an end sentinel, see the [`cursor`] module notes.
//!
//! [`BstMap::keys`] visits keys in preorder (node, left subtree, right subtree), not in sorted
//! order. Use [`BstMap::iter`] or [`BstMap::for_each`] for ascending order.
//!
//! # Example
//!
//! ```
//!     use bstmap::collections::BstMap;
//!     let mut mymap = BstMap::new();
//!     mymap.insert("England", "London");
//!     mymap.insert("France", "Paris");
//!     println!("The capital of France is {}", mymap["France"]);
//! ```
//!
//!# Features
//!
//! This crate supports the following cargo features:
//! - `serde` : enables serialisation of [`BstMap`] via serde crate.

use std::{
    borrow::Borrow,
    cell::Cell,
    cmp::Ordering,
    collections::VecDeque,
    fmt,
    fmt::Debug,
    iter::FusedIterator,
    marker::PhantomData,
    ptr::NonNull,
};

use log::{debug, trace};

use crate::error::{Error, Result};

pub mod cursor;
pub use cursor::{Cursor, CursorMut, Direction};
use cursor::{Exclusive, Path};

/// `BstMap` ordered map, similar in use to [`std::collections::BTreeMap`].
///
/// General guide to implementation:
///
/// [`BstMap`] has a length and an optional root `Node`. Each node owns its two children
/// through `Option<Box<Node>>`, nothing points back up the tree.
///
/// Erasing a node with two children keeps the node in place and moves the key and value of
/// its in-order successor into it; the successor's node is the one unlinked.
///
/// Traversals ([`BstMap::for_each`], [`BstMap::for_each_layered`], [`BstMap::keys`],
/// [`BstMap::clear`]) use an explicit stack or queue, so a degenerate tree cannot overflow
/// the call stack.
pub struct BstMap<K, V> {
    len: usize,
    root: Link<K, V>,
    visits: Cell<usize>,
}
impl<K, V> Default for BstMap<K, V> {
    /// Creates an empty BstMap.
    fn default() -> Self {
        Self::new()
    }
}
impl<K, V> Drop for BstMap<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}
impl<K: Ord + Clone, V: Clone> Clone for BstMap<K, V> {
    /// Re-inserts every entry in preorder, so the copy has the same shape as the original.
    fn clone(&self) -> Self {
        let mut map = Self::new();
        for node in Preorder::new(self.root.as_deref()) {
            map.insert(node.key.clone(), node.value.clone());
        }
        map
    }
}

impl<K, V> BstMap<K, V> {
    /// Returns a new, empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            len: 0,
            root: None,
            visits: Cell::new(0),
        }
    }

    /// Clear the map.
    pub fn clear(&mut self) {
        let mut stack: Vec<Box<Node<K, V>>> = self.root.take().into_iter().collect();
        let mut freed = 0;
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
            freed += 1;
        }
        if freed > 0 {
            debug!("clear: released {freed} nodes");
        }
        self.len = 0;
    }

    /// Get number of key-value pairs in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Is the map empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes on the longest path from the root, 0 for an empty map.
    #[must_use]
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(&Node<K, V>, usize)> =
            self.root.as_deref().map(|n| (n, 1)).into_iter().collect();
        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);
            stack.extend(node.left.as_deref().map(|n| (n, depth + 1)));
            stack.extend(node.right.as_deref().map(|n| (n, depth + 1)));
        }
        height
    }

    /// Number of nodes compared against by the most recent insert, erase or lookup.
    ///
    /// Instrumentation for measuring the cost of operations, not part of the map contents.
    #[must_use]
    pub fn last_visits(&self) -> usize {
        self.visits.get()
    }

    /// Insert key-value pair into map. Returns false, leaving the existing value unchanged,
    /// if the key is already present.
    pub fn insert(&mut self, key: K, value: V) -> bool
    where
        K: Ord,
    {
        let mut visits = 0;
        let slot = slot_mut(&mut self.root, &key, &mut visits);
        self.visits.set(visits);
        if slot.is_some() {
            return false;
        }
        *slot = Some(Node::new(key, value));
        self.len += 1;
        true
    }

    /// Get a mutable reference to the value for key, first inserting `V::default()` if the
    /// key is absent.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        K: Ord,
        V: Default,
    {
        let mut visits = 0;
        let slot = slot_mut(&mut self.root, &key, &mut visits);
        self.visits.set(visits);
        if slot.is_none() {
            trace!("get_or_default: inserting default value");
            self.len += 1;
        }
        &mut slot
            .get_or_insert_with(|| Node::new(key, V::default()))
            .value
    }

    /// Does the map have an entry for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.search(key).is_some()
    }

    /// Get reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.search(key).map(|n| &n.value)
    }

    /// Get a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut visits = 0;
        let slot = slot_mut(&mut self.root, key, &mut visits);
        self.visits.set(visits);
        slot.as_deref_mut().map(|n| &mut n.value)
    }

    /// Get references to the corresponding key and value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.search(key).map(|n| (&n.key, &n.value))
    }

    /// Get reference to the value corresponding to the key, failing with
    /// [`Error::KeyNotFound`] if there is none.
    pub fn at<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Get a mutable reference to the value corresponding to the key, failing with
    /// [`Error::KeyNotFound`] if there is none.
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get_mut(key).ok_or(Error::KeyNotFound)
    }

    /// Get references to first key and value.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.outermost(Side::Left).map(|n| (&n.key, &n.value))
    }

    /// Gets references to last key and value.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.outermost(Side::Right).map(|n| (&n.key, &n.value))
    }

    /// Remove key-value pair from map. Returns false if the key was not present.
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).is_some()
    }

    /// Remove key-value pair from map, returning just the value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_k, v)| v)
    }

    /// Remove key-value pair from map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut visits = 0;
        let slot = slot_mut(&mut self.root, key, &mut visits);
        let result = slot.take().and_then(|mut node| match (node.left.take(), node.right.take()) {
            (None, None) => {
                trace!("erase: leaf");
                Some(node.into_pair())
            }
            (Some(child), None) | (None, Some(child)) => {
                trace!("erase: splicing single child");
                *slot = Some(child);
                Some(node.into_pair())
            }
            (Some(left), Some(right)) => {
                trace!("erase: promoting in-order successor");
                let mut right = Some(right);
                let pair = take_leftmost(&mut right, &mut visits)
                    .map(|successor| node.replace_pair(successor.into_pair()));
                node.left = Some(left);
                node.right = right;
                *slot = Some(node);
                pair
            }
        });
        self.visits.set(visits);
        if result.is_some() {
            self.len -= 1;
        }
        result
    }

    /// Visit every key and value in ascending key order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        let mut stack = Vec::new();
        let mut next = self.root.as_deref();
        loop {
            while let Some(node) = next {
                stack.push(node);
                next = node.left.as_deref();
            }
            let Some(node) = stack.pop() else {
                break;
            };
            f(&node.key, &node.value);
            next = node.right.as_deref();
        }
    }

    /// Visit every key and value in ascending key order, allowing values to be modified.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V),
    {
        let mut stack = Vec::new();
        let mut next = self.root.as_deref_mut();
        loop {
            while let Some(node) = next {
                let Node {
                    key,
                    value,
                    left,
                    right,
                } = node;
                stack.push((&*key, value, right.as_deref_mut()));
                next = left.as_deref_mut();
            }
            let Some((key, value, right)) = stack.pop() else {
                break;
            };
            f(key, value);
            next = right;
        }
    }

    /// Visit every key and value breadth first, one depth at a time, left to right within a
    /// depth. The visitor also gets the depth of the node, 0 for the root.
    pub fn for_each_layered<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V, usize),
    {
        let mut queue: VecDeque<(&Node<K, V>, usize)> =
            self.root.as_deref().map(|n| (n, 0)).into_iter().collect();
        while let Some((node, depth)) = queue.pop_front() {
            f(&node.key, &node.value, depth);
            queue.extend(node.left.as_deref().map(|n| (n, depth + 1)));
            queue.extend(node.right.as_deref().map(|n| (n, depth + 1)));
        }
    }

    /// As [`BstMap::for_each_layered`], allowing values to be modified.
    pub fn for_each_layered_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V, usize),
    {
        let mut queue: VecDeque<(&mut Node<K, V>, usize)> =
            self.root.as_deref_mut().map(|n| (n, 0)).into_iter().collect();
        while let Some((node, depth)) = queue.pop_front() {
            let Node {
                key,
                value,
                left,
                right,
            } = node;
            f(&*key, value, depth);
            queue.extend(left.as_deref_mut().map(|n| (n, depth + 1)));
            queue.extend(right.as_deref_mut().map(|n| (n, depth + 1)));
        }
    }

    /// Get iterator of references to keys in preorder: each node, then its left subtree,
    /// then its right subtree.
    ///
    /// This is the order that rebuilds the same tree shape when the keys are inserted into
    /// an empty map. It is not sorted order.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(Preorder::new(self.root.as_deref()))
    }

    /// Get iterator of references to key-value pairs, in ascending key order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            len: self.len,
            front: self.begin(),
            back: self.rbegin(),
        }
    }

    /// Get iterator of mutable references to key-value pairs, in ascending key order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let root = self.root_ptr_mut();
        IterMut {
            len: self.len,
            front: Path::edge(root, Side::Left),
            back: Path::edge(root, Side::Right),
            _pd: PhantomData,
        }
    }

    /// Get cursor at the smallest key, or at the end sentinel if the map is empty.
    #[must_use]
    pub fn begin(&self) -> Cursor<'_, K, V> {
        Cursor::new(Path::edge(self.root_ptr(), Side::Left), Direction::Forward)
    }

    /// Get forward cursor at the end sentinel, one past the largest key.
    #[must_use]
    pub fn end(&self) -> Cursor<'_, K, V> {
        Cursor::new(Path::beyond(self.root_ptr(), Side::Right), Direction::Forward)
    }

    /// Get reverse cursor at the largest key, or at the end sentinel if the map is empty.
    #[must_use]
    pub fn rbegin(&self) -> Cursor<'_, K, V> {
        Cursor::new(Path::edge(self.root_ptr(), Side::Right), Direction::Reverse)
    }

    /// Get reverse cursor at the end sentinel, one before the smallest key.
    #[must_use]
    pub fn rend(&self) -> Cursor<'_, K, V> {
        Cursor::new(Path::beyond(self.root_ptr(), Side::Left), Direction::Reverse)
    }

    /// Get forward cursor at key, or at an end sentinel (equal to [`BstMap::end`]) if the key
    /// is absent.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut visits = 0;
        let path = Path::seek(self.root_ptr(), key, &mut visits);
        self.visits.set(visits);
        Cursor::new(path, Direction::Forward)
    }

    /// Get cursor at the smallest key that permits values to be modified.
    pub fn begin_mut(&mut self) -> CursorMut<'_, K, V> {
        CursorMut::new(Path::edge(self.root_ptr_mut(), Side::Left), Direction::Forward)
    }

    /// Get forward cursor at the end sentinel that permits values to be modified.
    pub fn end_mut(&mut self) -> CursorMut<'_, K, V> {
        CursorMut::new(Path::beyond(self.root_ptr_mut(), Side::Right), Direction::Forward)
    }

    /// Get reverse cursor at the largest key that permits values to be modified.
    pub fn rbegin_mut(&mut self) -> CursorMut<'_, K, V> {
        CursorMut::new(Path::edge(self.root_ptr_mut(), Side::Right), Direction::Reverse)
    }

    /// Get reverse cursor at the end sentinel that permits values to be modified.
    pub fn rend_mut(&mut self) -> CursorMut<'_, K, V> {
        CursorMut::new(Path::beyond(self.root_ptr_mut(), Side::Left), Direction::Reverse)
    }

    /// Get forward cursor at key that permits values to be modified.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut visits = 0;
        let path = Path::seek(self.root_ptr_mut(), key, &mut visits);
        self.visits.set(visits);
        CursorMut::new(path, Direction::Forward)
    }

    fn root_ptr(&self) -> Option<NonNull<Node<K, V>>> {
        self.root.as_deref().map(NonNull::from)
    }

    fn root_ptr_mut(&mut self) -> Option<NonNull<Node<K, V>>> {
        self.root.as_deref_mut().map(NonNull::from)
    }

    fn search<Q>(&self, key: &Q) -> Option<&Node<K, V>>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut visits = 0;
        let mut next = self.root.as_deref();
        let found = loop {
            let Some(node) = next else {
                break None;
            };
            visits += 1;
            next = match key.cmp(node.key.borrow()) {
                Ordering::Equal => break Some(node),
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
            };
        };
        self.visits.set(visits);
        found
    }

    fn outermost(&self, side: Side) -> Option<&Node<K, V>> {
        let mut node = self.root.as_deref()?;
        while let Some(next) = node.link(side).as_deref() {
            node = next;
        }
        Some(node)
    }
} // End impl BstMap

impl<K: Ord, V: PartialEq> PartialEq for BstMap<K, V> {
    fn eq(&self, other: &BstMap<K, V>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}
impl<K: Ord, V: Eq> Eq for BstMap<K, V> {}

impl<'a, K: Ord, V> IntoIterator for &'a BstMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}
impl<'a, K: Ord, V> IntoIterator for &'a mut BstMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}
impl<K: Ord, V> FromIterator<(K, V)> for BstMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> BstMap<K, V> {
        let mut map = BstMap::new();
        map.extend(iter);
        map
    }
}
impl<K: Ord, V, const N: usize> From<[(K, V); N]> for BstMap<K, V> {
    fn from(arr: [(K, V); N]) -> BstMap<K, V> {
        arr.into_iter().collect()
    }
}
impl<K: Ord, V> Extend<(K, V)> for BstMap<K, V> {
    /// Inserts each pair in turn; a key already present keeps its first value.
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
impl<K, Q, V> std::ops::Index<&Q> for BstMap<K, V>
where
    K: Borrow<Q> + Ord,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// Panics if the key is not present in the `BstMap`.
    #[inline]
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}
impl<K: Ord + Debug, V: Debug> Debug for BstMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(feature = "serde")]
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

#[cfg(feature = "serde")]
impl<K: Serialize, V: Serialize> Serialize for BstMap<K, V> {
    /// Entries are written in preorder, so deserialising rebuilds the same tree shape.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for node in Preorder::new(self.root.as_deref()) {
            map.serialize_entry(&node.key, &node.value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct BstMapVisitor<K, V> {
    marker: PhantomData<fn() -> BstMap<K, V>>,
}

#[cfg(feature = "serde")]
impl<K, V> BstMapVisitor<K, V> {
    fn new() -> Self {
        BstMapVisitor {
            marker: PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> Visitor<'de> for BstMapVisitor<K, V>
where
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
{
    type Value = BstMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("BstMap")
    }

    fn visit_map<M>(self, mut access: M) -> std::result::Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut map = BstMap::new();
        let mut duplicates = 0;
        while let Some((k, v)) = access.next_entry()? {
            if !map.insert(k, v) {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            debug!("deserialize: ignored {duplicates} duplicate keys");
        }
        // The inserts above are not lookups the caller made.
        map.visits.set(0);
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> Deserialize<'de> for BstMap<K, V>
where
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(BstMapVisitor::new())
    }
}

type Link<K, V> = Option<Box<Node<K, V>>>;

/// Side of a node: smaller keys live on the left, greater keys on the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// How keys on this side compare with the node's key.
    fn ordering(self) -> Ordering {
        match self {
            Side::Left => Ordering::Less,
            Side::Right => Ordering::Greater,
        }
    }
}

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            left: None,
            right: None,
        })
    }

    fn link(&self, side: Side) -> &Link<K, V> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn into_pair(self: Box<Self>) -> (K, V) {
        let Node { key, value, .. } = *self;
        (key, value)
    }

    /// Overwrite key and value in place, returning the old ones.
    fn replace_pair(&mut self, (key, value): (K, V)) -> (K, V) {
        (
            std::mem::replace(&mut self.key, key),
            std::mem::replace(&mut self.value, value),
        )
    }
}

/// Slot holding key, or the empty slot where key would be attached.
fn slot_mut<'a, K, V, Q>(
    mut link: &'a mut Link<K, V>,
    key: &Q,
    visits: &mut usize,
) -> &'a mut Link<K, V>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    loop {
        let ord = match link.as_deref() {
            Some(node) => key.cmp(node.key.borrow()),
            None => return link,
        };
        *visits += 1;
        if ord == Ordering::Equal {
            return link;
        }
        if let Some(node) = link {
            link = if ord == Ordering::Less {
                &mut node.left
            } else {
                &mut node.right
            };
        }
    }
}

/// Unlink the leftmost node of a subtree, splicing its right child into its place.
fn take_leftmost<K, V>(mut link: &mut Link<K, V>, visits: &mut usize) -> Option<Box<Node<K, V>>> {
    loop {
        match link.as_deref() {
            Some(node) if node.left.is_some() => {}
            _ => break,
        }
        *visits += 1;
        if let Some(node) = link {
            link = &mut node.left;
        }
    }
    let mut min = link.take()?;
    *visits += 1;
    *link = min.right.take();
    Some(min)
}

/// Preorder walk with an explicit stack.
struct Preorder<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Preorder<'a, K, V> {
    fn new(root: Option<&'a Node<K, V>>) -> Self {
        Self {
            stack: root.into_iter().collect(),
        }
    }
}

impl<'a, K, V> Iterator for Preorder<'a, K, V> {
    type Item = &'a Node<K, V>;
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.right.as_deref());
        self.stack.extend(node.left.as_deref());
        Some(node)
    }
}

// Iteration.

/// Iterator returned by [`BstMap::keys`], visits keys in preorder.
pub struct Keys<'a, K, V>(Preorder<'a, K, V>);
impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|n| &n.key)
    }
}
impl<'a, K, V> FusedIterator for Keys<'a, K, V> {}

/// Iterator returned by [`BstMap::iter`].
pub struct Iter<'a, K, V> {
    len: usize,
    front: Cursor<'a, K, V>,
    back: Cursor<'a, K, V>,
}
impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            len: self.len,
            front: self.front.clone(),
            back: self.back.clone(),
        }
    }
}
impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            let kv = self.front.get().ok()?;
            self.front.advance().ok()?;
            Some(kv)
        }
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}
impl<'a, K: Ord, V> ExactSizeIterator for Iter<'a, K, V> {
    fn len(&self) -> usize {
        self.len
    }
}
impl<'a, K: Ord, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            let kv = self.back.get().ok()?;
            self.back.advance().ok()?;
            Some(kv)
        }
    }
}
impl<'a, K: Ord, V> FusedIterator for Iter<'a, K, V> {}

/// Iterator returned by [`BstMap::iter_mut`].
pub struct IterMut<'a, K, V> {
    len: usize,
    front: Path<K, V, Exclusive>,
    back: Path<K, V, Exclusive>,
    _pd: PhantomData<&'a mut BstMap<K, V>>,
}
impl<'a, K, V> IterMut<'a, K, V> {
    /// `len` keeps the two ends from meeting, so each node is handed out once.
    fn hand_out(path: &mut Path<K, V, Exclusive>, side: Side) -> Option<(&'a K, &'a mut V)>
    where
        K: Ord,
    {
        let node = path.current()?;
        path.step(side).ok()?;
        unsafe { Some((&(*node.as_ptr()).key, &mut (*node.as_ptr()).value)) }
    }
}
impl<'a, K: Ord, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            Self::hand_out(&mut self.front, Side::Right)
        }
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}
impl<'a, K: Ord, V> ExactSizeIterator for IterMut<'a, K, V> {
    fn len(&self) -> usize {
        self.len
    }
}
impl<'a, K: Ord, V> DoubleEndedIterator for IterMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            Self::hand_out(&mut self.back, Side::Left)
        }
    }
}
impl<'a, K: Ord, V> FusedIterator for IterMut<'a, K, V> {}

// Tests.

#[cfg(all(test, not(miri), feature = "cap"))]
#[global_allocator]
static ALLOCATOR: cap::Cap<std::alloc::System> =
    cap::Cap::new(std::alloc::System, usize::MAX);

#[cfg(test)]
fn print_memory() {
    #[cfg(all(test, not(miri), feature = "cap"))]
    println!("Memory allocated: {} bytes", ALLOCATOR.allocated());
}

/* mimalloc cannot be used with miri */
#[cfg(all(test, not(miri), not(feature = "cap")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(test)]
mod mytests;
