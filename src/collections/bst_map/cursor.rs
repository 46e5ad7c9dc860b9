//! Cursors over a [`BstMap`].
//!
//! Nodes do not know their parent. A cursor instead keeps the path it took from the root:
//! the current node plus a stack of its ancestors, root first. Moving to the in-order
//! successor either descends into the right subtree or unwinds the stack to the nearest
//! ancestor with a greater key; the predecessor is the mirror image. Forward and reverse
//! cursors are the same type, tagged with a [`Direction`].
//!
//! When a cursor runs off the end of its traversal the node it left is pushed onto the
//! stack, so retreating out of the end sentinel pops straight back to it.

use std::{borrow::Borrow, cmp::Ordering, fmt, marker::PhantomData, ptr::NonNull};

use super::{BstMap, Node, Side};
use crate::error::{Error, Result};

/// Direction of travel of a [`Cursor`] or [`CursorMut`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending key order, from [`BstMap::begin`] to [`BstMap::end`].
    Forward,
    /// Descending key order, from [`BstMap::rbegin`] to [`BstMap::rend`].
    Reverse,
}

impl Direction {
    /// Side of a node on which the next keys in this direction live.
    fn side(self) -> Side {
        match self {
            Direction::Forward => Side::Right,
            Direction::Reverse => Side::Left,
        }
    }
}

/// How a path derives child pointers: read-only paths must not gain write access.
pub(super) trait Access {
    /// # Safety
    ///
    /// `node` must point to a live node of a map borrowed for at least as long as the result is used.
    unsafe fn child<K, V>(node: NonNull<Node<K, V>>, side: Side) -> Option<NonNull<Node<K, V>>>;
}

/// Child pointers derived from shared references.
pub(super) enum Shared {}

/// Child pointers derived from mutable references.
pub(super) enum Exclusive {}

impl Access for Shared {
    unsafe fn child<K, V>(node: NonNull<Node<K, V>>, side: Side) -> Option<NonNull<Node<K, V>>> {
        let link = unsafe {
            match side {
                Side::Left => &(*node.as_ptr()).left,
                Side::Right => &(*node.as_ptr()).right,
            }
        };
        link.as_deref().map(NonNull::from)
    }
}

impl Access for Exclusive {
    unsafe fn child<K, V>(node: NonNull<Node<K, V>>, side: Side) -> Option<NonNull<Node<K, V>>> {
        let link = unsafe {
            match side {
                Side::Left => &mut (*node.as_ptr()).left,
                Side::Right => &mut (*node.as_ptr()).right,
            }
        };
        link.as_deref_mut().map(NonNull::from)
    }
}

/// Only the key field is borrowed, so a caller may hold the node's value mutably.
unsafe fn key_of<'k, K, V>(node: NonNull<Node<K, V>>) -> &'k K {
    unsafe { &(*node.as_ptr()).key }
}

/// Position within a tree: current node (`None` at a sentinel) and its ancestors, root first.
///
/// The pointers are only valid while the map is borrowed by whoever owns the path.
pub(super) struct Path<K, V, A> {
    current: Option<NonNull<Node<K, V>>>,
    stack: Vec<NonNull<Node<K, V>>>,
    _access: PhantomData<A>,
}

impl<K, V, A: Access> Path<K, V, A> {
    fn detached() -> Self {
        Self {
            current: None,
            stack: Vec::new(),
            _access: PhantomData,
        }
    }

    /// Path to the outermost node on `side`, i.e. the minimum for `Side::Left`.
    pub(super) fn edge(root: Option<NonNull<Node<K, V>>>, side: Side) -> Self {
        let mut path = Self::detached();
        if let Some(mut node) = root {
            while let Some(next) = unsafe { A::child(node, side) } {
                path.stack.push(node);
                node = next;
            }
            path.current = Some(node);
        }
        path
    }

    /// Sentinel one step beyond the outermost node on `side`, remembering the way back.
    pub(super) fn beyond(root: Option<NonNull<Node<K, V>>>, side: Side) -> Self {
        let mut path = Self::edge(root, side);
        path.park();
        path
    }

    /// Path to the node holding `key`, or a sentinel with no way back if there is none.
    pub(super) fn seek<Q>(root: Option<NonNull<Node<K, V>>>, key: &Q, visits: &mut usize) -> Self
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut stack = Vec::new();
        let mut next = root;
        while let Some(node) = next {
            *visits += 1;
            next = match key.cmp(unsafe { key_of(node) }.borrow()) {
                Ordering::Equal => {
                    return Self {
                        current: Some(node),
                        stack,
                        _access: PhantomData,
                    }
                }
                Ordering::Less => unsafe { A::child(node, Side::Left) },
                Ordering::Greater => unsafe { A::child(node, Side::Right) },
            };
            stack.push(node);
        }
        Self::detached()
    }

    pub(super) fn current(&self) -> Option<NonNull<Node<K, V>>> {
        self.current
    }

    /// Turn the path into a sentinel whose top of stack is the node just left.
    fn park(&mut self) {
        if let Some(node) = self.current.take() {
            self.stack.push(node);
        }
    }

    /// Move to the nearest key on `side` of the current one. Returns false, with the path
    /// unchanged, if the current node is the outermost on that side.
    fn neighbour(&mut self, side: Side) -> bool
    where
        K: Ord,
    {
        let Some(node) = self.current else {
            return false;
        };
        if let Some(mut next) = unsafe { A::child(node, side) } {
            self.stack.push(node);
            let inner = side.opposite();
            while let Some(deeper) = unsafe { A::child(next, inner) } {
                self.stack.push(next);
                next = deeper;
            }
            self.current = Some(next);
            return true;
        }
        let key = unsafe { key_of(node) };
        let wanted = side.ordering();
        let found = self
            .stack
            .iter()
            .rposition(|&a| unsafe { key_of(a) }.cmp(key) == wanted);
        match found {
            Some(i) => {
                self.current = Some(self.stack[i]);
                self.stack.truncate(i);
                true
            }
            None => false,
        }
    }

    /// Advance towards `side`, becoming a sentinel after the last node.
    pub(super) fn step(&mut self, side: Side) -> Result<()>
    where
        K: Ord,
    {
        if self.current.is_none() {
            return Err(Error::PastEnd);
        }
        if !self.neighbour(side) {
            self.park();
        }
        Ok(())
    }

    /// Undo a [`Path::step`] towards `side`.
    pub(super) fn step_back(&mut self, side: Side) -> Result<()>
    where
        K: Ord,
    {
        if self.current.is_none() {
            self.current = Some(self.stack.pop().ok_or(Error::BeforeBegin)?);
            return Ok(());
        }
        if self.neighbour(side.opposite()) {
            Ok(())
        } else {
            Err(Error::BeforeBegin)
        }
    }

    fn share(&self) -> Path<K, V, Shared> {
        Path {
            current: self.current,
            stack: self.stack.clone(),
            _access: PhantomData,
        }
    }
}

/// Read-only cursor returned by [`BstMap::begin`], [`BstMap::end`], [`BstMap::rbegin`],
/// [`BstMap::rend`] and [`BstMap::find`].
///
/// Cursors compare equal when they are at the same node (or both at the sentinel of the
/// same direction). They order by key in their direction of travel, with the sentinel
/// after every element.
pub struct Cursor<'a, K, V> {
    path: Path<K, V, Shared>,
    dir: Direction,
    _pd: PhantomData<&'a BstMap<K, V>>,
}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(super) fn new(path: Path<K, V, Shared>, dir: Direction) -> Self {
        Self {
            path,
            dir,
            _pd: PhantomData,
        }
    }

    /// Direction the cursor travels in.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// Is the cursor at the end sentinel (`end()` for forward, `rend()` for reverse)?
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.path.current.is_none()
    }

    /// Returns references to the key and value at the cursor.
    pub fn get(&self) -> Result<(&'a K, &'a V)> {
        let node = self.path.current.ok_or(Error::EndPosition)?;
        unsafe { Ok((&(*node.as_ptr()).key, &(*node.as_ptr()).value)) }
    }

    /// Returns a reference to the key at the cursor.
    pub fn key(&self) -> Result<&'a K> {
        Ok(self.get()?.0)
    }

    /// Returns a reference to the value at the cursor.
    pub fn value(&self) -> Result<&'a V> {
        Ok(self.get()?.1)
    }

    /// Move to the next element in the cursor's direction, or to the end sentinel after the last.
    pub fn advance(&mut self) -> Result<()>
    where
        K: Ord,
    {
        self.path.step(self.dir.side())
    }

    /// Move to the previous element in the cursor's direction.
    ///
    /// From the end sentinel this returns to the element the cursor left (for a sentinel from
    /// [`BstMap::end`], the last element). Fails at the first element.
    pub fn retreat(&mut self) -> Result<()>
    where
        K: Ord,
    {
        self.path.step_back(self.dir.side())
    }
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.path.share(), self.dir)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("direction", &self.dir)
            .field("entry", &self.get().ok())
            .finish()
    }
}

impl<K, V> PartialEq for Cursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.dir == other.dir && self.path.current == other.path.current
    }
}
impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K: Ord, V> PartialOrd for Cursor<'_, K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.dir != other.dir {
            return None;
        }
        match (self.path.current, other.path.current) {
            (None, None) => Some(Ordering::Equal),
            (None, Some(_)) => Some(Ordering::Greater),
            (Some(_), None) => Some(Ordering::Less),
            (Some(a), Some(b)) if a == b => Some(Ordering::Equal),
            (Some(a), Some(b)) => {
                let ord = unsafe { key_of(a).cmp(key_of(b)) };
                let ord = match self.dir {
                    Direction::Forward => ord,
                    Direction::Reverse => ord.reverse(),
                };
                // Equal keys at different nodes means the cursors belong to different maps.
                (ord != Ordering::Equal).then_some(ord)
            }
        }
    }
}

/// Cursor that allows mutation of values, returned by [`BstMap::begin_mut`], [`BstMap::end_mut`],
/// [`BstMap::rbegin_mut`], [`BstMap::rend_mut`] and [`BstMap::find_mut`].
pub struct CursorMut<'a, K, V> {
    path: Path<K, V, Exclusive>,
    dir: Direction,
    _pd: PhantomData<&'a mut BstMap<K, V>>,
}

impl<'a, K, V> CursorMut<'a, K, V> {
    pub(super) fn new(path: Path<K, V, Exclusive>, dir: Direction) -> Self {
        Self {
            path,
            dir,
            _pd: PhantomData,
        }
    }

    /// Direction the cursor travels in.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// Is the cursor at the end sentinel?
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.path.current.is_none()
    }

    /// Returns references to the key and value at the cursor.
    pub fn get(&self) -> Result<(&K, &V)> {
        let node = self.path.current.ok_or(Error::EndPosition)?;
        unsafe { Ok((&(*node.as_ptr()).key, &(*node.as_ptr()).value)) }
    }

    /// Returns a reference to the key and a mutable reference to the value at the cursor.
    pub fn get_mut(&mut self) -> Result<(&K, &mut V)> {
        let node = self.path.current.ok_or(Error::EndPosition)?;
        unsafe { Ok((&(*node.as_ptr()).key, &mut (*node.as_ptr()).value)) }
    }

    /// Converts the cursor into references that live as long as the map borrow.
    pub fn into_mut(self) -> Result<(&'a K, &'a mut V)> {
        let node = self.path.current.ok_or(Error::EndPosition)?;
        unsafe { Ok((&(*node.as_ptr()).key, &mut (*node.as_ptr()).value)) }
    }

    /// Move to the next element in the cursor's direction, or to the end sentinel after the last.
    pub fn advance(&mut self) -> Result<()>
    where
        K: Ord,
    {
        self.path.step(self.dir.side())
    }

    /// Move to the previous element in the cursor's direction.
    pub fn retreat(&mut self) -> Result<()>
    where
        K: Ord,
    {
        self.path.step_back(self.dir.side())
    }

    /// Returns a read-only cursor at the same position.
    #[must_use]
    pub fn as_cursor(&self) -> Cursor<'_, K, V> {
        Cursor::new(self.path.share(), self.dir)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CursorMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorMut")
            .field("direction", &self.dir)
            .field("entry", &self.get().ok())
            .finish()
    }
}
