//! Errors reported by [`BstMap`](crate::collections::BstMap) and its cursors.
//!
//! Only two kinds of operation can fail: keyed access that demands the key exists
//! ([`BstMap::at`](crate::collections::BstMap::at)), and cursor dereference or movement
//! past the ends of the traversal. Inserting a duplicate key or erasing a missing one is
//! not an error, those report `false`.
//!
//! A failed operation never modifies the map or the cursor.

use thiserror::Error;

/// Errors that can occur when accessing a map or moving a cursor.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The requested key is not in the map.
    #[error("no entry found for key")]
    KeyNotFound,

    /// The cursor is at an end sentinel and has no element to yield.
    #[error("cursor is at an end position and has no element")]
    EndPosition,

    /// The cursor is already at its end sentinel.
    #[error("cursor cannot advance past the end position")]
    PastEnd,

    /// The cursor is at the first element of its direction, or at a sentinel that
    /// has no element to return to.
    #[error("cursor cannot retreat before the first element")]
    BeforeBegin,
}

impl Error {
    /// Is this a cursor state error (as opposed to a missing key)?
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        !matches!(self, Error::KeyNotFound)
    }
}

/// A Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
