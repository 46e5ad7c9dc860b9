#![deny(missing_docs)]

//! Ordered map on an unbalanced binary search tree, in particular [`collections::BstMap`],
//! with bidirectional cursors ([`collections::bst_map::Cursor`], [`collections::bst_map::CursorMut`])
//! that find their way through the tree using a stack of ancestors rather than parent links.

//!# Features
//!
//! This crate supports the following cargo features:
//! - `serde` : enables serialisation of [`collections::BstMap`] via serde crate.
//! - `cap` : in tests, report memory allocated via the cap crate.

/// Containers.
pub mod collections;

/// Error type shared by map lookups and cursor movement.
pub mod error;

pub use error::{Error, Result};
