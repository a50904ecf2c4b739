//! An in-memory classic B-tree ordered index for Rust.
//!
//! This crate provides [`BTree`], an ordered key/value index whose keys are ordered
//! by an injected [`Comparator`] rather than by the key type itself. It is the index
//! structure of a page-oriented storage engine, kept in memory: every node holds
//! between `t` and `2t` entries, so a node maps onto one disk page once
//! [`Config::fitting_page`] has picked `t` for a given page and entry size.
//!
//! # Example
//!
//! ```
//! use termos_btree::{BTree, Config, ReverseOrder};
//!
//! let mut index = BTree::with_config(Config::new(2, ReverseOrder).unwrap());
//! for (key, value) in [(3, "c"), (1, "a"), (4, "d"), (2, "b"), (5, "e")] {
//!     index.insert(key, value);
//! }
//! index.put(None, Some("null"));
//!
//! // The null key sorts before every other key, whatever the comparator.
//! let order: Vec<_> = index.entries().map(|(key, _)| key.copied()).collect();
//! assert_eq!(order, [None, Some(5), Some(4), Some(3), Some(2), Some(1)]);
//!
//! // Range scans start from any key, present or not.
//! assert_eq!(index.next_entry(Some(&10)), Some((Some(&5), &"e")));
//!
//! index.verify().unwrap();
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Classic B-tree** - Entries live in inner nodes as well as leaves
//! - **Null key** - A single entry addressed by `None`, ordered first
//! - **Self-checking** - [`BTree::verify`] reports the first node breaking a structural rule
//!
//! # Implementation
//!
//! Nodes are stored in an arena and refer to their children by index. There are no
//! parent or sibling links; ordered traversal re-descends from the root with the
//! last key returned. Full nodes split on the way back up from an insertion, and
//! nodes left short by a removal are merged with, or borrow from, a sibling.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod btree;
mod config;
mod error;
mod order;
mod raw;

pub use btree::{BTree, Entries, Structure};
pub use config::{Config, DEFAULT_BRANCHING_FACTOR, DEFAULT_PAGE_SIZE};
pub use error::{Error, InvariantViolation, NodeRef, Result};
pub use order::{Comparator, NaturalOrder, OrderFn, ReverseOrder, order_by};
