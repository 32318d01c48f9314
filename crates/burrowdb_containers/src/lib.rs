//! # burrowdb containers
//!
//! Ordered integer containers for the burrowdb storage engine.
//!
//! This crate provides:
//! - [`IntSet`] - an ordered set of `i32` values
//! - [`IntIntMap`] - an ordered `i32` to `i32` map
//! - [`IntObjectMap`] - an ordered `i32` to value map
//! - [`BoundedCache`] - a bounded LRU cache over [`IntObjectMap`]
//!
//! All three tree containers share one red-black tree implementation whose
//! nodes live in a flat slot arena rather than linked heap objects. Lookups,
//! insertions and removals complete in O(log n); the arena stays dense under
//! deletion, so memory only ever grows with the high-water element count.
//!
//! Besides exact lookups, every container answers floor and ceiling queries
//! (largest key `<=` / smallest key `>=` a probe), which the storage engine
//! uses for best-fit allocation and neighbor coalescing.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod error;
mod int_map;
mod object_map;
mod set;
mod tree;

pub use cache::BoundedCache;
pub use error::{ContainerError, ContainerResult};
pub use int_map::{IntIntMap, IntIntMapCursor};
pub use object_map::IntObjectMap;
pub use set::{IntSet, IntSetCursor};
