//! # burrowdb storage
//!
//! Random-access storage backends for the burrowdb record store.
//!
//! Backends are opaque byte stores: they read and write at explicit
//! offsets and know nothing about headers, blocks or records. The engine
//! owns all format interpretation.
//!
//! Implementations:
//! - [`FileBackend`] - persistent storage over a file
//! - [`InMemoryBackend`] - volatile storage for tests

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
