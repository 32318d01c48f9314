//! # burrowdb core
//!
//! An embedded, single-file, variable-length record store with pluggable
//! secondary indexing, free-space reuse and explicit commit/rollback.
//!
//! Records are flat byte sequences identified by caller-chosen `i32`
//! ids; the caller supplies the serialization through the [`Record`]
//! trait and any number of [`RecordIndex`] functors, each of which maps
//! a record to an `i32` code and becomes a queryable secondary index.
//!
//! ```no_run
//! use burrowdb_core::{put_i32, put_string, string_len};
//! use burrowdb_core::{ByteReader, CodecResult, PersistentStore, Record, RecordIndex};
//! use std::path::Path;
//!
//! struct Room {
//!     id: i32,
//!     zone: i32,
//!     name: String,
//! }
//!
//! impl Record for Room {
//!     fn id(&self) -> i32 {
//!         self.id
//!     }
//!     fn streamed_len(&self) -> usize {
//!         4 + 4 + 4 + string_len(&self.name)
//!     }
//!     fn encode(&self, out: &mut Vec<u8>) {
//!         put_i32(out, self.streamed_len() as i32);
//!         put_i32(out, self.id);
//!         put_i32(out, self.zone);
//!         put_string(out, &self.name);
//!     }
//!     fn decode(&mut self, input: &mut ByteReader<'_>) -> CodecResult<()> {
//!         let _ = input.read_i32()?;
//!         self.id = input.read_i32()?;
//!         self.zone = input.read_i32()?;
//!         self.name = input.read_string()?;
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), burrowdb_core::CoreError> {
//! let by_zone: Box<dyn RecordIndex<Room>> = Box::new(|room: &Room| room.zone);
//! let blank = Room { id: -1, zone: 0, name: String::new() };
//! let mut store = PersistentStore::open(Path::new("rooms.db"), vec![by_zone], blank)?;
//!
//! store.store(&Room { id: 1, zone: 7, name: "gatehouse".into() })?;
//! store.commit()?;
//! let in_zone_seven = store.ids_matching(&[7]);
//! # let _ = in_zone_seven;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cached;
mod codec;
mod error;
mod index_block;
mod record;
mod space;
mod store;

pub use cached::CachedStore;
pub use codec::{put_i32, put_string, string_len, ByteReader, CodecError, CodecResult};
pub use error::{CoreError, CoreResult};
pub use record::{Record, RecordIndex};
pub use store::PersistentStore;

pub use burrowdb_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError};
