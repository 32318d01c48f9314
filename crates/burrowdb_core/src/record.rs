//! Record and secondary index contracts.

use crate::codec::{ByteReader, CodecResult};

/// A self-describing byte-encoded record.
///
/// The store treats records as opaque: each one reports its own
/// caller-assigned non-negative id and its exact encoded byte length, and
/// encodes/decodes itself. The declared length is load-bearing: the store
/// verifies it against the bytes actually produced and treats a mismatch
/// as fatal corruption, not a recoverable error.
///
/// The first four bytes a record encodes **must** be its total streamed
/// length as a big-endian `i32` (length prefix included in the count);
/// the store rebuilds its space bookkeeping at open time from these
/// prefixes.
pub trait Record {
    /// The record's non-negative identity.
    fn id(&self) -> i32;

    /// Exact number of bytes [`encode`](Record::encode) will append,
    /// including the 4-byte length prefix.
    fn streamed_len(&self) -> usize;

    /// Appends exactly [`streamed_len`](Record::streamed_len) bytes to
    /// `out`, starting with the length prefix.
    fn encode(&self, out: &mut Vec<u8>);

    /// Replaces this record's state from `input`, which is positioned at
    /// the length prefix.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the bytes are truncated or malformed.
    fn decode(&mut self, input: &mut ByteReader<'_>) -> CodecResult<()>;
}

/// Derives an integer classification code from a record.
///
/// Each functor registered at open time builds one secondary index:
/// code -> set of ids whose record currently produces that code. The
/// derivation must be pure and deterministic given the record's state at
/// index-maintenance time.
///
/// Functor instances are constructed by the caller and passed to
/// [`PersistentStore`](crate::PersistentStore) at open - never global
/// singletons. Closures work directly:
///
/// ```ignore
/// let by_region = |room: &Room| room.region_id;
/// let store = PersistentStore::open(path, vec![Box::new(by_region)], Room::default())?;
/// ```
pub trait RecordIndex<R: Record> {
    /// The classification code for `record`.
    fn code(&self, record: &R) -> i32;
}

impl<R: Record, F> RecordIndex<R> for F
where
    F: Fn(&R) -> i32,
{
    fn code(&self, record: &R) -> i32 {
        self(record)
    }
}
