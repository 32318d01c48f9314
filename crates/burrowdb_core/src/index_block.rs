//! The persisted index block: id-to-offset map plus secondary indices.

use crate::codec::{put_i32, ByteReader};
use crate::error::{CoreError, CoreResult};
use burrowdb_containers::{IntIntMap, IntObjectMap, IntSet};
use std::fmt::Write as _;

/// The primary id -> file offset map.
///
/// Serialized as `[byte_len i32][id i32, offset i32]*` with ids ascending;
/// `byte_len` counts itself, so it is `8 * entries + 4`.
#[derive(Debug, Clone, Default)]
pub(crate) struct IdIndex {
    map: IntIntMap,
}

impl IdIndex {
    fn new() -> IdIndex {
        IdIndex { map: IntIntMap::new() }
    }

    pub(crate) fn get(&self, id: i32) -> Option<i32> {
        self.map.get(id)
    }

    fn insert(&mut self, id: i32, offset: i32) {
        self.map.insert(id, offset);
    }

    fn remove(&mut self, id: i32) -> Option<i32> {
        self.map.remove(id)
    }

    pub(crate) fn contains(&self, id: i32) -> bool {
        self.map.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn max_id(&self) -> Option<i32> {
        self.map.max_key()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.map.iter()
    }

    fn streamed_len(&self) -> usize {
        self.map.len() * 8 + 4
    }

    fn encode(&self, out: &mut Vec<u8>) {
        put_i32(out, self.streamed_len() as i32);
        for (id, offset) in self.map.iter() {
            put_i32(out, id);
            put_i32(out, offset);
        }
    }

    fn decode(input: &mut ByteReader<'_>) -> CoreResult<IdIndex> {
        let byte_len = input.read_i32()?;
        if byte_len < 4 || (byte_len - 4) % 8 != 0 {
            return Err(CoreError::corrupt_index(format!(
                "id index length {byte_len} is not 4 + 8n"
            )));
        }
        let entries = (byte_len - 4) / 8;
        let mut map = IntIntMap::with_capacity(entries as usize);
        for _ in 0..entries {
            let id = input.read_i32()?;
            let offset = input.read_i32()?;
            map.insert(id, offset);
        }
        Ok(IdIndex { map })
    }
}

/// One secondary index: classification code -> set of ids.
///
/// Serialized as `[byte_len i32][entry_count i32]` then per code
/// `[code i32][id_count i32][id i32]*`. The byte length is maintained
/// incrementally: 8 bytes base, +8 for each distinct code, +4 per id.
#[derive(Debug, Clone)]
pub(crate) struct CodeIndex {
    map: IntObjectMap<IntSet>,
    streamed_len: usize,
}

impl CodeIndex {
    fn new() -> CodeIndex {
        CodeIndex {
            map: IntObjectMap::new(),
            streamed_len: 8,
        }
    }

    /// Adds `id` under `code`. Returns `true` if it was not already there.
    fn add(&mut self, code: i32, id: i32) -> bool {
        let set = match self.map.get_mut(code) {
            Some(set) => set,
            None => {
                self.map.insert(code, IntSet::with_capacity(1));
                self.streamed_len += 8;
                self.map.get_mut(code).expect("just inserted")
            }
        };
        if set.add(id) {
            self.streamed_len += 4;
            true
        } else {
            false
        }
    }

    /// Removes `id` from `code`'s set. Returns `true` if it was there.
    fn remove(&mut self, code: i32, id: i32) -> bool {
        let Some(set) = self.map.get_mut(code) else {
            return false;
        };
        if !set.remove(id) {
            return false;
        }
        self.streamed_len -= 4;
        if set.is_empty() {
            self.map.remove(code);
            self.streamed_len -= 8;
        }
        true
    }

    fn ids(&self, code: i32) -> Option<&IntSet> {
        self.map.get(code)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        put_i32(out, self.streamed_len as i32);
        put_i32(out, self.map.len() as i32);
        for (code, ids) in self.map.iter() {
            put_i32(out, code);
            put_i32(out, ids.len() as i32);
            for id in ids.iter() {
                put_i32(out, id);
            }
        }
    }

    fn decode(input: &mut ByteReader<'_>) -> CoreResult<CodeIndex> {
        let byte_len = input.read_i32()?;
        let entry_count = input.read_i32()?;
        if byte_len < 8 || entry_count < 0 {
            return Err(CoreError::corrupt_index(format!(
                "secondary index header invalid: len {byte_len}, entries {entry_count}"
            )));
        }
        let mut index = CodeIndex::new();
        for _ in 0..entry_count {
            let code = input.read_i32()?;
            let id_count = input.read_i32()?;
            if id_count < 0 {
                return Err(CoreError::corrupt_index(format!(
                    "secondary index code {code} has negative id count"
                )));
            }
            for _ in 0..id_count {
                index.add(code, input.read_i32()?);
            }
        }
        if index.streamed_len != byte_len as usize {
            return Err(CoreError::corrupt_index(format!(
                "secondary index length {} disagrees with header {byte_len}",
                index.streamed_len
            )));
        }
        Ok(index)
    }
}

/// The persisted metadata unit: the id -> offset map plus one secondary
/// index per registered functor.
///
/// Serialized as `[total_len i32][id index][index_count i32][indices...]`,
/// all big-endian. The id map is written in ascending id order, which
/// makes the on-disk position of each id's offset field computable - see
/// [`IndexBlock::offset_field_position`]; pack() patches relocated
/// offsets directly through that layout.
#[derive(Debug, Clone)]
pub(crate) struct IndexBlock {
    ids: IdIndex,
    codes: Vec<CodeIndex>,
}

impl IndexBlock {
    pub(crate) fn new(index_count: usize) -> IndexBlock {
        IndexBlock {
            ids: IdIndex::new(),
            codes: (0..index_count).map(|_| CodeIndex::new()).collect(),
        }
    }

    /// Byte position, relative to the block start, of the offset field for
    /// the id at ascending rank `rank`.
    ///
    /// Layout: total_len (4) + id-index len (4) + rank entries of 8 bytes,
    /// then the entry's id (4) precedes its offset.
    pub(crate) const fn offset_field_position(rank: usize) -> usize {
        8 + rank * 8 + 4
    }

    /// Maps `id` at `offset` and adds it to each secondary index under the
    /// positionally matching code.
    ///
    /// A live id must be removed (with its old codes) before being mapped
    /// again; the store's delete-before-store discipline guarantees that.
    pub(crate) fn put(&mut self, id: i32, offset: i32, codes: &[i32]) {
        debug_assert!(!self.ids.contains(id), "put over a live id");
        debug_assert_eq!(codes.len(), self.codes.len());
        for (index, &code) in self.codes.iter_mut().zip(codes) {
            index.add(code, id);
        }
        self.ids.insert(id, offset);
    }

    /// Unmaps `id`, removing it from each secondary index under the
    /// positionally matching code. The codes must have been derived from
    /// the record's still-live data. Returns the old offset.
    pub(crate) fn remove(&mut self, id: i32, codes: &[i32]) -> Option<i32> {
        debug_assert_eq!(codes.len(), self.codes.len());
        for (index, &code) in self.codes.iter_mut().zip(codes) {
            index.remove(code, id);
        }
        self.ids.remove(id)
    }

    pub(crate) fn offset_of(&self, id: i32) -> Option<i32> {
        self.ids.get(id)
    }

    pub(crate) fn contains(&self, id: i32) -> bool {
        self.ids.contains(id)
    }

    pub(crate) fn id_count(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn max_id(&self) -> Option<i32> {
        self.ids.max_id()
    }

    /// All live ids in ascending order.
    pub(crate) fn id_list(&self) -> Vec<i32> {
        self.ids.iter().map(|(id, _)| id).collect()
    }

    pub(crate) fn id_offsets(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.ids.iter()
    }

    pub(crate) fn index_count(&self) -> usize {
        self.codes.len()
    }

    /// Snapshot of the ids mapped to `code` in secondary index
    /// `index_no`; empty when the code is absent.
    pub(crate) fn ids_for(&self, code: i32, index_no: usize) -> IntSet {
        self.codes[index_no]
            .ids(code)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn streamed_len(&self) -> usize {
        8 + self.ids.streamed_len() + self.codes.iter().map(|c| c.streamed_len).sum::<usize>()
    }

    /// Serializes the block; the output length equals
    /// [`streamed_len`](IndexBlock::streamed_len).
    pub(crate) fn encode(&self) -> Vec<u8> {
        let total = self.streamed_len();
        let mut out = Vec::with_capacity(total);
        put_i32(&mut out, total as i32);
        self.ids.encode(&mut out);
        put_i32(&mut out, self.codes.len() as i32);
        for index in &self.codes {
            index.encode(&mut out);
        }
        debug_assert_eq!(out.len(), total);
        out
    }

    /// Deserializes a block, validating it against the number of
    /// registered index functors.
    pub(crate) fn decode(bytes: &[u8], expected_indices: usize) -> CoreResult<IndexBlock> {
        let mut input = ByteReader::new(bytes);
        let total = input.read_i32()?;
        if total < 8 || total as usize > bytes.len() {
            return Err(CoreError::corrupt_index(format!(
                "index block length {total} outside block of {} bytes",
                bytes.len()
            )));
        }
        let ids = IdIndex::decode(&mut input)?;
        let index_count = input.read_i32()?;
        if index_count < 0 {
            return Err(CoreError::corrupt_index("negative secondary index count"));
        }
        if index_count as usize != expected_indices {
            return Err(CoreError::corrupt_index(format!(
                "stored block has {index_count} secondary indices, {expected_indices} registered"
            )));
        }
        let mut codes = Vec::with_capacity(expected_indices);
        for _ in 0..index_count {
            codes.push(CodeIndex::decode(&mut input)?);
        }
        Ok(IndexBlock { ids, codes })
    }

    /// Human-readable dump for diagnostics.
    pub(crate) fn report(&self) -> String {
        let mut out = String::from("id -> offset:\n");
        for (id, offset) in self.ids.iter() {
            let _ = writeln!(out, "{id:>8} -> {offset:>8}");
        }
        for (n, index) in self.codes.iter().enumerate() {
            let _ = writeln!(out, "secondary index {n}:");
            for (code, ids) in index.map.iter() {
                let _ = write!(out, "{code:>7} ->");
                for id in ids.iter() {
                    let _ = write!(out, " {id}");
                }
                out.push('\n');
            }
        }
        out
    }
}
