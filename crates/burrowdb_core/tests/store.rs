//! End-to-end tests over real files.

use burrowdb_core::{
    put_i32, put_string, string_len, ByteReader, CodecResult, CoreError, PersistentStore, Record,
    RecordIndex,
};
use std::path::Path;
use tempfile::TempDir;

/// A small game-world record: an id, a zone used for secondary
/// indexing, and a variable-length name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Room {
    id: i32,
    zone: i32,
    name: String,
}

impl Room {
    fn new(id: i32, zone: i32, name: &str) -> Room {
        Room {
            id,
            zone,
            name: name.to_string(),
        }
    }

    fn blank() -> Room {
        Room::new(-1, 0, "")
    }
}

impl Record for Room {
    fn id(&self) -> i32 {
        self.id
    }

    fn streamed_len(&self) -> usize {
        4 + 4 + 4 + string_len(&self.name)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        put_i32(out, self.streamed_len() as i32);
        put_i32(out, self.id);
        put_i32(out, self.zone);
        put_string(out, &self.name);
    }

    fn decode(&mut self, input: &mut ByteReader<'_>) -> CodecResult<()> {
        let _length = input.read_i32()?;
        self.id = input.read_i32()?;
        self.zone = input.read_i32()?;
        self.name = input.read_string()?;
        Ok(())
    }
}

fn zone_functor() -> Box<dyn RecordIndex<Room>> {
    Box::new(|room: &Room| room.zone)
}

fn open_store(path: &Path) -> PersistentStore<Room> {
    PersistentStore::open(path, vec![zone_functor()], Room::blank()).unwrap()
}

fn load(store: &PersistentStore<Room>, id: i32) -> Option<Room> {
    let mut room = Room::blank();
    store.load(id, &mut room).unwrap();
    (room.id == id).then_some(room)
}

#[test]
fn committed_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");

    {
        let mut store = open_store(&path);
        store.store(&Room::new(1, 10, "gatehouse")).unwrap();
        store.store(&Room::new(2, 10, "inner ward")).unwrap();
        store.store(&Room::new(3, 20, "crypt")).unwrap();
        store.flush().unwrap();
        store.close();
    }

    let store = open_store(&path);
    assert_eq!(store.ids(), vec![1, 2, 3]);
    assert_eq!(load(&store, 2).unwrap().name, "inner ward");
    assert_eq!(store.ids_matching(&[10]), vec![1, 2]);
    assert_eq!(store.ids_matching(&[20]), vec![3]);
    assert_eq!(store.max_id(), Some(3));
}

#[test]
fn uncommitted_changes_are_lost_on_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");

    {
        let mut store = open_store(&path);
        store.store(&Room::new(1, 10, "gatehouse")).unwrap();
        store.commit().unwrap();
        store.store(&Room::new(2, 10, "oubliette")).unwrap();
        store.delete(1).unwrap();
        // Dropped without commit.
        store.close();
    }

    let store = open_store(&path);
    assert_eq!(store.ids(), vec![1]);
    assert_eq!(load(&store, 1).unwrap().name, "gatehouse");
    assert!(load(&store, 2).is_none());
}

#[test]
fn rollback_restores_records_and_indices() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let mut store = open_store(&path);

    store.store(&Room::new(1, 10, "gatehouse")).unwrap();
    store.store(&Room::new(2, 20, "crypt")).unwrap();
    store.commit().unwrap();

    store.delete(1).unwrap();
    store.store(&Room::new(2, 30, "renamed crypt")).unwrap();
    store.store(&Room::new(3, 10, "barbican")).unwrap();
    store.rollback();

    assert_eq!(store.ids(), vec![1, 2]);
    assert_eq!(load(&store, 1).unwrap().name, "gatehouse");
    assert_eq!(load(&store, 2).unwrap().zone, 20);
    assert_eq!(store.ids_matching(&[10]), vec![1]);
    assert_eq!(store.ids_matching(&[20]), vec![2]);
    assert!(store.ids_matching(&[30]).is_empty());
}

#[test]
fn mid_transaction_file_state_reopens_as_last_commit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let crashed = dir.path().join("crashed.db");

    let mut store = open_store(&path);
    store.store(&Room::new(1, 10, "gatehouse")).unwrap();
    store.flush().unwrap();

    // Data-block writes land in the file before commit; the header is
    // only re-pointed by commit. A copy taken now is what a crash would
    // leave behind.
    store.store(&Room::new(2, 10, "oubliette")).unwrap();
    store.delete(1).unwrap();
    std::fs::copy(&path, &crashed).unwrap();

    let recovered = open_store(&crashed);
    assert_eq!(recovered.ids(), vec![1]);
    assert_eq!(load(&recovered, 1).unwrap().name, "gatehouse");
}

#[test]
fn paired_ids_share_a_code() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let pair_functor: Box<dyn RecordIndex<Room>> = Box::new(|room: &Room| room.id / 2);
    let mut store =
        PersistentStore::open(&path, vec![pair_functor], Room::blank()).unwrap();

    for id in 0..100 {
        store.store(&Room::new(id, id, "cell")).unwrap();
    }
    store.commit().unwrap();
    for code in 0..50 {
        assert_eq!(store.ids_matching(&[code]), vec![code * 2, code * 2 + 1]);
    }

    for id in (0..100).step_by(2) {
        store.delete(id).unwrap();
    }
    store.commit().unwrap();
    for code in 0..50 {
        assert_eq!(store.ids_matching(&[code]), vec![code * 2 + 1]);
    }

    // Re-adding the even ids and rolling back leaves only the odd ones.
    for id in (0..100).step_by(2) {
        store.store(&Room::new(id, id, "cell")).unwrap();
    }
    store.rollback();
    assert_eq!(store.id_count(), 50);
    for code in 0..50 {
        assert_eq!(store.ids_matching(&[code]), vec![code * 2 + 1]);
    }
}

#[test]
fn pack_eliminates_all_gaps() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let mut store = open_store(&path);

    let mut live = Vec::new();
    for id in 0..40 {
        let name = "x".repeat((id as usize * 13) % 97);
        let room = Room::new(id, id % 5, &name);
        store.store(&room).unwrap();
        live.push(room);
    }
    store.commit().unwrap();
    for id in (0..40).step_by(3) {
        store.delete(id).unwrap();
    }
    live.retain(|room| room.id % 3 != 0);
    store.pack().unwrap();

    // No gaps: the file is exactly the header, the index block's
    // power-of-two region and the live records.
    let record_bytes: u64 = live.iter().map(|r| r.streamed_len() as u64).sum();
    let file_len = std::fs::metadata(&path).unwrap().len();
    let index_region = file_len - 8 - record_bytes;
    assert!(index_region.is_power_of_two(), "index region {index_region}");

    for room in &live {
        assert_eq!(load(&store, room.id).as_ref(), Some(room));
    }
    store.close();

    // And the packed file reopens cleanly.
    let store = open_store(&path);
    assert_eq!(store.id_count(), live.len());
    for room in &live {
        assert_eq!(load(&store, room.id).as_ref(), Some(room));
    }
}

#[test]
fn pack_shrinks_a_fragmented_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let mut store = open_store(&path);

    for id in 0..50 {
        store.store(&Room::new(id, 0, "some room name")).unwrap();
    }
    store.commit().unwrap();
    for id in 0..45 {
        store.delete(id).unwrap();
    }
    store.commit().unwrap();
    let before = std::fs::metadata(&path).unwrap().len();
    store.pack().unwrap();
    let after = std::fs::metadata(&path).unwrap().len();
    assert!(after < before, "pack did not shrink: {before} -> {after}");
    assert_eq!(store.ids(), vec![45, 46, 47, 48, 49]);
}

#[test]
fn pack_of_untouched_store_truncates_to_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let mut store = open_store(&path);
    store.pack().unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 8);
}

#[test]
fn freed_space_is_reused_after_commit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let mut store = open_store(&path);

    // Steady-state churn: the same record stored and deleted over and
    // over must recycle space instead of growing the file.
    for cycle in 0..50 {
        store
            .store(&Room::new(1, cycle, "the self-same room"))
            .unwrap();
        store.commit().unwrap();
        store.delete(1).unwrap();
        store.commit().unwrap();
    }
    let file_len = std::fs::metadata(&path).unwrap().len();
    assert!(file_len < 4096, "file grew unboundedly: {file_len}");
}

#[test]
fn replacing_a_record_reuses_its_space_across_commits() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let mut store = open_store(&path);

    for cycle in 0..50 {
        for id in 0..10 {
            store
                .store(&Room::new(id, cycle, "a room of constant size"))
                .unwrap();
        }
        store.commit().unwrap();
    }
    let file_len = std::fs::metadata(&path).unwrap().len();
    assert!(file_len < 8192, "file grew unboundedly: {file_len}");
}

#[test]
fn functor_count_mismatch_is_corruption() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    {
        let mut store = open_store(&path);
        store.store(&Room::new(1, 10, "gatehouse")).unwrap();
        store.flush().unwrap();
        store.close();
    }
    let result: Result<PersistentStore<Room>, _> =
        PersistentStore::open(&path, vec![zone_functor(), zone_functor()], Room::blank());
    assert!(matches!(result, Err(CoreError::CorruptIndexBlock { .. })));
}

#[test]
fn reload_refreshes_a_stale_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let mut store = open_store(&path);

    let mut room = Room::new(1, 10, "gatehouse");
    store.store(&room).unwrap();
    store.store(&Room::new(1, 10, "renamed gatehouse")).unwrap();
    store.reload(&mut room).unwrap();
    assert_eq!(room.name, "renamed gatehouse");
}

#[test]
fn ids_are_never_invented() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let mut store = open_store(&path);
    assert_eq!(store.max_id(), None);

    store.store(&Room::new(41, 0, "a")).unwrap();
    let next = store.max_id().map_or(0, |id| id + 1);
    store.store(&Room::new(next, 0, "b")).unwrap();
    assert_eq!(store.ids(), vec![41, 42]);
}

#[test]
fn empty_strings_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let mut store = open_store(&path);
    store.store(&Room::new(1, 0, "")).unwrap();
    store.flush().unwrap();
    assert_eq!(load(&store, 1).unwrap().name, "");
}

#[test]
fn many_records_with_varied_sizes_survive_heavy_churn() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rooms.db");
    let mut store = open_store(&path);

    // Deterministic pseudo-random churn, then verify against a model.
    let mut model: std::collections::BTreeMap<i32, Room> = std::collections::BTreeMap::new();
    let mut state = 0x2545f491_u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    for _ in 0..600 {
        let id = (next() % 64) as i32;
        match next() % 4 {
            0 => {
                store.delete(id).unwrap();
                model.remove(&id);
            }
            1 => {
                store.commit().unwrap();
            }
            _ => {
                let room = Room::new(id, id % 7, &"n".repeat((next() % 50) as usize));
                store.store(&room).unwrap();
                model.insert(id, room);
            }
        }
    }
    store.pack().unwrap();

    assert_eq!(store.ids(), model.keys().copied().collect::<Vec<_>>());
    for (id, room) in &model {
        assert_eq!(load(&store, *id).as_ref(), Some(room));
    }
    for zone in 0..7 {
        let expected: Vec<i32> = model
            .values()
            .filter(|room| room.zone == zone)
            .map(|room| room.id)
            .collect();
        assert_eq!(store.ids_matching(&[zone]), expected);
    }
}
