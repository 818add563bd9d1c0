//! Helpers that act as the adversary on the untrusted store.
//!
//! The adversary can do anything the plain [`BlobStore`] API allows. These
//! helpers just make the common attacks one-liners. They panic on store
//! errors, since the in-memory store only fails on a poisoned lock.

use std::collections::HashMap;

use rand::Rng;
use sealbox_core::BlobId;
use sealbox_store::{location_tag, BlobStore, MemoryBlobStore, TAG_LEN};

/// Every record currently in `store`.
pub fn snapshot(store: &MemoryBlobStore) -> HashMap<BlobId, Vec<u8>> {
    store.snapshot().expect("snapshot store")
}

/// Run `f` and return the ids whose bytes it created or changed, sorted.
pub fn records_written_by(store: &MemoryBlobStore, f: impl FnOnce()) -> Vec<BlobId> {
    let before = snapshot(store);
    f();
    let mut changed: Vec<BlobId> = snapshot(store)
        .into_iter()
        .filter(|(id, data)| before.get(id) != Some(data))
        .map(|(id, _)| id)
        .collect();
    changed.sort();
    changed
}

/// Ids present in `after` but not in `before`.
pub fn new_ids(
    before: &HashMap<BlobId, Vec<u8>>,
    after: &HashMap<BlobId, Vec<u8>>,
) -> Vec<BlobId> {
    let mut ids: Vec<BlobId> = after
        .keys()
        .filter(|id| !before.contains_key(id))
        .copied()
        .collect();
    ids.sort();
    ids
}

/// XOR one byte of the record at `id`. `pos` wraps around the record length.
///
/// # Panics
///
/// If there is no record at `id`, or it is empty.
pub fn flip_byte(store: &MemoryBlobStore, id: &BlobId, pos: usize) {
    let mut data = store.get(id).expect("read record").expect("record exists");
    assert!(!data.is_empty(), "cannot flip a byte of an empty record");
    let i = pos % data.len();
    data[i] ^= 0x01;
    store.put(id, &data).expect("write record");
}

/// Flip a random byte of the record at `id`.
pub fn flip_random_byte(store: &MemoryBlobStore, id: &BlobId) {
    let pos = rand::thread_rng().gen::<usize>();
    flip_byte(store, id, pos);
}

/// Cut the record at `id` down to `len` bytes.
pub fn truncate(store: &MemoryBlobStore, id: &BlobId, len: usize) {
    let mut data = store.get(id).expect("read record").expect("record exists");
    data.truncate(len);
    store.put(id, &data).expect("write record");
}

/// Copy the bytes at `from` over `to`.
pub fn copy_record(store: &MemoryBlobStore, from: &BlobId, to: &BlobId) {
    let data = store.get(from).expect("read record").expect("record exists");
    store.put(to, &data).expect("write record");
}

/// Move the body of the record at `from` to `to`, recomputing the location
/// tag so the framing check passes at the new id.
pub fn retag_record(store: &MemoryBlobStore, from: &BlobId, to: &BlobId) {
    let data = store.get(from).expect("read record").expect("record exists");
    assert!(data.len() >= TAG_LEN, "record shorter than its tag");
    let body = &data[..data.len() - TAG_LEN];

    let mut framed = body.to_vec();
    framed.extend_from_slice(location_tag(to, body).as_bytes());
    store.put(to, &framed).expect("write record");
}

/// Exchange the bodies of two records, re-tagging both.
pub fn swap_retagged(store: &MemoryBlobStore, a: &BlobId, b: &BlobId) {
    let saved = store.get(a).expect("read record").expect("record exists");
    retag_record(store, b, a);

    let body = &saved[..saved.len() - TAG_LEN];
    let mut framed = body.to_vec();
    framed.extend_from_slice(location_tag(b, body).as_bytes());
    store.put(b, &framed).expect("write record");
}

/// Write back earlier bytes for `id`, as a rollback attack.
pub fn replay(store: &MemoryBlobStore, snapshot: &HashMap<BlobId, Vec<u8>>, id: &BlobId) {
    let data = snapshot.get(id).expect("record in snapshot");
    store.put(id, data).expect("write record");
}
