//! Plaintext record shapes.
//!
//! Each of these is CBOR-encoded and then encrypted, signed or tagged by
//! the vault before it touches the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sealbox_core::{Blake3Hash, BlobId, SymmetricKey};

/// One user's handle on a file.
///
/// The owner and every recipient hold their own copy. Only `owner` and
/// `content_list_id` are shared across holders; the key record and tree
/// node are per holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Username of the file's creator.
    pub owner: String,

    /// Where the encrypted list of chunk ids lives.
    pub content_list_id: BlobId,

    /// Where this holder's sealed copy of the file key lives.
    pub file_key_id: BlobId,

    /// Where this holder's access-tree node lives.
    pub node_id: BlobId,

    /// Key the access-tree node is encrypted under.
    pub node_key: SymmetricKey,
}

impl FileMetadata {
    /// Whether `username` created this file.
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.owner == username
    }
}

/// Index slot for a filename: a keyed hash under the user's index key.
///
/// The store never sees filenames, and two users with the same filename
/// land on unrelated slots.
pub fn filename_slot(index_key: &SymmetricKey, filename: &str) -> String {
    Blake3Hash::keyed(index_key.as_bytes(), filename.as_bytes()).to_hex()
}

/// A user's private namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileIndex {
    entries: BTreeMap<String, FileMetadata>,
}

impl FileIndex {
    /// An index with no files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for `filename`, if present.
    pub fn get(&self, index_key: &SymmetricKey, filename: &str) -> Option<&FileMetadata> {
        self.entries.get(&filename_slot(index_key, filename))
    }

    /// Whether `filename` is present.
    pub fn contains(&self, index_key: &SymmetricKey, filename: &str) -> bool {
        self.entries.contains_key(&filename_slot(index_key, filename))
    }

    /// Insert or replace the entry for `filename`.
    pub fn insert(
        &mut self,
        index_key: &SymmetricKey,
        filename: &str,
        metadata: FileMetadata,
    ) -> Option<FileMetadata> {
        self.entries
            .insert(filename_slot(index_key, filename), metadata)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered chunk ids making up a file's content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentList {
    chunks: Vec<BlobId>,
}

impl ContentList {
    /// A list holding a single chunk.
    pub fn single(chunk: BlobId) -> Self {
        Self {
            chunks: vec![chunk],
        }
    }

    /// Build from ids in order.
    pub fn from_chunks(chunks: Vec<BlobId>) -> Self {
        Self { chunks }
    }

    /// Append a chunk id at the end.
    pub fn push(&mut self, chunk: BlobId) {
        self.chunks.push(chunk);
    }

    /// Chunk ids in content order.
    pub fn chunks(&self) -> &[BlobId] {
        &self.chunks
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// What an invitation handle unlocks: where the staged metadata is and the
/// key it is encrypted under. Sealed to the recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationCapsule {
    /// Where the staged [`FileMetadata`] lives.
    pub metadata_id: BlobId,

    /// Key the staged metadata is encrypted under.
    pub metadata_key: SymmetricKey,
}
