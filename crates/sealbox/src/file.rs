//! Content operations: store, append, load.
//!
//! A file's bytes live in chunks, each encrypted under the file key at its
//! own id. An encrypted list of chunk ids gives their order. Appending adds
//! one chunk and rewrites only the list.

use sealbox_access::{AccessNode, ContentList, FileMetadata};
use sealbox_core::SymmetricKey;
use sealbox_store::{BlobStore, KeyDirectory};

use crate::envelope;
use crate::error::{Result, VaultError};
use crate::identity::{write_content_list, Identity};

impl<S: BlobStore, D: KeyDirectory> Identity<S, D> {
    /// Create `filename` with `content`, or replace the content of an
    /// existing file.
    ///
    /// Replacing works for every holder, not only the owner, and is visible
    /// to everyone the file is shared with.
    pub fn store_file(&self, filename: &str, content: &[u8]) -> Result<()> {
        if self.has_file(filename)? {
            return self.overwrite_file(filename, content);
        }

        let store = self.vault.records();
        let file_key = SymmetricKey::generate();

        let file_key_id = store.fresh_id()?;
        envelope::put_sealed(
            store,
            &file_key_id,
            &self.encryption_key(),
            file_key.as_bytes(),
            &self.signer,
        )?;

        let chunk_id = store.fresh_id()?;
        envelope::put_tagged(store, &chunk_id, &file_key, content)?;

        let content_list_id = store.fresh_id()?;
        write_content_list(store, &content_list_id, &file_key, &ContentList::single(chunk_id))?;

        let node_id = store.fresh_id()?;
        let node_key = SymmetricKey::generate();
        envelope::put_signed(store, &node_id, &node_key, &AccessNode::new(file_key_id), &self.signer)?;

        self.insert_file(
            filename,
            FileMetadata {
                owner: self.username.clone(),
                content_list_id,
                file_key_id,
                node_id,
                node_key,
            },
        )?;

        tracing::debug!(username = %self.username, bytes = content.len(), "file created");
        Ok(())
    }

    fn overwrite_file(&self, filename: &str, content: &[u8]) -> Result<()> {
        let ctx = self.open_file(filename)?;
        let old = self.read_content_list(&ctx)?;
        // The chain being replaced must still be intact.
        self.read_chunks(&ctx.file_key, &old)?;
        let store = self.vault.records();

        let chunk_id = store.fresh_id()?;
        envelope::put_tagged(store, &chunk_id, &ctx.file_key, content)?;
        write_content_list(
            store,
            &ctx.metadata.content_list_id,
            &ctx.file_key,
            &ContentList::single(chunk_id),
        )?;

        for old_chunk in old.chunks() {
            store.delete(old_chunk)?;
        }

        tracing::debug!(
            username = %self.username,
            bytes = content.len(),
            replaced = old.len(),
            "file overwritten"
        );
        Ok(())
    }

    /// Append `content` to the end of `filename`.
    ///
    /// Costs one new chunk plus a rewrite of the chunk list, regardless of
    /// how much content the file already holds.
    pub fn append_to_file(&self, filename: &str, content: &[u8]) -> Result<()> {
        let ctx = self.open_file(filename)?;
        let mut list = self.read_content_list(&ctx)?;
        let max_chunks = self.vault.config().max_chunks;
        if list.len() >= max_chunks {
            return Err(VaultError::Config(format!(
                "file {:?} already holds the maximum of {} chunks",
                filename, max_chunks
            )));
        }

        let store = self.vault.records();
        let chunk_id = store.fresh_id()?;
        envelope::put_tagged(store, &chunk_id, &ctx.file_key, content)?;

        list.push(chunk_id);
        write_content_list(store, &ctx.metadata.content_list_id, &ctx.file_key, &list)?;

        tracing::debug!(username = %self.username, chunks = list.len(), "appended");
        Ok(())
    }

    /// Read the full content of `filename`.
    ///
    /// Every chunk must be present and authentic; there are no partial reads.
    pub fn load_file(&self, filename: &str) -> Result<Vec<u8>> {
        let ctx = self.open_file(filename)?;
        let list = self.read_content_list(&ctx)?;
        self.read_chunks(&ctx.file_key, &list)
    }

    fn read_chunks(&self, file_key: &SymmetricKey, list: &ContentList) -> Result<Vec<u8>> {
        let store = self.vault.records();

        let mut content = Vec::new();
        for chunk_id in list.chunks() {
            let chunk = envelope::get_tagged(store, chunk_id, file_key)?.ok_or_else(|| {
                tracing::warn!(chunk = %chunk_id, "content chunk missing");
                VaultError::Tampered(format!("content chunk {} is missing", chunk_id))
            })?;
            content.extend_from_slice(&chunk);
        }

        Ok(content)
    }
}
