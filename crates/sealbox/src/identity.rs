//! The authenticated user handle and the per-user file index.

use sealbox_access::{AccessNode, ContentList, FileIndex, FileMetadata};
use sealbox_core::{
    from_cbor, to_cbor, BlobId, DecryptionKey, EncryptionPublicKey, SigningKeypair, SymmetricKey,
    VerifyKey,
};
use sealbox_store::{BlobStore, DirectoryExt, KeyDirectory};

use crate::envelope;
use crate::error::{Result, VaultError};
use crate::vault::Vault;

/// An authenticated user.
///
/// Holds the user's long-term secrets and nothing else: every operation
/// reads current state from the store, so two handles for the same user
/// (two devices) always agree.
pub struct Identity<S, D> {
    pub(crate) vault: Vault<S, D>,
    pub(crate) username: String,
    pub(crate) decryption_key: DecryptionKey,
    pub(crate) signer: SigningKeypair,
    index_id: BlobId,
    index_key: SymmetricKey,
}

impl<S, D> std::fmt::Debug for Identity<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("index_id", &self.index_id)
            .finish_non_exhaustive()
    }
}

/// Everything needed to act on one file as the current holder.
pub(crate) struct FileContext {
    pub metadata: FileMetadata,
    pub file_key: SymmetricKey,
    pub node: AccessNode,
}

impl<S: BlobStore, D: KeyDirectory> Identity<S, D> {
    pub(crate) fn new(
        vault: Vault<S, D>,
        username: String,
        decryption_key: DecryptionKey,
        signer: SigningKeypair,
        index_id: BlobId,
        index_key: SymmetricKey,
    ) -> Self {
        Self {
            vault,
            username,
            decryption_key,
            signer,
            index_id,
            index_key,
        }
    }

    /// This user's name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// This user's published verification key.
    pub fn verify_key(&self) -> VerifyKey {
        self.signer.verify_key()
    }

    /// This user's published encryption key.
    pub fn encryption_key(&self) -> EncryptionPublicKey {
        self.decryption_key.public_key()
    }

    /// The vault this identity belongs to.
    pub fn vault(&self) -> &Vault<S, D> {
        &self.vault
    }

    // ─────────────────────────────────────────────────────────────────────
    // File index
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn load_index(&self) -> Result<FileIndex> {
        envelope::get_signed(
            self.vault.records(),
            &self.index_id,
            &self.index_key,
            &[self.verify_key()],
        )?
        .ok_or_else(|| VaultError::Tampered(format!("file index of {:?} is missing", self.username)))
    }

    fn save_index(&self, index: &FileIndex) -> Result<()> {
        envelope::put_signed(
            self.vault.records(),
            &self.index_id,
            &self.index_key,
            index,
            &self.signer,
        )
    }

    /// Look up metadata for `filename`.
    pub(crate) fn lookup(&self, filename: &str) -> Result<Option<FileMetadata>> {
        Ok(self.load_index()?.get(&self.index_key, filename).cloned())
    }

    /// Whether `filename` exists in this user's namespace.
    pub(crate) fn has_file(&self, filename: &str) -> Result<bool> {
        Ok(self.load_index()?.contains(&self.index_key, filename))
    }

    /// Add a new entry. Fails if `filename` is taken.
    pub(crate) fn insert_file(&self, filename: &str, metadata: FileMetadata) -> Result<()> {
        let mut index = self.load_index()?;
        if index.contains(&self.index_key, filename) {
            return Err(VaultError::AlreadyExists(format!("file {:?}", filename)));
        }
        index.insert(&self.index_key, filename, metadata);
        self.save_index(&index)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Key lookups
    // ─────────────────────────────────────────────────────────────────────

    /// Published verification key of `username`.
    pub(crate) fn verify_key_of(&self, username: &str) -> Result<VerifyKey> {
        if username == self.username {
            return Ok(self.verify_key());
        }
        self.vault
            .directory()
            .verify_key(username)?
            .ok_or_else(|| VaultError::NotFound(format!("verification key of {:?}", username)))
    }

    /// Published encryption key of `username`.
    pub(crate) fn encryption_key_of(&self, username: &str) -> Result<EncryptionPublicKey> {
        if username == self.username {
            return Ok(self.encryption_key());
        }
        self.vault
            .directory()
            .encryption_key(username)?
            .ok_or_else(|| VaultError::NotFound(format!("encryption key of {:?}", username)))
    }

    // ─────────────────────────────────────────────────────────────────────
    // File access
    // ─────────────────────────────────────────────────────────────────────

    /// Resolve the caller's access to `filename`.
    ///
    /// The tree node and file-key record must verify under the owner or the
    /// caller. A missing record means access was revoked.
    pub(crate) fn open_file(&self, filename: &str) -> Result<FileContext> {
        let metadata = self
            .lookup(filename)?
            .ok_or_else(|| VaultError::NotFound(format!("file {:?}", filename)))?;

        // Owner, then self: the only keys that may last have written this
        // holder's node and key record.
        let mut signers = vec![self.verify_key_of(&metadata.owner)?];
        if metadata.owner != self.username {
            signers.push(self.verify_key());
        }

        let node: AccessNode = envelope::get_signed(
            self.vault.records(),
            &metadata.node_id,
            &metadata.node_key,
            &signers,
        )?
        .ok_or_else(|| VaultError::Unauthorized(format!("access to {:?} was revoked", filename)))?;

        if node.file_key_id() != metadata.file_key_id {
            tracing::warn!(node = %metadata.node_id, "access node points at a foreign key record");
            return Err(VaultError::Tampered(format!(
                "access node for {:?} does not match metadata",
                filename
            )));
        }

        let key_bytes = envelope::get_sealed(
            self.vault.records(),
            &metadata.file_key_id,
            &self.decryption_key,
            &signers,
        )?
        .ok_or_else(|| VaultError::Unauthorized(format!("access to {:?} was revoked", filename)))?;
        let file_key = file_key_from_bytes(&key_bytes)?;

        Ok(FileContext {
            metadata,
            file_key,
            node,
        })
    }

    /// Decode the content list for an open file.
    pub(crate) fn read_content_list(&self, ctx: &FileContext) -> Result<ContentList> {
        read_content_list(
            self.vault.records(),
            &ctx.metadata.content_list_id,
            &ctx.file_key,
            self.vault.config().max_chunks,
        )
    }
}

pub(crate) fn file_key_from_bytes(bytes: &[u8]) -> Result<SymmetricKey> {
    let raw: [u8; 32] = bytes
        .try_into()
        .map_err(|_| VaultError::Tampered(format!("file key record holds {} bytes", bytes.len())))?;
    Ok(SymmetricKey::from_bytes(raw))
}

pub(crate) fn read_content_list<S: BlobStore>(
    store: &sealbox_store::AuthenticatedStore<S>,
    id: &BlobId,
    file_key: &SymmetricKey,
    max_chunks: usize,
) -> Result<ContentList> {
    let bytes = envelope::get_tagged(store, id, file_key)?
        .ok_or_else(|| VaultError::Tampered(format!("content list {} is missing", id)))?;
    let list: ContentList = from_cbor(&bytes)?;
    if list.len() > max_chunks {
        tracing::warn!(%id, chunks = list.len(), "content list exceeds chunk cap");
        return Err(VaultError::Tampered(format!(
            "content list holds {} chunks",
            list.len()
        )));
    }
    Ok(list)
}

pub(crate) fn write_content_list<S: BlobStore>(
    store: &sealbox_store::AuthenticatedStore<S>,
    id: &BlobId,
    file_key: &SymmetricKey,
    list: &ContentList,
) -> Result<()> {
    envelope::put_tagged(store, id, file_key, &to_cbor(list)?)
}
