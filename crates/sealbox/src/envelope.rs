//! Encrypted record framing on top of [`AuthenticatedStore`].
//!
//! Three shapes cover every record the vault writes:
//!
//! - **signed**: CBOR, symmetric-encrypted, signed by the writer, tagged.
//!   Credential records, indexes, tree nodes, staged metadata.
//! - **tagged**: symmetric-encrypted and tagged, no signature. Content lists
//!   and chunks, which any key holder may rewrite; the AEAD under the file
//!   key is what authenticates them.
//!
//! The symmetric layer always authenticates the record id as associated
//! data. The location tag alone can be recomputed by anyone, so this is what
//! stops a ciphertext from being replayed at another id.
//! - **sealed**: a sealed box to one recipient, signed by the writer,
//!   tagged. File-key records and invitations.

use serde::de::DeserializeOwned;
use serde::Serialize;

use sealbox_core::{
    from_cbor, to_cbor, BlobId, DecryptionKey, EncryptionPublicKey, SealedBox, SigningKeypair,
    SymmetricKey, VerifyKey,
};
use sealbox_store::{AuthenticatedStore, BlobStore};

use crate::error::Result;

pub(crate) fn put_signed<S: BlobStore, T: Serialize>(
    store: &AuthenticatedStore<S>,
    id: &BlobId,
    key: &SymmetricKey,
    value: &T,
    signer: &SigningKeypair,
) -> Result<()> {
    let ciphertext = key.encrypt_bound(&to_cbor(value)?, id.as_bytes())?;
    store.put_signed(id, &ciphertext, signer)?;
    Ok(())
}

pub(crate) fn get_signed<S: BlobStore, T: DeserializeOwned>(
    store: &AuthenticatedStore<S>,
    id: &BlobId,
    key: &SymmetricKey,
    signers: &[VerifyKey],
) -> Result<Option<T>> {
    let Some(ciphertext) = store.get_signed(id, signers)? else {
        return Ok(None);
    };
    let plaintext = key.decrypt_bound(&ciphertext, id.as_bytes())?;
    Ok(Some(from_cbor(&plaintext)?))
}

pub(crate) fn put_tagged<S: BlobStore>(
    store: &AuthenticatedStore<S>,
    id: &BlobId,
    key: &SymmetricKey,
    plaintext: &[u8],
) -> Result<()> {
    store.put_tagged(id, &key.encrypt_bound(plaintext, id.as_bytes())?)?;
    Ok(())
}

pub(crate) fn get_tagged<S: BlobStore>(
    store: &AuthenticatedStore<S>,
    id: &BlobId,
    key: &SymmetricKey,
) -> Result<Option<Vec<u8>>> {
    match store.get_tagged(id)? {
        Some(ciphertext) => Ok(Some(key.decrypt_bound(&ciphertext, id.as_bytes())?)),
        None => Ok(None),
    }
}

pub(crate) fn put_sealed<S: BlobStore>(
    store: &AuthenticatedStore<S>,
    id: &BlobId,
    recipient: &EncryptionPublicKey,
    plaintext: &[u8],
    signer: &SigningKeypair,
) -> Result<()> {
    let sealed = SealedBox::seal(recipient, plaintext)?;
    store.put_signed(id, &sealed.to_bytes()?, signer)?;
    Ok(())
}

pub(crate) fn get_sealed<S: BlobStore>(
    store: &AuthenticatedStore<S>,
    id: &BlobId,
    secret: &DecryptionKey,
    signers: &[VerifyKey],
) -> Result<Option<Vec<u8>>> {
    let Some(bytes) = store.get_signed(id, signers)? else {
        return Ok(None);
    };
    Ok(Some(SealedBox::from_bytes(&bytes)?.open(secret)?))
}
