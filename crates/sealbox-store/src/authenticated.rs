//! Authenticated framing over an untrusted [`BlobStore`].
//!
//! Every record is written as `payload || tag`, where the tag is a keyed
//! Blake3 MAC under a key derived from the record's id. A record moved to a
//! different id, truncated or bit-flipped fails the tag check.
//!
//! The tag key is derived from public data, so anyone can recompute a tag.
//! It catches corruption and blind copies; authenticity comes from the
//! signature or from an AEAD layer that binds the id.
//!
//! Signed records add one more layer inside the tag:
//! `payload || signature`, where the signature covers a domain string, the
//! id and the payload. Readers pass the set of keys they are willing to
//! accept, and the first one that verifies wins.

use sealbox_core::{Blake3Hash, BlobId, Signature, SigningKeypair, VerifyKey, SIGNATURE_LEN};

use crate::error::{Result, StoreError};
use crate::traits::BlobStore;

/// Length of the integrity tag appended to every record.
pub const TAG_LEN: usize = 32;

const TAG_CONTEXT: &str = "sealbox-v0 location-tag";
const SIGN_DOMAIN: &[u8] = b"sealbox-v0 signed-record";

/// How many random ids to try before giving up on allocation.
const MAX_ID_ATTEMPTS: usize = 16;

/// The integrity tag for `payload` stored at `id`.
pub fn location_tag(id: &BlobId, payload: &[u8]) -> Blake3Hash {
    let key = blake3::derive_key(TAG_CONTEXT, id.as_bytes());
    Blake3Hash::keyed(&key, payload)
}

fn signed_message(id: &BlobId, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(SIGN_DOMAIN.len() + 16 + payload.len());
    message.extend_from_slice(SIGN_DOMAIN);
    message.extend_from_slice(id.as_bytes());
    message.extend_from_slice(payload);
    message
}

/// A [`BlobStore`] wrapper that frames and checks every record.
pub struct AuthenticatedStore<S> {
    inner: S,
}

impl<S: BlobStore> AuthenticatedStore<S> {
    /// Wrap a raw store.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The raw store underneath.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Allocate an id nothing currently occupies.
    pub fn fresh_id(&self) -> Result<BlobId> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.inner.new_id();
            if !self.inner.contains(&id)? {
                return Ok(id);
            }
        }
        Err(StoreError::IdExhausted(MAX_ID_ATTEMPTS))
    }

    /// Write `payload` at `id` with an integrity tag.
    pub fn put_tagged(&self, id: &BlobId, payload: &[u8]) -> Result<()> {
        let tag = location_tag(id, payload);
        let mut framed = Vec::with_capacity(payload.len() + TAG_LEN);
        framed.extend_from_slice(payload);
        framed.extend_from_slice(tag.as_bytes());
        self.inner.put(id, &framed)
    }

    /// Read and check a tagged record.
    ///
    /// Returns `Ok(None)` when nothing is stored at `id` and
    /// [`StoreError::Tampered`] when the stored bytes fail the check.
    pub fn get_tagged(&self, id: &BlobId) -> Result<Option<Vec<u8>>> {
        let Some(mut framed) = self.inner.get(id)? else {
            return Ok(None);
        };

        if framed.len() < TAG_LEN {
            tracing::warn!(%id, len = framed.len(), "record shorter than integrity tag");
            return Err(StoreError::Tampered(*id));
        }

        let split = framed.len() - TAG_LEN;
        let expected = location_tag(id, &framed[..split]);
        let stored: [u8; TAG_LEN] = framed[split..]
            .try_into()
            .map_err(|_| StoreError::Tampered(*id))?;
        // blake3::Hash compares in constant time
        if blake3::Hash::from(stored) != blake3::Hash::from(*expected.as_bytes()) {
            tracing::warn!(%id, "integrity tag mismatch");
            return Err(StoreError::Tampered(*id));
        }

        framed.truncate(split);
        Ok(Some(framed))
    }

    /// Write `payload` at `id`, signed by `signer` and tagged.
    pub fn put_signed(&self, id: &BlobId, payload: &[u8], signer: &SigningKeypair) -> Result<()> {
        let signature = signer.sign(&signed_message(id, payload));
        let mut body = Vec::with_capacity(payload.len() + SIGNATURE_LEN);
        body.extend_from_slice(payload);
        body.extend_from_slice(signature.as_bytes());
        self.put_tagged(id, &body)
    }

    /// Read a signed record, accepting it if any key in `signers` verifies.
    ///
    /// Returns [`StoreError::Unverified`] when none does.
    pub fn get_signed(&self, id: &BlobId, signers: &[VerifyKey]) -> Result<Option<Vec<u8>>> {
        let Some(mut body) = self.get_tagged(id)? else {
            return Ok(None);
        };

        if body.len() < SIGNATURE_LEN {
            tracing::warn!(%id, "signed record shorter than a signature");
            return Err(StoreError::Unverified(*id));
        }

        let split = body.len() - SIGNATURE_LEN;
        let signature = Signature::try_from(&body[split..])?;
        let message = signed_message(id, &body[..split]);

        if signers
            .iter()
            .any(|key| key.verify(&message, &signature).is_ok())
        {
            body.truncate(split);
            return Ok(Some(body));
        }

        tracing::warn!(%id, candidates = signers.len(), "no expected signer verified record");
        Err(StoreError::Unverified(*id))
    }

    /// Remove the record at `id`.
    pub fn delete(&self, id: &BlobId) -> Result<()> {
        self.inner.delete(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBlobStore;

    fn store() -> AuthenticatedStore<MemoryBlobStore> {
        AuthenticatedStore::new(MemoryBlobStore::new())
    }

    #[test]
    fn test_tagged_roundtrip() {
        let store = store();
        let id = store.fresh_id().unwrap();

        store.put_tagged(&id, b"payload").unwrap();
        assert_eq!(store.get_tagged(&id).unwrap(), Some(b"payload".to_vec()));
        assert_eq!(store.get_tagged(&BlobId::random()).unwrap(), None);
    }

    #[test]
    fn test_tagged_empty_payload() {
        let store = store();
        let id = store.fresh_id().unwrap();
        store.put_tagged(&id, b"").unwrap();
        assert_eq!(store.get_tagged(&id).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_tag_detects_bit_flip() {
        let store = store();
        let id = store.fresh_id().unwrap();
        store.put_tagged(&id, b"payload").unwrap();

        let mut raw = store.inner().get(&id).unwrap().unwrap();
        raw[0] ^= 0x01;
        store.inner().put(&id, &raw).unwrap();

        assert!(matches!(store.get_tagged(&id), Err(StoreError::Tampered(_))));
    }

    #[test]
    fn test_tag_detects_relocation() {
        let store = store();
        let a = store.fresh_id().unwrap();
        let b = store.fresh_id().unwrap();
        store.put_tagged(&a, b"payload").unwrap();

        let raw = store.inner().get(&a).unwrap().unwrap();
        store.inner().put(&b, &raw).unwrap();

        assert!(matches!(store.get_tagged(&b), Err(StoreError::Tampered(_))));
    }

    #[test]
    fn test_tag_detects_truncation() {
        let store = store();
        let id = store.fresh_id().unwrap();
        store.inner().put(&id, &[1, 2, 3]).unwrap();
        assert!(matches!(store.get_tagged(&id), Err(StoreError::Tampered(_))));
    }

    #[test]
    fn test_signed_roundtrip() {
        let store = store();
        let signer = SigningKeypair::generate();
        let id = store.fresh_id().unwrap();

        store.put_signed(&id, b"hello", &signer).unwrap();
        let got = store.get_signed(&id, &[signer.verify_key()]).unwrap();
        assert_eq!(got, Some(b"hello".to_vec()));
    }

    #[test]
    fn test_signed_accepts_any_listed_signer() {
        let store = store();
        let owner = SigningKeypair::generate();
        let sharer = SigningKeypair::generate();
        let id = store.fresh_id().unwrap();

        store.put_signed(&id, b"key", &sharer).unwrap();
        let got = store
            .get_signed(&id, &[owner.verify_key(), sharer.verify_key()])
            .unwrap();
        assert_eq!(got, Some(b"key".to_vec()));
    }

    #[test]
    fn test_signed_rejects_unlisted_signer() {
        let store = store();
        let signer = SigningKeypair::generate();
        let other = SigningKeypair::generate();
        let id = store.fresh_id().unwrap();

        store.put_signed(&id, b"hello", &signer).unwrap();
        assert!(matches!(
            store.get_signed(&id, &[other.verify_key()]),
            Err(StoreError::Unverified(_))
        ));
        assert!(matches!(
            store.get_signed(&id, &[]),
            Err(StoreError::Unverified(_))
        ));
    }

    #[test]
    fn test_signature_bound_to_location() {
        // An attacker who re-tags a signed body at a new id still fails the
        // signature check, since the id is part of the signed message.
        let store = store();
        let signer = SigningKeypair::generate();
        let a = store.fresh_id().unwrap();
        let b = store.fresh_id().unwrap();

        store.put_signed(&a, b"hello", &signer).unwrap();
        let body = store.get_tagged(&a).unwrap().unwrap();
        store.put_tagged(&b, &body).unwrap();

        assert!(matches!(
            store.get_signed(&b, &[signer.verify_key()]),
            Err(StoreError::Unverified(_))
        ));
    }

    #[test]
    fn test_fresh_id_skips_occupied() {
        struct Collide {
            inner: MemoryBlobStore,
            taken: BlobId,
            calls: std::sync::atomic::AtomicUsize,
        }

        impl BlobStore for Collide {
            fn put(&self, id: &BlobId, data: &[u8]) -> Result<()> {
                self.inner.put(id, data)
            }
            fn get(&self, id: &BlobId) -> Result<Option<Vec<u8>>> {
                self.inner.get(id)
            }
            fn delete(&self, id: &BlobId) -> Result<()> {
                self.inner.delete(id)
            }
            fn new_id(&self) -> BlobId {
                // First proposal collides, later ones are random
                if self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                    self.taken
                } else {
                    BlobId::random()
                }
            }
        }

        let taken = BlobId::random();
        let inner = MemoryBlobStore::new();
        inner.put(&taken, b"occupied").unwrap();
        let store = AuthenticatedStore::new(Collide {
            inner,
            taken,
            calls: Default::default(),
        });

        let id = store.fresh_id().unwrap();
        assert_ne!(id, taken);
    }

    #[test]
    fn test_fresh_id_gives_up() {
        struct Stuck(MemoryBlobStore);

        impl BlobStore for Stuck {
            fn put(&self, id: &BlobId, data: &[u8]) -> Result<()> {
                self.0.put(id, data)
            }
            fn get(&self, id: &BlobId) -> Result<Option<Vec<u8>>> {
                self.0.get(id)
            }
            fn delete(&self, id: &BlobId) -> Result<()> {
                self.0.delete(id)
            }
            fn new_id(&self) -> BlobId {
                BlobId::ZERO
            }
        }

        let inner = MemoryBlobStore::new();
        inner.put(&BlobId::ZERO, b"x").unwrap();
        let store = AuthenticatedStore::new(Stuck(inner));
        assert!(matches!(store.fresh_id(), Err(StoreError::IdExhausted(_))));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn flipping_any_byte_is_detected(
                payload in proptest::collection::vec(any::<u8>(), 0..256),
                pos in any::<prop::sample::Index>(),
                mask in 1u8..=255,
            ) {
                let store = store();
                let id = BlobId::random();
                store.put_tagged(&id, &payload).unwrap();

                let mut raw = store.inner().get(&id).unwrap().unwrap();
                let i = pos.index(raw.len());
                raw[i] ^= mask;
                store.inner().put(&id, &raw).unwrap();

                prop_assert!(store.get_tagged(&id).is_err());
            }
        }
    }
}
