//! Sharing and revocation over the access tree.
//!
//! Granting access links a fresh node for the recipient under the sharer's
//! node and hands the recipient a single-use invitation. Revoking cuts a
//! direct child of the owner, deletes that child's whole subtree, and
//! rotates the file key for everyone left.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use sealbox_access::{
    AccessNode, ChildLink, ContentList, FileMetadata, GrantRecords, InvitationCapsule, PendingNode,
    SubtreeWalk, TreeEntry,
};
use sealbox_core::{from_cbor, to_cbor, BlobId, SealedBox, SymmetricKey, VerifyKey};
use sealbox_store::{BlobStore, DirectoryExt, KeyDirectory, StoreError};

use crate::envelope;
use crate::error::{Result, VaultError};
use crate::identity::{file_key_from_bytes, read_content_list, write_content_list, Identity};

/// Opaque handle to a pending invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvitationId(pub BlobId);

impl std::fmt::Display for InvitationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: BlobStore, D: KeyDirectory> Identity<S, D> {
    /// Offer `recipient` access to `filename`.
    ///
    /// Nothing is written unless the file exists, `recipient` is not already
    /// a direct child, and `recipient` has published an encryption key.
    pub fn create_invitation(&self, filename: &str, recipient: &str) -> Result<InvitationId> {
        let ctx = self.open_file(filename)?;
        if ctx.node.has_child(recipient) {
            return Err(VaultError::AlreadyExists(format!(
                "{:?} already has access to {:?}",
                recipient, filename
            )));
        }
        let recipient_key = self.encryption_key_of(recipient)?;

        let store = self.vault.records();

        let file_key_id = store.fresh_id()?;
        envelope::put_sealed(
            store,
            &file_key_id,
            &recipient_key,
            ctx.file_key.as_bytes(),
            &self.signer,
        )?;

        let node_id = store.fresh_id()?;
        let node_key = SymmetricKey::generate();
        envelope::put_signed(store, &node_id, &node_key, &AccessNode::new(file_key_id), &self.signer)?;

        let staged = FileMetadata {
            owner: ctx.metadata.owner.clone(),
            content_list_id: ctx.metadata.content_list_id,
            file_key_id,
            node_id,
            node_key: node_key.clone(),
        };
        let metadata_id = store.fresh_id()?;
        let metadata_key = SymmetricKey::generate();
        envelope::put_signed(store, &metadata_id, &metadata_key, &staged, &self.signer)?;

        let capsule = InvitationCapsule {
            metadata_id,
            metadata_key,
        };
        let invitation_id = store.fresh_id()?;
        envelope::put_sealed(
            store,
            &invitation_id,
            &recipient_key,
            &to_cbor(&capsule)?,
            &self.signer,
        )?;

        let mut node = ctx.node;
        node.add_child(
            recipient,
            ChildLink {
                node_id,
                node_key,
                grant: Some(GrantRecords {
                    invitation_id,
                    metadata_id,
                }),
            },
        )?;
        envelope::put_signed(
            store,
            &ctx.metadata.node_id,
            &ctx.metadata.node_key,
            &node,
            &self.signer,
        )?;

        tracing::debug!(sharer = %self.username, recipient, invitation = %invitation_id, "invitation created");
        Ok(InvitationId(invitation_id))
    }

    /// Accept an invitation from `sender`, filing it as `filename`.
    ///
    /// The invitation must be signed by `sender` and sealed to the caller.
    /// It is consumed on success.
    pub fn accept_invitation(
        &self,
        sender: &str,
        invitation: InvitationId,
        filename: &str,
    ) -> Result<()> {
        if self.has_file(filename)? {
            return Err(VaultError::AlreadyExists(format!("file {:?}", filename)));
        }

        let invalid = |reason: &str| {
            tracing::warn!(recipient = %self.username, sender, invitation = %invitation, reason, "invitation rejected");
            VaultError::InvalidInvitation(reason.to_string())
        };

        let sender_key = self
            .vault
            .directory()
            .verify_key(sender)?
            .ok_or_else(|| invalid("unknown sender"))?;

        let store = self.vault.records();
        let sealed = match store.get_signed(&invitation.0, &[sender_key]) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err(invalid("no such invitation")),
            Err(StoreError::Unverified(_)) => return Err(invalid("not signed by sender")),
            Err(e) => return Err(e.into()),
        };
        let capsule: InvitationCapsule = SealedBox::from_bytes(&sealed)
            .and_then(|sealed| sealed.open(&self.decryption_key))
            .and_then(|plaintext| from_cbor(&plaintext))
            .map_err(|_| invalid("not addressed to this user"))?;

        let metadata: FileMetadata = envelope::get_signed(
            store,
            &capsule.metadata_id,
            &capsule.metadata_key,
            &[sender_key],
        )?
        .ok_or_else(|| invalid("staged metadata is gone"))?;

        let owner_key = self.verify_key_of(&metadata.owner)?;
        let granters = [owner_key, sender_key];

        let key_bytes = envelope::get_sealed(
            store,
            &metadata.file_key_id,
            &self.decryption_key,
            &granters,
        )?
        .ok_or_else(|| invalid("access was revoked before acceptance"))?;
        let file_key = file_key_from_bytes(&key_bytes)?;

        let node: AccessNode =
            envelope::get_signed(store, &metadata.node_id, &metadata.node_key, &granters)?
                .ok_or_else(|| invalid("access was revoked before acceptance"))?;

        // Consume, then take ownership of the granted records, then publish
        // the filename.
        store.delete(&invitation.0)?;
        store.delete(&capsule.metadata_id)?;

        envelope::put_sealed(
            store,
            &metadata.file_key_id,
            &self.encryption_key(),
            file_key.as_bytes(),
            &self.signer,
        )?;
        envelope::put_signed(store, &metadata.node_id, &metadata.node_key, &node, &self.signer)?;

        self.insert_file(filename, metadata)?;

        tracing::debug!(recipient = %self.username, sender, "invitation accepted");
        Ok(())
    }

    /// Revoke `recipient` and everyone they shared with from `filename`.
    ///
    /// Only the owner may revoke, and only a direct child. The file key is
    /// rotated and the content re-encrypted, so revoked users' old keys are
    /// worthless.
    pub fn revoke_access(&self, filename: &str, recipient: &str) -> Result<()> {
        let ctx = self.open_file(filename)?;
        if !ctx.metadata.is_owned_by(&self.username) {
            return Err(VaultError::Unauthorized(format!(
                "only the owner may revoke access to {:?}",
                filename
            )));
        }

        let cap = self.vault.config().max_tree_nodes;
        let store = self.vault.records();

        // Collect everything before writing anything.
        let mut root = ctx.node.clone();
        let cut = root.remove_child(recipient).ok_or_else(|| {
            VaultError::Unauthorized(format!(
                "{:?} was not granted access to {:?} by the owner",
                recipient, filename
            ))
        })?;

        let cut_grant = cut.grant;
        let mut revoked_walk = SubtreeWalk::new(cap);
        revoked_walk.push(PendingNode {
            holder: recipient.to_string(),
            node_id: cut.node_id,
            node_key: cut.node_key,
            parent: Some(self.username.clone()),
        });
        let revoked = revoked_walk.run(|pending| self.fetch_tree_node(pending))?;

        let mut remaining_walk = SubtreeWalk::new(cap);
        remaining_walk.push_loaded(&self.username, ctx.metadata.node_id, None, root.clone())?;
        let remaining = remaining_walk.run(|pending| self.fetch_tree_node(pending))?;

        let revoked_nodes: HashSet<BlobId> = revoked.iter().map(|e| e.node_id).collect();
        if let Some(shared) = remaining.iter().find(|e| revoked_nodes.contains(&e.node_id)) {
            return Err(VaultError::Tampered(format!(
                "access node {} is reachable from both the revoked and the remaining tree",
                shared.node_id
            )));
        }

        // Invitations still pending inside the revoked subtree. Only records
        // that verify under the sharer who wrote them are eligible.
        let mut pending_grants = vec![(self.username.clone(), cut_grant)];
        for entry in &revoked {
            for (_, link) in entry.node.children() {
                pending_grants.push((entry.holder.clone(), link.grant));
            }
        }
        let mut grant_records = Vec::new();
        for (sharer, grant) in pending_grants {
            let Some(grant) = grant else { continue };
            let sharer_key = self.verify_key_of(&sharer)?;
            for id in [grant.invitation_id, grant.metadata_id] {
                if matches!(store.get_signed(&id, &[sharer_key]), Ok(Some(_))) {
                    grant_records.push(id);
                }
            }
        }

        let recipients = remaining
            .iter()
            .skip(1)
            .map(|entry| Ok((entry.node.file_key_id(), self.encryption_key_of(&entry.holder)?)))
            .collect::<Result<Vec<_>>>()?;

        let old_list = read_content_list(
            store,
            &ctx.metadata.content_list_id,
            &ctx.file_key,
            self.vault.config().max_chunks,
        )?;
        let mut plaintexts = Vec::with_capacity(old_list.len());
        for chunk_id in old_list.chunks() {
            let chunk = envelope::get_tagged(store, chunk_id, &ctx.file_key)?.ok_or_else(|| {
                VaultError::Tampered(format!("content chunk {} is missing", chunk_id))
            })?;
            plaintexts.push(chunk);
        }

        // Cut the subtree off the root and destroy it.
        envelope::put_signed(
            store,
            &ctx.metadata.node_id,
            &ctx.metadata.node_key,
            &root,
            &self.signer,
        )?;
        for entry in &revoked {
            store.delete(&entry.node_id)?;
            store.delete(&entry.node.file_key_id())?;
        }
        for id in &grant_records {
            store.delete(id)?;
        }

        // Rotate the file key and re-encrypt content under it.
        let new_key = SymmetricKey::generate();
        let mut new_list = ContentList::default();
        for plaintext in &plaintexts {
            let chunk_id = store.fresh_id()?;
            envelope::put_tagged(store, &chunk_id, &new_key, plaintext)?;
            new_list.push(chunk_id);
        }
        write_content_list(store, &ctx.metadata.content_list_id, &new_key, &new_list)?;
        for chunk_id in old_list.chunks() {
            store.delete(chunk_id)?;
        }

        // Re-issue the new key, owner-signed, to every remaining holder.
        envelope::put_sealed(
            store,
            &ctx.metadata.file_key_id,
            &self.encryption_key(),
            new_key.as_bytes(),
            &self.signer,
        )?;
        for (file_key_id, holder_key) in &recipients {
            envelope::put_sealed(store, file_key_id, holder_key, new_key.as_bytes(), &self.signer)?;
        }

        tracing::debug!(
            owner = %self.username,
            recipient,
            revoked = revoked.len(),
            grant_records = grant_records.len(),
            remaining = remaining.len(),
            chunks = new_list.len(),
            "access revoked"
        );
        Ok(())
    }

    /// Load a node during a tree walk.
    ///
    /// A node is written by its parent when granted and re-signed by its
    /// holder on acceptance; the owner may also have written it.
    fn fetch_tree_node(&self, pending: &PendingNode) -> Result<AccessNode> {
        let mut signers: Vec<VerifyKey> = vec![self.verify_key(), self.verify_key_of(&pending.holder)?];
        if let Some(parent) = &pending.parent {
            signers.push(self.verify_key_of(parent)?);
        }

        envelope::get_signed(
            self.vault.records(),
            &pending.node_id,
            &pending.node_key,
            &signers,
        )?
        .ok_or_else(|| {
            tracing::warn!(node = %pending.node_id, holder = %pending.holder, "access node missing");
            VaultError::Tampered(format!("access node {} is missing", pending.node_id))
        })
    }

    /// Users the caller has directly shared `filename` with.
    pub fn list_children(&self, filename: &str) -> Result<Vec<String>> {
        Ok(self.open_file(filename)?.node.child_names())
    }

    /// Whether the caller created `filename`.
    pub fn is_owner(&self, filename: &str) -> Result<bool> {
        let metadata = self
            .lookup(filename)?
            .ok_or_else(|| VaultError::NotFound(format!("file {:?}", filename)))?;
        Ok(metadata.is_owned_by(&self.username))
    }

    /// Every node in the caller's subtree for `filename`, breadth first.
    ///
    /// Only nodes the caller can reach are listed: the owner sees the whole
    /// tree, a recipient sees what hangs below them.
    pub fn access_tree(&self, filename: &str) -> Result<Vec<(String, Option<String>)>> {
        let ctx = self.open_file(filename)?;
        let mut walk = SubtreeWalk::new(self.vault.config().max_tree_nodes);
        walk.push_loaded(&self.username, ctx.metadata.node_id, None, ctx.node)?;
        let entries: Vec<TreeEntry> = walk.run(|pending| self.fetch_tree_node(pending))?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.holder, entry.parent))
            .collect())
    }
}
