//! The access tree.
//!
//! Every holder of a file has one node. The owner's node is the root; a
//! holder who shares with someone links a fresh child node under their own.
//! Each node is encrypted under its own key, and the parent keeps that key
//! in the link, so a holder can read exactly their own subtree.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use sealbox_core::{BlobId, SymmetricKey};

use crate::error::{AccessError, Result};

/// Records a grant leaves in the store until the recipient accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecords {
    /// The sealed invitation.
    pub invitation_id: BlobId,
    /// The staged metadata the invitation points at.
    pub metadata_id: BlobId,
}

/// A parent's link to one child node.
#[derive(Debug, Clone)]
pub struct ChildLink {
    /// Where the child node lives.
    pub node_id: BlobId,
    /// Key the child node is encrypted under.
    pub node_key: SymmetricKey,
    /// The invitation records written for this grant. Acceptance consumes
    /// them, so once accepted these ids point at nothing.
    pub grant: Option<GrantRecords>,
}

impl ChildLink {
    /// A link with no invitation records.
    pub fn new(node_id: BlobId, node_key: SymmetricKey) -> Self {
        Self {
            node_id,
            node_key,
            grant: None,
        }
    }
}

/// One node in the access tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "AccessNodeWire", into = "AccessNodeWire")]
pub struct AccessNode {
    file_key_id: BlobId,
    children: BTreeMap<String, ChildLink>,
}

/// Stored form: two maps keyed by child name. They must carry the same keys.
/// Grant records, when present, may only name linked children.
#[derive(Serialize, Deserialize)]
struct AccessNodeWire {
    file_key_id: BlobId,
    child_nodes: BTreeMap<String, BlobId>,
    child_keys: BTreeMap<String, SymmetricKey>,
    #[serde(default)]
    child_grants: BTreeMap<String, GrantRecords>,
}

impl TryFrom<AccessNodeWire> for AccessNode {
    type Error = AccessError;

    fn try_from(wire: AccessNodeWire) -> Result<Self> {
        let AccessNodeWire {
            file_key_id,
            child_nodes,
            mut child_keys,
            mut child_grants,
        } = wire;

        if child_nodes.len() != child_keys.len() {
            return Err(AccessError::Corrupt(format!(
                "access node has {} child ids but {} child keys",
                child_nodes.len(),
                child_keys.len()
            )));
        }

        let mut children = BTreeMap::new();
        for (name, node_id) in child_nodes {
            let node_key = child_keys.remove(&name).ok_or_else(|| {
                AccessError::Corrupt(format!("access node child {:?} has no key", name))
            })?;
            let grant = child_grants.remove(&name);
            children.insert(
                name,
                ChildLink {
                    node_id,
                    node_key,
                    grant,
                },
            );
        }

        if let Some(name) = child_grants.keys().next() {
            return Err(AccessError::Corrupt(format!(
                "access node has grant records for unlinked child {:?}",
                name
            )));
        }

        Ok(Self {
            file_key_id,
            children,
        })
    }
}

impl From<AccessNode> for AccessNodeWire {
    fn from(node: AccessNode) -> Self {
        let mut child_nodes = BTreeMap::new();
        let mut child_keys = BTreeMap::new();
        let mut child_grants = BTreeMap::new();
        for (name, link) in node.children {
            if let Some(grant) = link.grant {
                child_grants.insert(name.clone(), grant);
            }
            child_nodes.insert(name.clone(), link.node_id);
            child_keys.insert(name, link.node_key);
        }
        Self {
            file_key_id: node.file_key_id,
            child_nodes,
            child_keys,
            child_grants,
        }
    }
}

impl AccessNode {
    /// A leaf node pointing at the holder's file-key record.
    pub fn new(file_key_id: BlobId) -> Self {
        Self {
            file_key_id,
            children: BTreeMap::new(),
        }
    }

    /// Where the holder's file-key record lives.
    pub fn file_key_id(&self) -> BlobId {
        self.file_key_id
    }

    /// Link a child. Fails if one with this name is already linked.
    pub fn add_child(&mut self, name: &str, link: ChildLink) -> Result<()> {
        if self.children.contains_key(name) {
            return Err(AccessError::DuplicateChild(name.to_string()));
        }
        self.children.insert(name.to_string(), link);
        Ok(())
    }

    /// Unlink a child, returning its link.
    pub fn remove_child(&mut self, name: &str) -> Option<ChildLink> {
        self.children.remove(name)
    }

    /// The link for a direct child.
    pub fn child(&self, name: &str) -> Option<&ChildLink> {
        self.children.get(name)
    }

    /// Whether `name` is a direct child.
    pub fn has_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Direct children by name, in sorted order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &ChildLink)> {
        self.children.iter().map(|(name, link)| (name.as_str(), link))
    }

    /// Direct child names, in sorted order.
    pub fn child_names(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }
}

/// A node scheduled for a visit but not yet loaded.
#[derive(Debug, Clone)]
pub struct PendingNode {
    /// Username holding this node.
    pub holder: String,
    /// Where the node lives.
    pub node_id: BlobId,
    /// Key the node is encrypted under.
    pub node_key: SymmetricKey,
    /// Holder of the parent node, `None` at the walk's root.
    pub parent: Option<String>,
}

/// A visited node.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    /// Username holding this node.
    pub holder: String,
    /// Where the node lives.
    pub node_id: BlobId,
    /// Holder of the parent node, `None` at the walk's root.
    pub parent: Option<String>,
    /// The decoded node.
    pub node: AccessNode,
}

/// Breadth-first worklist over an access subtree.
///
/// Bounded by a node cap and a visited set, so a hostile or corrupted tree
/// with cycles or fan-out cannot make it run forever. The walk itself does
/// no I/O: [`SubtreeWalk::run`] calls back to load each node.
pub struct SubtreeWalk {
    queue: VecDeque<PendingNode>,
    visited: HashSet<BlobId>,
    entries: Vec<TreeEntry>,
    cap: usize,
}

impl SubtreeWalk {
    /// An empty walk that visits at most `cap` nodes.
    pub fn new(cap: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            visited: HashSet::new(),
            entries: Vec::new(),
            cap,
        }
    }

    /// Schedule a node to be loaded and visited.
    pub fn push(&mut self, pending: PendingNode) {
        self.queue.push_back(pending);
    }

    /// Record a node the caller already holds and schedule its children.
    pub fn push_loaded(
        &mut self,
        holder: &str,
        node_id: BlobId,
        parent: Option<String>,
        node: AccessNode,
    ) -> Result<()> {
        self.visit(holder.to_string(), node_id, parent, node)
    }

    fn visit(
        &mut self,
        holder: String,
        node_id: BlobId,
        parent: Option<String>,
        node: AccessNode,
    ) -> Result<()> {
        if self.entries.len() >= self.cap {
            return Err(AccessError::TreeTooLarge(self.cap));
        }
        self.visited.insert(node_id);

        for (name, link) in node.children() {
            self.queue.push_back(PendingNode {
                holder: name.to_string(),
                node_id: link.node_id,
                node_key: link.node_key.clone(),
                parent: Some(holder.clone()),
            });
        }

        self.entries.push(TreeEntry {
            holder,
            node_id,
            parent,
            node,
        });
        Ok(())
    }

    /// Drain the worklist, loading each node with `fetch`.
    ///
    /// Returns every visited node in breadth-first order. A node id seen
    /// twice is visited once.
    pub fn run<F, E>(mut self, mut fetch: F) -> std::result::Result<Vec<TreeEntry>, E>
    where
        F: FnMut(&PendingNode) -> std::result::Result<AccessNode, E>,
        E: From<AccessError>,
    {
        while let Some(pending) = self.queue.pop_front() {
            if self.visited.contains(&pending.node_id) {
                tracing::warn!(node = %pending.node_id, holder = %pending.holder, "access tree revisits a node");
                continue;
            }
            let node = fetch(&pending)?;
            self.visit(pending.holder, pending.node_id, pending.parent, node)?;
        }
        Ok(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_core::{from_cbor, to_cbor};
    use std::collections::HashMap;

    fn link() -> ChildLink {
        ChildLink::new(BlobId::random(), SymmetricKey::generate())
    }

    #[test]
    fn test_add_remove_child() {
        let mut node = AccessNode::new(BlobId::random());
        node.add_child("bob", link()).unwrap();
        node.add_child("carol", link()).unwrap();

        assert!(matches!(
            node.add_child("bob", link()),
            Err(AccessError::DuplicateChild(_))
        ));
        assert_eq!(node.child_names(), vec!["bob", "carol"]);

        assert!(node.remove_child("bob").is_some());
        assert!(node.remove_child("bob").is_none());
        assert!(!node.has_child("bob"));
        assert!(node.has_child("carol"));
    }

    #[test]
    fn test_encoding_preserves_links() {
        let mut node = AccessNode::new(BlobId::random());
        let bob = link();
        let bob_id = bob.node_id;
        let bob_key = *bob.node_key.as_bytes();
        node.add_child("bob", bob).unwrap();

        let decoded: AccessNode = from_cbor(&to_cbor(&node).unwrap()).unwrap();
        assert_eq!(decoded.file_key_id(), node.file_key_id());
        let got = decoded.child("bob").unwrap();
        assert_eq!(got.node_id, bob_id);
        assert_eq!(got.node_key.as_bytes(), &bob_key);
    }

    #[test]
    fn test_mismatched_maps_rejected() {
        let mut child_nodes = BTreeMap::new();
        child_nodes.insert("bob".to_string(), BlobId::random());
        let mut child_keys = BTreeMap::new();
        child_keys.insert("mallory".to_string(), SymmetricKey::generate());

        let wire = AccessNodeWire {
            file_key_id: BlobId::random(),
            child_nodes,
            child_keys,
            child_grants: BTreeMap::new(),
        };
        let bytes = to_cbor(&wire).unwrap();
        assert!(from_cbor::<AccessNode>(&bytes).is_err());

        let lopsided = AccessNodeWire {
            file_key_id: BlobId::random(),
            child_nodes: BTreeMap::new(),
            child_keys: [("bob".to_string(), SymmetricKey::generate())].into(),
            child_grants: BTreeMap::new(),
        };
        assert!(AccessNode::try_from(lopsided).is_err());
    }

    #[test]
    fn test_grant_records_survive_encoding() {
        let grant = GrantRecords {
            invitation_id: BlobId::random(),
            metadata_id: BlobId::random(),
        };
        let mut node = AccessNode::new(BlobId::random());
        node.add_child("bob", ChildLink { grant: Some(grant), ..link() }).unwrap();
        node.add_child("carol", link()).unwrap();

        let decoded: AccessNode = from_cbor(&to_cbor(&node).unwrap()).unwrap();
        assert_eq!(decoded.child("bob").unwrap().grant, Some(grant));
        assert_eq!(decoded.child("carol").unwrap().grant, None);
    }

    #[test]
    fn test_grant_records_for_unlinked_child_rejected() {
        let grant = GrantRecords {
            invitation_id: BlobId::random(),
            metadata_id: BlobId::random(),
        };
        let wire = AccessNodeWire {
            file_key_id: BlobId::random(),
            child_nodes: BTreeMap::new(),
            child_keys: BTreeMap::new(),
            child_grants: [("mallory".to_string(), grant)].into(),
        };
        assert!(matches!(
            AccessNode::try_from(wire),
            Err(AccessError::Corrupt(_))
        ));
    }

    /// Build a tree in memory: holder -> (node id, node).
    fn build(edges: &[(&str, &str)]) -> (HashMap<BlobId, AccessNode>, HashMap<String, ChildLink>) {
        let mut links: HashMap<String, ChildLink> = HashMap::new();
        let mut nodes: HashMap<String, AccessNode> = HashMap::new();
        let mut names = vec!["root".to_string()];
        for (p, c) in edges {
            names.push(p.to_string());
            names.push(c.to_string());
        }
        for name in names {
            links.entry(name.clone()).or_insert_with(link);
            nodes.entry(name).or_insert_with(|| AccessNode::new(BlobId::random()));
        }
        for (p, c) in edges {
            let child = links[*c].clone();
            nodes.get_mut(*p).unwrap().add_child(c, child).unwrap();
        }
        let by_id = nodes
            .into_iter()
            .map(|(name, node)| (links[&name].node_id, node))
            .collect();
        (by_id, links)
    }

    fn start(holder: &str, links: &HashMap<String, ChildLink>) -> PendingNode {
        PendingNode {
            holder: holder.to_string(),
            node_id: links[holder].node_id,
            node_key: links[holder].node_key.clone(),
            parent: None,
        }
    }

    #[test]
    fn test_walk_visits_subtree_breadth_first() {
        let (nodes, links) = build(&[
            ("root", "bob"),
            ("root", "dave"),
            ("bob", "carol"),
            ("carol", "erin"),
        ]);

        let mut walk = SubtreeWalk::new(100);
        walk.push(start("bob", &links));
        let entries = walk
            .run(|p| Ok::<_, AccessError>(nodes[&p.node_id].clone()))
            .unwrap();

        let holders: Vec<&str> = entries.iter().map(|e| e.holder.as_str()).collect();
        assert_eq!(holders, vec!["bob", "carol", "erin"]);
        assert_eq!(entries[1].parent.as_deref(), Some("bob"));
        assert_eq!(entries[0].parent, None);
    }

    #[test]
    fn test_walk_from_loaded_root() {
        let (nodes, links) = build(&[("root", "bob"), ("root", "dave")]);
        let mut root = nodes[&links["root"].node_id].clone();
        root.remove_child("bob");

        let mut walk = SubtreeWalk::new(100);
        walk.push_loaded("root", links["root"].node_id, None, root)
            .unwrap();
        let entries = walk
            .run(|p| Ok::<_, AccessError>(nodes[&p.node_id].clone()))
            .unwrap();

        let holders: Vec<&str> = entries.iter().map(|e| e.holder.as_str()).collect();
        assert_eq!(holders, vec!["root", "dave"]);
    }

    #[test]
    fn test_walk_survives_cycle() {
        let (mut nodes, links) = build(&[("root", "bob")]);
        // bob links back to root
        let back = links["root"].clone();
        nodes
            .get_mut(&links["bob"].node_id)
            .unwrap()
            .add_child("root", back)
            .unwrap();

        let mut walk = SubtreeWalk::new(100);
        walk.push(start("root", &links));
        let entries = walk
            .run(|p| Ok::<_, AccessError>(nodes[&p.node_id].clone()))
            .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_walk_enforces_cap() {
        let (nodes, links) = build(&[("root", "a"), ("root", "b"), ("root", "c")]);

        let mut walk = SubtreeWalk::new(2);
        walk.push(start("root", &links));
        let result = walk.run(|p| Ok::<_, AccessError>(nodes[&p.node_id].clone()));
        assert!(matches!(result, Err(AccessError::TreeTooLarge(2))));
    }

    #[test]
    fn test_walk_propagates_fetch_error() {
        let (_, links) = build(&[("root", "bob")]);

        let mut walk = SubtreeWalk::new(10);
        walk.push(start("root", &links));
        let result = walk.run(|_| Err(AccessError::Corrupt("gone".into())));
        assert!(matches!(result, Err(AccessError::Corrupt(_))));
    }
}
