//! Roster: a whole-tree snapshot
//!
//! A roster is a flat arena of [`Node`]s keyed by [`NodeId`]. Parent links
//! are ids looked up in the same arena, and every directory keeps a
//! name-to-id map of its children. One node (the root) is attached with
//! [`Attachment::Root`]; every other attached node hangs under a directory.
//!
//! ## Editing
//!
//! Rosters are edited through a small set of primitives:
//!
//! - create a detached dir or file node
//! - attach a detached node at a path (or directly at a parent id)
//! - detach an attached node, keeping its identity, content and subtree
//! - drop a detached node that has no children
//! - apply a content delta, set or clear an attribute
//!
//! Every primitive validates before it mutates; a failed primitive leaves
//! the roster untouched.
//!
//! ## Sanity
//!
//! Between edit sessions a roster must pass [`Roster::check_sane`]: a root
//! exists, every node is reachable from it, every file has content and no
//! detached node is pending.

use crate::artifacts::core::attr::{AttrKey, AttrState, AttrValue};
use crate::artifacts::core::file_path::FilePath;
use crate::artifacts::core::hex_id::ContentId;
use crate::artifacts::core::node_id::{NodeId, NodeIdSource};
use crate::artifacts::core::parallel::{Paired, parallel};
use crate::artifacts::roster::marking::MarkingMap;
use crate::artifacts::roster::node::{Attachment, Node, NodeKind};
use crate::error::{Result, StructuralError};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct Roster {
    nodes: BTreeMap<NodeId, Node>,
    root: Option<NodeId>,
    /// Where each node detached during the current edit session used to be
    old_locations: BTreeMap<NodeId, Attachment>,
}

impl PartialEq for Roster {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.nodes == other.nodes
    }
}

impl Eq for Roster {}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_root(&self) -> bool {
        self.root.is_some()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, nid: NodeId) -> bool {
        self.nodes.contains_key(&nid)
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, Node> {
        &self.nodes
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node(&self, nid: NodeId) -> Result<&Node> {
        self.nodes.get(&nid).ok_or(StructuralError::NodeNotFound(nid))
    }

    fn node_mut(&mut self, nid: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&nid)
            .ok_or(StructuralError::NodeNotFound(nid))
    }

    /// Resolve a path through attached nodes
    pub fn lookup(&self, path: &FilePath) -> Option<NodeId> {
        let mut current = self.root?;
        for component in path.components() {
            current = self.nodes.get(&current)?.child(component)?;
        }
        Some(current)
    }

    pub fn has_path(&self, path: &FilePath) -> bool {
        self.lookup(path).is_some()
    }

    pub fn node_at(&self, path: &FilePath) -> Result<&Node> {
        let nid = self
            .lookup(path)
            .ok_or_else(|| StructuralError::PathNotFound(path.clone()))?;
        self.node(nid)
    }

    /// Path from the root to an attached node
    pub fn path_of(&self, nid: NodeId) -> Result<FilePath> {
        let mut components = Vec::new();
        let mut current = nid;
        let mut steps = 0;
        loop {
            match self.node(current)?.attachment() {
                Some(Attachment::Root) if Some(current) == self.root => break,
                Some(Attachment::Child { parent, name }) => {
                    components.push(name.clone());
                    current = *parent;
                }
                _ => return Err(StructuralError::NotAttached(nid)),
            }
            steps += 1;
            if steps > self.nodes.len() {
                return Err(StructuralError::DirectoryLoop(nid));
            }
        }

        components.reverse();
        Ok(FilePath::from_components(components))
    }

    /// Whether the node is reachable from the root
    pub fn is_attached(&self, nid: NodeId) -> bool {
        self.path_of(nid).is_ok()
    }

    fn is_detached(&self, node: &Node) -> bool {
        node.attachment.is_none()
    }

    /// Every attached node, depth first, children in name order
    pub fn walk(&self) -> Vec<(FilePath, NodeId)> {
        let mut visited = Vec::with_capacity(self.nodes.len());
        let Some(root) = self.root else {
            return visited;
        };

        let mut stack = vec![(FilePath::root(), root)];
        while let Some((path, nid)) = stack.pop() {
            if let Some(node) = self.nodes.get(&nid) {
                let children = node.children().collect::<Vec<_>>();
                for (name, child) in children.into_iter().rev() {
                    stack.push((path.join(name), child));
                }
            }
            visited.push((path, nid));
        }

        visited
    }

    pub fn create_dir_node(&mut self, nis: &mut dyn NodeIdSource) -> Result<NodeId> {
        let nid = nis.next_id();
        self.create_dir_node_with_id(nid)?;
        Ok(nid)
    }

    pub fn create_dir_node_with_id(&mut self, nid: NodeId) -> Result<()> {
        self.insert_node(Node::new_dir(nid))
    }

    pub fn create_file_node(
        &mut self,
        content: &ContentId,
        nis: &mut dyn NodeIdSource,
    ) -> Result<NodeId> {
        let nid = nis.next_id();
        self.create_file_node_with_id(nid, Some(content.clone()))?;
        Ok(nid)
    }

    pub fn create_file_node_with_id(
        &mut self,
        nid: NodeId,
        content: Option<ContentId>,
    ) -> Result<()> {
        self.insert_node(Node::new_file(nid, content))
    }

    fn insert_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(StructuralError::NodeIdInUse(node.id));
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Attach a detached node at `dst`, whose parent must already be attached
    pub fn attach_node(&mut self, nid: NodeId, dst: &FilePath) -> Result<()> {
        let Some((dirname, basename)) = dst.split() else {
            return self.attach_node_at(nid, Attachment::Root);
        };

        let parent = self
            .lookup(&dirname)
            .ok_or(StructuralError::PathNotFound(dirname))?;
        if self.node(parent)?.child(basename).is_some() {
            return Err(StructuralError::PathOccupied(dst.clone()));
        }

        self.attach_node_at(nid, Attachment::child(parent, basename.clone()))
    }

    /// Attach a detached node directly under a parent id
    ///
    /// The parent does not need to be attached itself; merges build the
    /// result tree in node-id order and may hang a node under a directory
    /// that is attached later.
    pub fn attach_node_at(&mut self, nid: NodeId, attachment: Attachment) -> Result<()> {
        let node = self.node(nid)?;
        if !self.is_detached(node) {
            return Err(StructuralError::AlreadyAttached(nid));
        }
        if self.old_locations.get(&nid) == Some(&attachment) {
            return Err(StructuralError::ReattachedInPlace(nid));
        }

        match &attachment {
            Attachment::Root => {
                if self.root.is_some() {
                    return Err(StructuralError::RootExists);
                }
                if !node.is_dir() {
                    return Err(StructuralError::NotADirectory(nid));
                }
                self.root = Some(nid);
            }
            Attachment::Child { parent, name } => {
                let parent_node = self.node(*parent)?;
                if !parent_node.is_dir() {
                    return Err(StructuralError::NotADirectory(*parent));
                }
                if parent_node.child(name).is_some() {
                    return Err(StructuralError::NameTaken {
                        parent: *parent,
                        name: name.clone(),
                    });
                }
                if self.would_make_dir_loop(nid, *parent) {
                    return Err(StructuralError::DirectoryLoop(nid));
                }
                if let NodeKind::Dir { children } = &mut self.node_mut(*parent)?.kind {
                    children.insert(name.clone(), nid);
                }
            }
        }

        self.old_locations.remove(&nid);
        self.node_mut(nid)?.attachment = Some(attachment);
        Ok(())
    }

    /// Whether hanging `nid` under `parent` would close a cycle
    pub fn would_make_dir_loop(&self, nid: NodeId, parent: NodeId) -> bool {
        let mut current = parent;
        for _ in 0..=self.nodes.len() {
            if current == nid {
                return true;
            }
            match self.nodes.get(&current).and_then(|node| node.attachment()) {
                Some(Attachment::Child { parent, .. }) => current = *parent,
                _ => return false,
            }
        }
        true
    }

    /// Detach the node at `src`, returning its id
    pub fn detach_node(&mut self, src: &FilePath) -> Result<NodeId> {
        let nid = self
            .lookup(src)
            .ok_or_else(|| StructuralError::PathNotFound(src.clone()))?;
        self.detach_node_by_id(nid)?;
        Ok(nid)
    }

    /// Detach a node, remembering its location for the rest of the session
    pub fn detach_node_by_id(&mut self, nid: NodeId) -> Result<()> {
        let previous = self.unlink(nid)?;
        self.old_locations.entry(nid).or_insert(previous);
        Ok(())
    }

    /// Detach without recording the old location
    pub(crate) fn unlink(&mut self, nid: NodeId) -> Result<Attachment> {
        let attachment = self
            .node(nid)?
            .attachment
            .clone()
            .ok_or(StructuralError::NotAttached(nid))?;

        match &attachment {
            Attachment::Root => self.root = None,
            Attachment::Child { parent, name } => {
                if let NodeKind::Dir { children } = &mut self.node_mut(*parent)?.kind {
                    children.remove(name);
                }
            }
        }

        self.node_mut(nid)?.attachment = None;
        Ok(attachment)
    }

    /// Remove a detached, childless node for good
    pub fn drop_detached_node(&mut self, nid: NodeId) -> Result<()> {
        let node = self.node(nid)?;
        if !self.is_detached(node) {
            return Err(StructuralError::AlreadyAttached(nid));
        }
        if node.has_children() {
            return Err(StructuralError::DirectoryNotEmpty(nid));
        }

        self.nodes.remove(&nid);
        self.old_locations.remove(&nid);
        Ok(())
    }

    pub fn apply_delta(&mut self, path: &FilePath, old: &ContentId, new: &ContentId) -> Result<()> {
        let node = self.node_at(path)?;
        let nid = node.id;
        if !node.is_file() {
            return Err(StructuralError::NotAFile(nid));
        }
        if node.content() != Some(old) {
            return Err(StructuralError::ContentMismatch {
                path: path.clone(),
                expected: old.clone(),
                actual: node.content().cloned(),
            });
        }
        if old == new {
            return Err(StructuralError::NoOpDelta(path.clone()));
        }

        self.set_content(nid, Some(new.clone()))
    }

    /// Overwrite a file's content; `None` leaves a conflict placeholder
    pub fn set_content(&mut self, nid: NodeId, content: Option<ContentId>) -> Result<()> {
        match &mut self.node_mut(nid)?.kind {
            NodeKind::File { content: current } => {
                *current = content;
                Ok(())
            }
            NodeKind::Dir { .. } => Err(StructuralError::NotAFile(nid)),
        }
    }

    pub fn clear_attr(&mut self, path: &FilePath, key: &AttrKey) -> Result<()> {
        let nid = self.node_at(path)?.id;
        let node = self.node_mut(nid)?;
        match node.attrs.get_mut(key) {
            Some(state @ AttrState::Set(_)) => {
                *state = AttrState::Cleared;
                Ok(())
            }
            _ => Err(StructuralError::AttrNotSet {
                path: path.clone(),
                key: key.clone(),
            }),
        }
    }

    pub fn set_attr(&mut self, path: &FilePath, key: &AttrKey, value: &AttrValue) -> Result<()> {
        let nid = self.node_at(path)?.id;
        let wanted = AttrState::Set(value.clone());
        let node = self.node_mut(nid)?;
        if node.attrs.get(key) == Some(&wanted) {
            return Err(StructuralError::AttrUnchanged {
                path: path.clone(),
                key: key.clone(),
            });
        }

        node.attrs.insert(key.clone(), wanted);
        Ok(())
    }

    /// Write an attribute state by node id, without the no-op checks
    pub fn set_attr_state(&mut self, nid: NodeId, key: AttrKey, state: AttrState) -> Result<()> {
        self.node_mut(nid)?.attrs.insert(key, state);
        Ok(())
    }

    /// Close the current edit session
    pub fn commit_edits(&mut self) {
        self.old_locations.clear();
    }

    pub fn check_sane(&self) -> Result<()> {
        self.check_sane_with(false)
    }

    pub fn check_sane_with(&self, temp_nodes_ok: bool) -> Result<()> {
        let root = self.root.ok_or(StructuralError::MissingRoot)?;
        let insane = |message: String| -> Result<()> { Err(StructuralError::Insane(message)) };

        if !self.old_locations.is_empty() {
            return insane("edit session still has detached nodes".into());
        }

        for (nid, node) in &self.nodes {
            if nid.is_temp() && !temp_nodes_ok {
                return insane(format!("node {} has a temporary id", nid));
            }
            match &node.attachment {
                None => return insane(format!("node {} is detached", nid)),
                Some(Attachment::Root) if *nid != root => {
                    return insane(format!("node {} claims to be the root", nid));
                }
                Some(Attachment::Root) => {}
                Some(Attachment::Child { parent, name }) => {
                    let registered = self.nodes.get(parent).and_then(|p| p.child(name));
                    if registered != Some(*nid) {
                        return insane(format!("node {} is not a child of {}", nid, parent));
                    }
                }
            }
            match &node.kind {
                NodeKind::File { content: None } => {
                    return insane(format!("file {} has no content", nid));
                }
                NodeKind::File { .. } => {}
                NodeKind::Dir { children } => {
                    for (name, child) in children {
                        let expected = Attachment::child(*nid, name.clone());
                        let child_node = self.node(*child)?;
                        if child_node.attachment.as_ref() != Some(&expected) {
                            return insane(format!("child {} of {} disagrees on its parent", child, nid));
                        }
                    }
                }
            }
        }

        let mut reached = BTreeSet::new();
        let mut pending = vec![root];
        while let Some(nid) = pending.pop() {
            if !reached.insert(nid) {
                return insane(format!("node {} is reachable twice", nid));
            }
            pending.extend(self.node(nid)?.children().map(|(_, child)| child));
        }
        if reached.len() != self.nodes.len() {
            return insane(format!(
                "{} nodes are unreachable from the root",
                self.nodes.len() - reached.len()
            ));
        }

        Ok(())
    }

    /// Sanity including agreement with the marking map
    pub fn check_sane_against(&self, markings: &MarkingMap) -> Result<()> {
        self.check_sane()?;

        for paired in parallel(&self.nodes, markings) {
            let (nid, node, marking) = match paired {
                Paired::LeftOnly(nid, _) => return Err(StructuralError::MissingMarking(*nid)),
                Paired::RightOnly(nid, _) => {
                    return Err(StructuralError::Insane(format!("marking for unknown node {}", nid)));
                }
                Paired::Both(nid, node, marking) => (nid, node, marking),
            };

            if marking.parent_name.is_empty() {
                return Err(StructuralError::Insane(format!("node {} has no name marks", nid)));
            }
            if node.is_file() == marking.file_content.is_empty() {
                return Err(StructuralError::Insane(format!(
                    "node {} has content marks that do not match its kind",
                    nid
                )));
            }
            for attr in parallel(&node.attrs, &marking.attrs) {
                match attr {
                    Paired::Both(_, _, marks) if !marks.is_empty() => {}
                    Paired::Both(key, _, _) | Paired::LeftOnly(key, _) | Paired::RightOnly(key, _) => {
                        return Err(StructuralError::Insane(format!(
                            "attribute '{}' of node {} has no matching marks",
                            key, nid
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::core::file_path::PathComponent;
    use crate::artifacts::core::node_id::SequentialNodeIds;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    fn path(raw: &str) -> FilePath {
        FilePath::try_parse(raw).unwrap()
    }

    fn content(byte: u8) -> ContentId {
        ContentId::try_parse(format!("{:02x}", byte).repeat(20)).unwrap()
    }

    /// `/`, `/foo`, `/foo/bar` (file)
    #[fixture]
    fn small_tree() -> (Roster, SequentialNodeIds) {
        let mut nis = SequentialNodeIds::new();
        let mut roster = Roster::new();
        let root = roster.create_dir_node(&mut nis).unwrap();
        roster.attach_node(root, &FilePath::root()).unwrap();
        let foo = roster.create_dir_node(&mut nis).unwrap();
        roster.attach_node(foo, &path("foo")).unwrap();
        let bar = roster.create_file_node(&content(1), &mut nis).unwrap();
        roster.attach_node(bar, &path("foo/bar")).unwrap();
        roster.commit_edits();
        (roster, nis)
    }

    #[rstest]
    fn built_tree_is_sane_and_walkable(small_tree: (Roster, SequentialNodeIds)) {
        let (roster, _) = small_tree;

        roster.check_sane().unwrap();
        let paths = roster
            .walk()
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["", "foo", "foo/bar"]);
        assert_eq!(roster.path_of(NodeId::new(3)).unwrap(), path("foo/bar"));
    }

    #[rstest]
    fn detaching_a_directory_carries_its_subtree(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, _) = small_tree;

        let foo = roster.detach_node(&path("foo")).unwrap();
        roster.attach_node(foo, &path("quux")).unwrap();
        roster.commit_edits();

        roster.check_sane().unwrap();
        assert_eq!(roster.lookup(&path("quux/bar")), Some(NodeId::new(3)));
        assert!(!roster.has_path(&path("foo")));
    }

    #[rstest]
    fn attach_onto_an_occupied_path_fails(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, mut nis) = small_tree;
        let nid = roster.create_dir_node(&mut nis).unwrap();

        let err = roster.attach_node(nid, &path("foo")).unwrap_err();

        assert_eq!(err, StructuralError::PathOccupied(path("foo")));
    }

    #[rstest]
    fn attach_requires_an_existing_parent(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, mut nis) = small_tree;
        let nid = roster.create_dir_node(&mut nis).unwrap();

        let err = roster.attach_node(nid, &path("nowhere/x")).unwrap_err();

        assert_eq!(err, StructuralError::PathNotFound(path("nowhere")));
    }

    #[rstest]
    fn attached_nodes_cannot_be_attached_or_dropped(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, _) = small_tree;
        let bar = NodeId::new(3);

        assert_eq!(
            roster.attach_node(bar, &path("baz")).unwrap_err(),
            StructuralError::AlreadyAttached(bar)
        );
        assert_eq!(
            roster.drop_detached_node(bar).unwrap_err(),
            StructuralError::AlreadyAttached(bar)
        );
    }

    #[rstest]
    fn detached_nodes_cannot_be_detached_again(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, _) = small_tree;
        let bar = roster.detach_node(&path("foo/bar")).unwrap();

        assert_eq!(
            roster.detach_node_by_id(bar).unwrap_err(),
            StructuralError::NotAttached(bar)
        );
    }

    #[rstest]
    fn dropping_a_directory_with_children_fails(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, _) = small_tree;
        let foo = roster.detach_node(&path("foo")).unwrap();

        assert_eq!(
            roster.drop_detached_node(foo).unwrap_err(),
            StructuralError::DirectoryNotEmpty(foo)
        );
    }

    #[rstest]
    fn reattaching_in_place_is_rejected(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, _) = small_tree;
        let bar = roster.detach_node(&path("foo/bar")).unwrap();

        let err = roster.attach_node(bar, &path("foo/bar")).unwrap_err();

        assert_eq!(err, StructuralError::ReattachedInPlace(bar));
    }

    #[rstest]
    fn a_directory_cannot_move_under_itself(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, mut nis) = small_tree;
        let sub = roster.create_dir_node(&mut nis).unwrap();
        roster.attach_node(sub, &path("foo/sub")).unwrap();
        let foo = NodeId::new(2);
        roster.unlink(foo).unwrap();

        let err = roster
            .attach_node_at(foo, Attachment::child(sub, PathComponent::try_parse("foo").unwrap()))
            .unwrap_err();

        assert_eq!(err, StructuralError::DirectoryLoop(foo));
    }

    #[rstest]
    fn deltas_must_start_from_the_current_content(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, _) = small_tree;

        roster.apply_delta(&path("foo/bar"), &content(1), &content(2)).unwrap();

        assert_eq!(roster.node_at(&path("foo/bar")).unwrap().content(), Some(&content(2)));
        assert!(matches!(
            roster.apply_delta(&path("foo/bar"), &content(1), &content(3)),
            Err(StructuralError::ContentMismatch { .. })
        ));
        assert_eq!(
            roster.apply_delta(&path("foo/bar"), &content(2), &content(2)),
            Err(StructuralError::NoOpDelta(path("foo/bar")))
        );
        assert_eq!(
            roster.apply_delta(&path("foo"), &content(2), &content(3)),
            Err(StructuralError::NotAFile(NodeId::new(2)))
        );
    }

    #[rstest]
    fn attribute_edits_must_change_something(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, _) = small_tree;
        let key = AttrKey::from("exec");
        let value = AttrValue::from("true");

        roster.set_attr(&path("foo/bar"), &key, &value).unwrap();
        assert!(matches!(
            roster.set_attr(&path("foo/bar"), &key, &value),
            Err(StructuralError::AttrUnchanged { .. })
        ));

        roster.clear_attr(&path("foo/bar"), &key).unwrap();
        assert_eq!(
            roster.node_at(&path("foo/bar")).unwrap().attrs().get(&key),
            Some(&AttrState::Cleared)
        );
        assert!(matches!(
            roster.clear_attr(&path("foo/bar"), &key),
            Err(StructuralError::AttrNotSet { .. })
        ));
        assert!(matches!(
            roster.clear_attr(&path("foo"), &key),
            Err(StructuralError::AttrNotSet { .. })
        ));
    }

    #[rstest]
    fn detached_leftovers_make_the_roster_insane(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, mut nis) = small_tree;
        roster.create_dir_node(&mut nis).unwrap();

        assert!(matches!(roster.check_sane(), Err(StructuralError::Insane(_))));
    }

    #[rstest]
    fn a_conflicted_file_makes_the_roster_insane(small_tree: (Roster, SequentialNodeIds)) {
        let (mut roster, _) = small_tree;
        roster.set_content(NodeId::new(3), None).unwrap();

        assert!(matches!(roster.check_sane(), Err(StructuralError::Insane(_))));
    }

    #[test]
    fn an_empty_roster_has_no_root() {
        assert_eq!(Roster::new().check_sane(), Err(StructuralError::MissingRoot));
    }

    #[test]
    fn temporary_ids_are_only_sane_when_allowed() {
        let mut nis = crate::artifacts::core::node_id::TempNodeIds::new();
        let mut roster = Roster::new();
        let root = roster.create_dir_node(&mut nis).unwrap();
        roster.attach_node(root, &FilePath::root()).unwrap();

        assert!(roster.check_sane().is_err());
        roster.check_sane_with(true).unwrap();
    }
}
