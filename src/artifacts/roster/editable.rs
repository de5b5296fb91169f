//! Editable-tree protocol
//!
//! [`EditableTree`] is the capability a concrete tree must offer to accept a
//! change-set. The change-set drives it in a fixed order (creates, detaches,
//! attaches, drops, deltas, attribute clears, attribute sets, commit); the
//! implementation only has to perform each primitive and report structural
//! errors.
//!
//! [`EditableRoster`] is the in-memory implementation over a [`Roster`].

use crate::artifacts::core::attr::{AttrKey, AttrValue};
use crate::artifacts::core::file_path::FilePath;
use crate::artifacts::core::hex_id::ContentId;
use crate::artifacts::core::node_id::{NodeId, NodeIdSource};
use crate::artifacts::roster::roster::Roster;
use crate::error::Result;

pub trait EditableTree {
    /// Detach the node at `src`, keeping its identity and subtree
    fn detach_node(&mut self, src: &FilePath) -> Result<NodeId>;

    /// Forget a detached node that has no children
    fn drop_detached_node(&mut self, nid: NodeId) -> Result<()>;

    fn create_dir_node(&mut self) -> Result<NodeId>;

    fn create_file_node(&mut self, content: &ContentId) -> Result<NodeId>;

    /// Attach a detached node at `dst`; the parent of `dst` must exist
    fn attach_node(&mut self, nid: NodeId, dst: &FilePath) -> Result<()>;

    fn apply_delta(&mut self, path: &FilePath, old: &ContentId, new: &ContentId) -> Result<()>;

    fn clear_attr(&mut self, path: &FilePath, key: &AttrKey) -> Result<()>;

    fn set_attr(&mut self, path: &FilePath, key: &AttrKey, value: &AttrValue) -> Result<()>;

    /// Finish the edit session
    fn commit(&mut self) -> Result<()>;
}

pub struct EditableRoster<'a> {
    roster: &'a mut Roster,
    nis: &'a mut dyn NodeIdSource,
}

impl<'a> EditableRoster<'a> {
    pub fn new(roster: &'a mut Roster, nis: &'a mut dyn NodeIdSource) -> Self {
        Self { roster, nis }
    }
}

impl EditableTree for EditableRoster<'_> {
    fn detach_node(&mut self, src: &FilePath) -> Result<NodeId> {
        self.roster.detach_node(src)
    }

    fn drop_detached_node(&mut self, nid: NodeId) -> Result<()> {
        self.roster.drop_detached_node(nid)
    }

    fn create_dir_node(&mut self) -> Result<NodeId> {
        self.roster.create_dir_node(self.nis)
    }

    fn create_file_node(&mut self, content: &ContentId) -> Result<NodeId> {
        self.roster.create_file_node(content, self.nis)
    }

    fn attach_node(&mut self, nid: NodeId, dst: &FilePath) -> Result<()> {
        self.roster.attach_node(nid, dst)
    }

    fn apply_delta(&mut self, path: &FilePath, old: &ContentId, new: &ContentId) -> Result<()> {
        self.roster.apply_delta(path, old, new)
    }

    fn clear_attr(&mut self, path: &FilePath, key: &AttrKey) -> Result<()> {
        self.roster.clear_attr(path, key)
    }

    fn set_attr(&mut self, path: &FilePath, key: &AttrKey, value: &AttrValue) -> Result<()> {
        self.roster.set_attr(path, key, value)
    }

    fn commit(&mut self) -> Result<()> {
        self.roster.commit_edits();
        Ok(())
    }
}
