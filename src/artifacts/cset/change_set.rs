use crate::artifacts::core::attr::{AttrKey, AttrValue};
use crate::artifacts::core::file_path::FilePath;
use crate::artifacts::core::hex_id::ContentId;
use crate::error::{Result, StructuralError};
use std::collections::{BTreeMap, BTreeSet};

/// The primitive edits turning one roster into another
///
/// Every collection is keyed by path (or by path and attribute key), so
/// iterating any of them is already in serialization order. Paths refer to
/// the pre-image for deletions and rename sources, and to the post-image
/// for everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub nodes_deleted: BTreeSet<FilePath>,
    pub dirs_added: BTreeSet<FilePath>,
    pub files_added: BTreeMap<FilePath, ContentId>,
    pub nodes_renamed: BTreeMap<FilePath, FilePath>,
    pub deltas_applied: BTreeMap<FilePath, (ContentId, ContentId)>,
    pub attrs_cleared: BTreeSet<(FilePath, AttrKey)>,
    pub attrs_set: BTreeMap<(FilePath, AttrKey), AttrValue>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes_deleted.is_empty()
            && self.dirs_added.is_empty()
            && self.files_added.is_empty()
            && self.nodes_renamed.is_empty()
            && self.deltas_applied.is_empty()
            && self.attrs_cleared.is_empty()
            && self.attrs_set.is_empty()
    }

    /// Number of primitive edits
    pub fn len(&self) -> usize {
        self.nodes_deleted.len()
            + self.dirs_added.len()
            + self.files_added.len()
            + self.nodes_renamed.len()
            + self.deltas_applied.len()
            + self.attrs_cleared.len()
            + self.attrs_set.len()
    }

    /// Verify the collections do not contradict each other
    ///
    /// A freshly added file carries its content, so it cannot also be
    /// patched; an attribute cannot be both cleared and set; a patch must
    /// change the content and a rename must move the node.
    pub fn check_normalized(&self) -> Result<()> {
        let not_normalized =
            |message: String| -> Result<()> { Err(StructuralError::NotNormalized(message)) };

        if let Some(path) = self
            .files_added
            .keys()
            .find(|path| self.deltas_applied.contains_key(*path))
        {
            return not_normalized(format!("'{}' is both added and patched", path));
        }

        if let Some((path, key)) = self
            .attrs_cleared
            .iter()
            .find(|entry| self.attrs_set.contains_key(*entry))
        {
            return not_normalized(format!(
                "attribute '{}' on '{}' is both cleared and set",
                key, path
            ));
        }

        if let Some(path) = self
            .deltas_applied
            .iter()
            .find_map(|(path, (old, new))| (old == new).then_some(path))
        {
            return not_normalized(format!("patch on '{}' does not change its content", path));
        }

        if let Some(path) = self
            .nodes_renamed
            .iter()
            .find_map(|(src, dst)| (src == dst).then_some(src))
        {
            return not_normalized(format!("'{}' is renamed onto itself", path));
        }

        Ok(())
    }
}
