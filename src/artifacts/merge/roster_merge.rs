//! Roster merge
//!
//! Merging runs in two passes over the node ids of both inputs.
//!
//! ### Lifecycles
//!
//! A node present on both sides lives. A node present on one side only lives
//! if it was born in that side's uncommon history: the other side simply has
//! not seen it yet. Otherwise the other side deleted it, and it dies along
//! with any edits made to it.
//!
//! ### Scalars
//!
//! Each surviving node gets its name, content and attributes through the
//! scalar *-merge rule. A node seen by one side only is copied forward as
//! is. Placing a node at its merged name can still fail: the parent may be
//! gone, the name may be taken, or the move may close a directory loop. In
//! all those cases the node stays detached and a [`Conflict`] records why.
//!
//! Conflicts are data. A merge only fails when its input is inconsistent.

use crate::artifacts::core::attr::AttrKey;
use crate::artifacts::core::node_id::NodeId;
use crate::artifacts::core::parallel::{Paired, parallel};
use crate::artifacts::merge::conflict::{Conflict, ConflictKind};
use crate::artifacts::merge::scalar::{ScalarMerge, ScalarSide, merge_scalar};
use crate::artifacts::merge::{AmbiguityPolicy, MergeOptions, MergeSide};
use crate::artifacts::roster::marking::{Marking, RevisionSet};
use crate::artifacts::roster::node::{Attachment, Node};
use crate::artifacts::roster::roster::Roster;
use crate::error::{Result, StructuralError};
use std::collections::BTreeMap;

/// Merged roster plus everything that could not be reconciled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    roster: Roster,
    conflicts: Vec<Conflict>,
}

impl MergeResult {
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn into_roster(self) -> Roster {
        self.roster
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn conflicts_of(&self, kind: ConflictKind) -> impl Iterator<Item = &Conflict> {
        self.conflicts
            .iter()
            .filter(move |conflict| conflict.kind() == kind)
    }

    pub fn has_content_conflicts(&self) -> bool {
        self.conflicts_of(ConflictKind::FileContent).next().is_some()
    }

    pub fn has_non_content_conflicts(&self) -> bool {
        self.conflicts
            .iter()
            .any(|conflict| conflict.kind() != ConflictKind::FileContent)
    }
}

/// Which input a node's attachment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Left,
    Right,
    Both,
}

fn marking_of<'m>(side: &MergeSide<'m>, nid: NodeId) -> Result<&'m Marking> {
    side.markings
        .get(&nid)
        .ok_or(StructuralError::MissingMarking(nid))
}

fn attachment_of(node: &Node) -> Result<&Attachment> {
    node.attachment()
        .ok_or(StructuralError::NotAttached(node.id()))
}

fn attr_marks<'m>(marking: &'m Marking, nid: NodeId, key: &AttrKey) -> Result<&'m RevisionSet> {
    marking.attrs.get(key).ok_or_else(|| {
        StructuralError::Insane(format!("node {} has no marks for attribute '{}'", nid, key))
    })
}

struct RosterMerger<'a> {
    left: MergeSide<'a>,
    right: MergeSide<'a>,
    options: &'a MergeOptions,
    result: Roster,
    origins: BTreeMap<NodeId, Origin>,
    conflicts: Vec<Conflict>,
}

impl<'a> RosterMerger<'a> {
    fn new(left: MergeSide<'a>, right: MergeSide<'a>, options: &'a MergeOptions) -> Self {
        Self {
            left,
            right,
            options,
            result: Roster::new(),
            origins: BTreeMap::new(),
            conflicts: Vec::new(),
        }
    }

    fn merge(mut self) -> Result<MergeResult> {
        self.merge_lifecycles()?;
        self.merge_nodes()?;
        self.check_root()?;

        let result = MergeResult {
            roster: self.result,
            conflicts: self.conflicts,
        };
        tracing::info!(
            nodes = result.roster.len(),
            conflicts = result.conflicts.len(),
            "merged rosters"
        );
        Ok(result)
    }

    /// Create an empty detached node for every node that survives
    fn merge_lifecycles(&mut self) -> Result<()> {
        let (left, right) = (self.left, self.right);

        for paired in parallel(left.roster.nodes(), right.roster.nodes()) {
            match paired {
                Paired::LeftOnly(nid, node) => {
                    if survives(&left, *nid)? {
                        self.create_node_for(node)?;
                    }
                }
                Paired::RightOnly(nid, node) => {
                    if survives(&right, *nid)? {
                        self.create_node_for(node)?;
                    }
                }
                Paired::Both(nid, left_node, right_node) => {
                    if !left_node.same_kind(right_node) {
                        return Err(StructuralError::KindMismatch { nid: *nid });
                    }
                    let left_birth = &marking_of(&left, *nid)?.birth_revision;
                    let right_birth = &marking_of(&right, *nid)?.birth_revision;
                    if left_birth != right_birth {
                        return Err(StructuralError::InconsistentAncestry(format!(
                            "node {} was born in {} on the left and in {} on the right",
                            nid,
                            left_birth.to_short_id(),
                            right_birth.to_short_id()
                        )));
                    }
                    self.create_node_for(left_node)?;
                }
            }
        }

        tracing::debug!(survivors = self.result.len(), "lifecycle pass done");
        Ok(())
    }

    fn create_node_for(&mut self, node: &Node) -> Result<()> {
        if node.is_dir() {
            self.result.create_dir_node_with_id(node.id())
        } else {
            self.result.create_file_node_with_id(node.id(), None)
        }
    }

    fn merge_nodes(&mut self) -> Result<()> {
        let (left, right) = (self.left, self.right);

        for paired in parallel(left.roster.nodes(), right.roster.nodes()) {
            match paired {
                Paired::LeftOnly(nid, node) if self.result.contains(*nid) => {
                    self.copy_node_forward(node, Origin::Left)?;
                }
                Paired::RightOnly(nid, node) if self.result.contains(*nid) => {
                    self.copy_node_forward(node, Origin::Right)?;
                }
                Paired::Both(nid, left_node, right_node) => {
                    self.merge_node(*nid, left_node, right_node)?;
                }
                _ => {}
            }
        }

        tracing::debug!(conflicts = self.conflicts.len(), "scalar pass done");
        Ok(())
    }

    fn copy_node_forward(&mut self, node: &Node, origin: Origin) -> Result<()> {
        let nid = node.id();
        for (key, state) in node.attrs() {
            self.result.set_attr_state(nid, key.clone(), state.clone())?;
        }
        if node.is_file() {
            self.result.set_content(nid, node.content().cloned())?;
        }
        self.assign_name(nid, attachment_of(node)?.clone(), origin)
    }

    fn merge_node(&mut self, nid: NodeId, left_node: &Node, right_node: &Node) -> Result<()> {
        let left_marking = marking_of(&self.left, nid)?;
        let right_marking = marking_of(&self.right, nid)?;

        let left_at = attachment_of(left_node)?;
        let right_at = attachment_of(right_node)?;
        let merged_at = merge_scalar(
            ScalarSide::new(left_at, &left_marking.parent_name, self.left.uncommon),
            ScalarSide::new(right_at, &right_marking.parent_name, self.right.uncommon),
        );
        match self.resolve(nid, "name", merged_at)? {
            Some(at) => {
                let origin = match (&at == left_at, &at == right_at) {
                    (true, true) => Origin::Both,
                    (true, false) => Origin::Left,
                    _ => Origin::Right,
                };
                self.assign_name(nid, at, origin)?;
            }
            None => self.conflicts.push(Conflict::NodeName {
                nid,
                left: left_at.clone(),
                right: right_at.clone(),
            }),
        }

        if left_node.is_file() {
            let (Some(left_content), Some(right_content)) =
                (left_node.content(), right_node.content())
            else {
                return Err(StructuralError::Insane(format!(
                    "file {} has no content in a merge input",
                    nid
                )));
            };
            let merged_content = merge_scalar(
                ScalarSide::new(left_content, &left_marking.file_content, self.left.uncommon),
                ScalarSide::new(right_content, &right_marking.file_content, self.right.uncommon),
            );
            match self.resolve(nid, "content", merged_content)? {
                Some(content) => self.result.set_content(nid, Some(content))?,
                None => self.conflicts.push(Conflict::FileContent {
                    nid,
                    left: left_content.clone(),
                    right: right_content.clone(),
                }),
            }
        }

        for paired in parallel(left_node.attrs(), right_node.attrs()) {
            match paired {
                Paired::LeftOnly(key, state) | Paired::RightOnly(key, state) => {
                    self.result.set_attr_state(nid, key.clone(), state.clone())?;
                }
                Paired::Both(key, left_state, right_state) => {
                    let merged_attr = merge_scalar(
                        ScalarSide::new(
                            left_state,
                            attr_marks(left_marking, nid, key)?,
                            self.left.uncommon,
                        ),
                        ScalarSide::new(
                            right_state,
                            attr_marks(right_marking, nid, key)?,
                            self.right.uncommon,
                        ),
                    );
                    match self.resolve(nid, "attribute", merged_attr)? {
                        Some(state) => self.result.set_attr_state(nid, key.clone(), state)?,
                        None => self.conflicts.push(Conflict::NodeAttr {
                            nid,
                            key: key.clone(),
                            left: left_state.clone(),
                            right: right_state.clone(),
                        }),
                    }
                }
            }
        }

        Ok(())
    }

    /// `None` means the scalar stays unresolved
    fn resolve<T>(
        &self,
        nid: NodeId,
        scalar: &'static str,
        merged: ScalarMerge<T>,
    ) -> Result<Option<T>> {
        match merged {
            ScalarMerge::Resolved(value) => Ok(Some(value)),
            ScalarMerge::Conflict => Ok(None),
            ScalarMerge::Ambiguous => match self.options.ambiguous_scalar {
                AmbiguityPolicy::Fail => Err(StructuralError::AmbiguousMerge { nid, scalar }),
                AmbiguityPolicy::Conflict => {
                    tracing::warn!(%nid, scalar, "both sides win, recording a conflict");
                    Ok(None)
                }
            },
        }
    }

    /// Left and right ids of two nodes claiming one location
    fn claimants(&self, incoming: NodeId, origin: Origin, existing: NodeId) -> (NodeId, NodeId) {
        let existing_origin = self.origins.get(&existing).copied();
        if origin == Origin::Left || existing_origin == Some(Origin::Right) {
            (incoming, existing)
        } else {
            (existing, incoming)
        }
    }

    fn evict(&mut self, nid: NodeId) -> Result<()> {
        self.result.unlink(nid)?;
        self.origins.remove(&nid);
        Ok(())
    }

    fn assign_name(&mut self, nid: NodeId, location: Attachment, origin: Origin) -> Result<()> {
        match &location {
            Attachment::Root => {
                if let Some(existing) = self.result.root() {
                    let (left, right) = self.claimants(nid, origin, existing);
                    self.evict(existing)?;
                    self.conflicts.push(Conflict::RenameTarget {
                        left,
                        right,
                        location: location.clone(),
                    });
                    return Ok(());
                }
            }
            Attachment::Child { parent, name } => {
                if !self.result.contains(*parent) {
                    self.conflicts.push(Conflict::OrphanedNode {
                        nid,
                        location: location.clone(),
                    });
                    return Ok(());
                }

                if let Some(existing) = self.result.node(*parent)?.child(name) {
                    let (left, right) = self.claimants(nid, origin, existing);
                    self.evict(existing)?;
                    self.conflicts.push(Conflict::RenameTarget {
                        left,
                        right,
                        location: location.clone(),
                    });
                    return Ok(());
                }

                if self.result.would_make_dir_loop(nid, *parent) {
                    self.conflicts.push(Conflict::DirectoryLoop {
                        nid,
                        location: location.clone(),
                    });
                    return Ok(());
                }
            }
        }

        self.result.attach_node_at(nid, location)?;
        self.origins.insert(nid, origin);
        Ok(())
    }

    fn check_root(&mut self) -> Result<()> {
        let Some(root) = self.result.root() else {
            self.conflicts.push(Conflict::MissingRoot);
            return Ok(());
        };

        let reserved = self
            .result
            .node(root)?
            .children()
            .find(|(name, _)| name.as_ref() == self.options.bookkeeping_dir.as_str())
            .map(|(name, nid)| (name.clone(), nid));
        if let Some((name, nid)) = reserved {
            self.evict(nid)?;
            self.conflicts.push(Conflict::IllegalName {
                nid,
                location: Attachment::child(root, name),
            });
        }

        Ok(())
    }
}

/// Whether a node seen by one side only belongs in the merge
fn survives(side: &MergeSide<'_>, nid: NodeId) -> Result<bool> {
    let marking = marking_of(side, nid)?;
    if side.uncommon.contains(&marking.birth_revision) {
        return Ok(true);
    }

    let lost_edits = marking
        .file_content
        .iter()
        .filter(|rid| side.uncommon.contains(*rid))
        .map(|rid| rid.to_short_id())
        .collect::<Vec<_>>();
    if !lost_edits.is_empty() {
        let path = side
            .roster
            .path_of(nid)
            .map(|path| path.to_string())
            .unwrap_or_else(|_| nid.to_string());
        tracing::warn!(
            path = %path,
            revisions = ?lost_edits,
            "content changes are ignored: the file was removed on the other side"
        );
    }

    Ok(false)
}

/// Merge two rosters given their markings and uncommon ancestors
pub fn merge_rosters(
    left: &MergeSide<'_>,
    right: &MergeSide<'_>,
    options: &MergeOptions,
) -> Result<MergeResult> {
    RosterMerger::new(*left, *right, options).merge()
}
