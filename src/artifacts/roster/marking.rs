//! Ancestry markings
//!
//! A marking records, for one node of a roster, which revisions are
//! responsible for the current value of each of its scalars:
//!
//! - `birth_revision`: the revision that created the node
//! - `parent_name`: revisions that last set the node's attachment
//! - `file_content`: revisions that last set the file content (files only)
//! - `attrs`: per attribute key, revisions that last set that attribute
//!
//! Markings are derived, never edited by hand. A root revision marks every
//! scalar with itself; a child revision copies a scalar's marks when the
//! value is unchanged and marks it with itself otherwise; a merge revision
//! combines both parents' marks (see [`mark_merge_roster`]).
//!
//! The merge engine reads these marks to decide, for every scalar, whether a
//! side's value is a fresh edit or something the other side has already seen.

use crate::artifacts::core::attr::{AttrKey, AttrState};
use crate::artifacts::core::hex_id::RevisionId;
use crate::artifacts::core::node_id::NodeId;
use crate::artifacts::merge::MergeSide;
use crate::artifacts::roster::node::{Attachment, Node};
use crate::artifacts::roster::roster::Roster;
use crate::error::{Result, StructuralError};
use std::collections::{BTreeMap, BTreeSet};

pub type RevisionSet = BTreeSet<RevisionId>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marking {
    pub birth_revision: RevisionId,
    pub parent_name: RevisionSet,
    pub file_content: RevisionSet,
    pub attrs: BTreeMap<AttrKey, RevisionSet>,
}

pub type MarkingMap = BTreeMap<NodeId, Marking>;

impl Marking {
    /// Marking of a node first seen in `rid`
    pub fn for_new_node(rid: &RevisionId, node: &Node) -> Self {
        let only_rid = RevisionSet::from([rid.clone()]);
        Self {
            birth_revision: rid.clone(),
            parent_name: only_rid.clone(),
            file_content: if node.is_file() {
                only_rid.clone()
            } else {
                RevisionSet::new()
            },
            attrs: node
                .attrs()
                .keys()
                .map(|key| (key.clone(), only_rid.clone()))
                .collect(),
        }
    }
}

fn attachment_of(node: &Node) -> Result<&Attachment> {
    node.attachment()
        .ok_or(StructuralError::NotAttached(node.id()))
}

fn marking_of(markings: &MarkingMap, nid: NodeId) -> Result<&Marking> {
    markings.get(&nid).ok_or(StructuralError::MissingMarking(nid))
}

fn attr_marks<'m>(marking: &'m Marking, nid: NodeId, key: &AttrKey) -> Result<&'m RevisionSet> {
    marking.attrs.get(key).ok_or_else(|| {
        StructuralError::Insane(format!("node {} has no marks for attribute '{}'", nid, key))
    })
}

/// Mark every node of a parentless revision as born there
pub fn mark_new_roster(rid: &RevisionId, roster: &Roster) -> MarkingMap {
    roster
        .nodes()
        .iter()
        .map(|(nid, node)| (*nid, Marking::for_new_node(rid, node)))
        .collect()
}

fn mark_unmerged_scalar<T: PartialEq>(
    parent_marks: &RevisionSet,
    parent_value: &T,
    new_rid: &RevisionId,
    new_value: &T,
) -> RevisionSet {
    if parent_value == new_value {
        parent_marks.clone()
    } else {
        RevisionSet::from([new_rid.clone()])
    }
}

fn mark_unmerged_node(
    parent_marking: &Marking,
    parent_node: &Node,
    new_rid: &RevisionId,
    node: &Node,
) -> Result<Marking> {
    if !parent_node.same_kind(node) {
        return Err(StructuralError::KindMismatch { nid: node.id() });
    }

    let parent_name = mark_unmerged_scalar(
        &parent_marking.parent_name,
        attachment_of(parent_node)?,
        new_rid,
        attachment_of(node)?,
    );

    let file_content = if node.is_file() {
        mark_unmerged_scalar(
            &parent_marking.file_content,
            &parent_node.content(),
            new_rid,
            &node.content(),
        )
    } else {
        RevisionSet::new()
    };

    let mut attrs = BTreeMap::new();
    for (key, state) in node.attrs() {
        let marks = match parent_node.attrs().get(key) {
            None => RevisionSet::from([new_rid.clone()]),
            Some(parent_state) => mark_unmerged_scalar(
                attr_marks(parent_marking, node.id(), key)?,
                parent_state,
                new_rid,
                state,
            ),
        };
        attrs.insert(key.clone(), marks);
    }

    Ok(Marking {
        birth_revision: parent_marking.birth_revision.clone(),
        parent_name,
        file_content,
        attrs,
    })
}

/// Markings of a revision with a single parent
pub fn mark_roster_with_one_parent(
    parent: &Roster,
    parent_markings: &MarkingMap,
    child_rid: &RevisionId,
    child: &Roster,
) -> Result<MarkingMap> {
    let mut markings = MarkingMap::new();
    for (nid, node) in child.nodes() {
        let marking = match parent.nodes().get(nid) {
            Some(parent_node) => mark_unmerged_node(
                marking_of(parent_markings, *nid)?,
                parent_node,
                child_rid,
                node,
            )?,
            None => Marking::for_new_node(child_rid, node),
        };
        markings.insert(*nid, marking);
    }

    child.check_sane_against(&markings)?;
    Ok(markings)
}

/// Marks of a scalar whose merged value equals one side's value only
///
/// `a` is the side whose value lost. If any of its marks is uncommon, the
/// merge overrode a live edit, which makes the merge revision itself
/// responsible for the value. Otherwise `b` won cleanly and keeps its marks.
fn mark_won_merge(
    a_marks: &RevisionSet,
    a_uncommon: &RevisionSet,
    b_marks: &RevisionSet,
    new_rid: &RevisionId,
) -> RevisionSet {
    if a_marks.iter().any(|rid| a_uncommon.contains(rid)) {
        RevisionSet::from([new_rid.clone()])
    } else {
        b_marks.clone()
    }
}

#[allow(clippy::too_many_arguments)]
fn mark_merged_scalar<T: PartialEq>(
    left_marks: &RevisionSet,
    left_uncommon: &RevisionSet,
    left_value: &T,
    right_marks: &RevisionSet,
    right_uncommon: &RevisionSet,
    right_value: &T,
    new_rid: &RevisionId,
    new_value: &T,
) -> Result<RevisionSet> {
    if let Some(rid) = left_marks.iter().find(|rid| right_uncommon.contains(rid)) {
        return Err(StructuralError::InconsistentAncestry(format!(
            "left mark {} is uncommon to the right side",
            rid
        )));
    }
    if let Some(rid) = right_marks.iter().find(|rid| left_uncommon.contains(rid)) {
        return Err(StructuralError::InconsistentAncestry(format!(
            "right mark {} is uncommon to the left side",
            rid
        )));
    }

    let marks = match (new_value != left_value, new_value != right_value) {
        (true, true) => RevisionSet::from([new_rid.clone()]),
        (true, false) => mark_won_merge(left_marks, left_uncommon, right_marks, new_rid),
        (false, true) => mark_won_merge(right_marks, right_uncommon, left_marks, new_rid),
        (false, false) => left_marks.union(right_marks).cloned().collect(),
    };

    Ok(marks)
}

fn mark_merged_node(
    left: (&Marking, &Node, &RevisionSet),
    right: (&Marking, &Node, &RevisionSet),
    new_rid: &RevisionId,
    node: &Node,
) -> Result<Marking> {
    let (left_marking, left_node, left_uncommon) = left;
    let (right_marking, right_node, right_uncommon) = right;
    let nid = node.id();

    if !left_node.same_kind(node) || !right_node.same_kind(node) {
        return Err(StructuralError::KindMismatch { nid });
    }
    if left_marking.birth_revision != right_marking.birth_revision {
        return Err(StructuralError::InconsistentAncestry(format!(
            "node {} has two birth revisions",
            nid
        )));
    }

    let parent_name = mark_merged_scalar(
        &left_marking.parent_name,
        left_uncommon,
        attachment_of(left_node)?,
        &right_marking.parent_name,
        right_uncommon,
        attachment_of(right_node)?,
        new_rid,
        attachment_of(node)?,
    )?;

    let file_content = if node.is_file() {
        mark_merged_scalar(
            &left_marking.file_content,
            left_uncommon,
            &left_node.content(),
            &right_marking.file_content,
            right_uncommon,
            &right_node.content(),
            new_rid,
            &node.content(),
        )?
    } else {
        RevisionSet::new()
    };

    let mut attrs = BTreeMap::new();
    for (key, state) in node.attrs() {
        let left_state = left_node.attrs().get(key);
        let right_state = right_node.attrs().get(key);
        let marks = match (left_state, right_state) {
            (None, None) => RevisionSet::from([new_rid.clone()]),
            (Some(left_state), None) => mark_unmerged_scalar(
                attr_marks(left_marking, nid, key)?,
                left_state,
                new_rid,
                state,
            ),
            (None, Some(right_state)) => mark_unmerged_scalar(
                attr_marks(right_marking, nid, key)?,
                right_state,
                new_rid,
                state,
            ),
            (Some(left_state), Some(right_state)) => mark_merged_scalar::<AttrState>(
                attr_marks(left_marking, nid, key)?,
                left_uncommon,
                left_state,
                attr_marks(right_marking, nid, key)?,
                right_uncommon,
                right_state,
                new_rid,
                state,
            )?,
        };
        attrs.insert(key.clone(), marks);
    }

    // attributes are cleared, never erased
    let lost = left_node
        .attrs()
        .keys()
        .chain(right_node.attrs().keys())
        .find(|key| !node.attrs().contains_key(*key));
    if let Some(key) = lost {
        return Err(StructuralError::Insane(format!(
            "merge of node {} lost attribute '{}'",
            nid, key
        )));
    }

    Ok(Marking {
        birth_revision: left_marking.birth_revision.clone(),
        parent_name,
        file_content,
        attrs,
    })
}

/// Markings of a merge revision
///
/// `merge` is the (resolved, sane) merged roster. Nodes that exist on one
/// side only must have been born on that side's uncommon history; nodes on
/// neither side are new in `new_rid`.
pub fn mark_merge_roster(
    left: &MergeSide<'_>,
    right: &MergeSide<'_>,
    new_rid: &RevisionId,
    merge: &Roster,
) -> Result<MarkingMap> {
    let mut markings = MarkingMap::new();

    for (nid, node) in merge.nodes() {
        let in_left = left.roster.nodes().get(nid);
        let in_right = right.roster.nodes().get(nid);

        let marking = match (in_left, in_right) {
            (None, None) => Marking::for_new_node(new_rid, node),
            (Some(left_node), None) => {
                let left_marking = marking_of(left.markings, *nid)?;
                if !left.uncommon.contains(&left_marking.birth_revision) {
                    return Err(StructuralError::InconsistentAncestry(format!(
                        "node {} exists only on the left but was born in common history",
                        nid
                    )));
                }
                mark_unmerged_node(left_marking, left_node, new_rid, node)?
            }
            (None, Some(right_node)) => {
                let right_marking = marking_of(right.markings, *nid)?;
                if !right.uncommon.contains(&right_marking.birth_revision) {
                    return Err(StructuralError::InconsistentAncestry(format!(
                        "node {} exists only on the right but was born in common history",
                        nid
                    )));
                }
                mark_unmerged_node(right_marking, right_node, new_rid, node)?
            }
            (Some(left_node), Some(right_node)) => mark_merged_node(
                (marking_of(left.markings, *nid)?, left_node, left.uncommon),
                (marking_of(right.markings, *nid)?, right_node, right.uncommon),
                new_rid,
                node,
            )?,
        };

        markings.insert(*nid, marking);
    }

    merge.check_sane_against(&markings)?;
    Ok(markings)
}
