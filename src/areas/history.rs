//! In-memory revision history
//!
//! A [`History`] stores revisions as rosters plus markings, wired together
//! through their parent ids. It drives the whole pipeline: applying
//! change-sets, deriving markings, finding uncommon ancestors and merging.
//!
//! A revision id is the SHA-1 of its parent ids followed by the serialized
//! change-set that produced it, so committing the same change-set twice on
//! the same parent yields the same revision.

use crate::artifacts::core::hex_id::RevisionId;
use crate::artifacts::core::node_id::SequentialNodeIds;
use crate::artifacts::cset::change_set::ChangeSet;
use crate::artifacts::cset::format::write_cset;
use crate::artifacts::diff::roster_diff::make_cset;
use crate::artifacts::merge::roster_merge::{MergeResult, merge_rosters};
use crate::artifacts::merge::uncommon_ancestors::{RevisionGraph, Uncommon};
use crate::artifacts::merge::{MergeOptions, MergeSide};
use crate::artifacts::roster::marking::{
    MarkingMap, mark_merge_roster, mark_new_roster, mark_roster_with_one_parent,
};
use crate::artifacts::roster::roster::Roster;
use crate::error::{Result, StructuralError};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Revision {
    roster: Roster,
    markings: MarkingMap,
    parents: Vec<RevisionId>,
}

impl Revision {
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn markings(&self) -> &MarkingMap {
        &self.markings
    }

    pub fn parents(&self) -> &[RevisionId] {
        &self.parents
    }
}

#[derive(Debug)]
pub struct History {
    revisions: BTreeMap<RevisionId, Revision>,
    graph: RevisionGraph,
    nis: SequentialNodeIds,
    options: MergeOptions,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_options(MergeOptions::default())
    }

    pub fn with_options(options: MergeOptions) -> Self {
        Self {
            revisions: BTreeMap::new(),
            graph: RevisionGraph::new(),
            nis: SequentialNodeIds::new(),
            options,
        }
    }

    pub fn contains(&self, rid: &RevisionId) -> bool {
        self.revisions.contains_key(rid)
    }

    pub fn revision(&self, rid: &RevisionId) -> Result<&Revision> {
        self.revisions
            .get(rid)
            .ok_or_else(|| StructuralError::UnknownRevision(rid.clone()))
    }

    pub fn roster(&self, rid: &RevisionId) -> Result<&Roster> {
        Ok(self.revision(rid)?.roster())
    }

    fn revision_id(parents: &[&RevisionId], cs: &ChangeSet) -> RevisionId {
        let mut data = String::new();
        for parent in parents {
            data.push_str(parent.as_ref());
            data.push('\n');
        }
        data.push_str(&write_cset(cs));
        RevisionId::for_data(data.as_bytes())
    }

    /// Apply `cs` to a copy of `base`, leaving ids of new nodes unique
    /// across the whole history
    fn apply(&mut self, base: &Roster, cs: &ChangeSet) -> Result<Roster> {
        let mut roster = base.clone();
        cs.apply_to_roster(&mut roster, &mut self.nis)?;
        roster.check_sane()?;
        Ok(roster)
    }

    fn store(&mut self, rid: RevisionId, revision: Revision) -> Result<RevisionId> {
        self.graph.add(rid.clone(), revision.parents.clone())?;
        self.revisions.insert(rid.clone(), revision);
        tracing::debug!(%rid, "stored revision");
        Ok(rid)
    }

    pub fn root_commit(&mut self, cs: &ChangeSet) -> Result<RevisionId> {
        let rid = Self::revision_id(&[], cs);
        if self.contains(&rid) {
            return Ok(rid);
        }

        let roster = self.apply(&Roster::new(), cs)?;
        let markings = mark_new_roster(&rid, &roster);
        self.store(
            rid,
            Revision {
                roster,
                markings,
                parents: Vec::new(),
            },
        )
    }

    pub fn commit(&mut self, parent: &RevisionId, cs: &ChangeSet) -> Result<RevisionId> {
        let rid = Self::revision_id(&[parent], cs);
        if self.contains(&rid) {
            return Ok(rid);
        }

        let base = self.revision(parent)?.roster.clone();
        let roster = self.apply(&base, cs)?;
        let parent_revision = self.revision(parent)?;
        let markings =
            mark_roster_with_one_parent(&parent_revision.roster, &parent_revision.markings, &rid, &roster)?;
        self.store(
            rid,
            Revision {
                roster,
                markings,
                parents: vec![parent.clone()],
            },
        )
    }

    pub fn uncommon_ancestors(&self, left: &RevisionId, right: &RevisionId) -> Result<Uncommon> {
        self.graph.uncommon_ancestors(left, right)
    }

    pub fn merge(&self, left: &RevisionId, right: &RevisionId) -> Result<MergeResult> {
        let uncommon = self.uncommon_ancestors(left, right)?;
        let (left_revision, right_revision) = (self.revision(left)?, self.revision(right)?);

        merge_rosters(
            &MergeSide::new(&left_revision.roster, &left_revision.markings, &uncommon.left),
            &MergeSide::new(&right_revision.roster, &right_revision.markings, &uncommon.right),
            &self.options,
        )
    }

    /// Record a clean merge as a revision with two parents
    pub fn commit_merge(
        &mut self,
        left: &RevisionId,
        right: &RevisionId,
        result: &MergeResult,
    ) -> Result<RevisionId> {
        if !result.is_clean() {
            return Err(StructuralError::UnresolvedConflicts(result.conflicts().len()));
        }

        let uncommon = self.uncommon_ancestors(left, right)?;
        let (left_revision, right_revision) = (self.revision(left)?, self.revision(right)?);
        let merged = result.roster().clone();

        let cs = make_cset(&left_revision.roster, &merged)?;
        let rid = Self::revision_id(&[left, right], &cs);
        if self.contains(&rid) {
            return Ok(rid);
        }

        let markings = mark_merge_roster(
            &MergeSide::new(&left_revision.roster, &left_revision.markings, &uncommon.left),
            &MergeSide::new(&right_revision.roster, &right_revision.markings, &uncommon.right),
            &rid,
            &merged,
        )?;
        self.store(
            rid,
            Revision {
                roster: merged,
                markings,
                parents: vec![left.clone(), right.clone()],
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::core::file_path::FilePath;
    use crate::artifacts::core::hex_id::ContentId;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    fn path(raw: &str) -> FilePath {
        FilePath::try_parse(raw).unwrap()
    }

    fn content(byte: u8) -> ContentId {
        ContentId::try_parse(format!("{:02x}", byte).repeat(20)).unwrap()
    }

    #[fixture]
    fn history() -> (History, RevisionId) {
        let mut cs = ChangeSet::new();
        cs.dirs_added.insert(FilePath::root());
        cs.files_added.insert(path("f"), content(1));

        let mut history = History::new();
        let root = history.root_commit(&cs).unwrap();
        (history, root)
    }

    #[rstest]
    fn commit_records_parent_and_marks(history: (History, RevisionId)) {
        let (mut history, root) = history;
        let mut cs = ChangeSet::new();
        cs.deltas_applied.insert(path("f"), (content(1), content(2)));

        let child = history.commit(&root, &cs).unwrap();

        let revision = history.revision(&child).unwrap();
        assert_eq!(revision.parents(), &[root.clone()]);
        let f = revision.roster().lookup(&path("f")).unwrap();
        let marking = &revision.markings()[&f];
        assert_eq!(marking.birth_revision, root);
        assert!(marking.file_content.contains(&child));
    }

    #[rstest]
    fn same_change_on_same_parent_is_the_same_revision(history: (History, RevisionId)) {
        let (mut history, root) = history;
        let mut cs = ChangeSet::new();
        cs.files_added.insert(path("g"), content(3));

        let first = history.commit(&root, &cs).unwrap();
        let second = history.commit(&root, &cs).unwrap();

        assert_eq!(first, second);
    }

    #[rstest]
    fn nodes_added_on_different_branches_get_distinct_ids(history: (History, RevisionId)) {
        let (mut history, root) = history;
        let mut left_cs = ChangeSet::new();
        left_cs.files_added.insert(path("l"), content(4));
        let mut right_cs = ChangeSet::new();
        right_cs.files_added.insert(path("r"), content(5));

        let left = history.commit(&root, &left_cs).unwrap();
        let right = history.commit(&root, &right_cs).unwrap();

        let l = history.roster(&left).unwrap().lookup(&path("l")).unwrap();
        let r = history.roster(&right).unwrap().lookup(&path("r")).unwrap();
        assert_ne!(l, r);
    }

    #[rstest]
    fn clean_merge_is_committed_with_both_parents(history: (History, RevisionId)) {
        let (mut history, root) = history;
        let mut left_cs = ChangeSet::new();
        left_cs.files_added.insert(path("l"), content(4));
        let mut right_cs = ChangeSet::new();
        right_cs.deltas_applied.insert(path("f"), (content(1), content(6)));
        let left = history.commit(&root, &left_cs).unwrap();
        let right = history.commit(&root, &right_cs).unwrap();

        let result = history.merge(&left, &right).unwrap();
        let merged = history.commit_merge(&left, &right, &result).unwrap();

        let roster = history.roster(&merged).unwrap();
        assert!(roster.has_path(&path("l")));
        assert_eq!(
            roster.node_at(&path("f")).unwrap().content(),
            Some(&content(6))
        );
        assert_eq!(history.revision(&merged).unwrap().parents().len(), 2);
    }

    #[rstest]
    fn conflicted_merge_cannot_be_committed(history: (History, RevisionId)) {
        let (mut history, root) = history;
        let mut left_cs = ChangeSet::new();
        left_cs.deltas_applied.insert(path("f"), (content(1), content(2)));
        let mut right_cs = ChangeSet::new();
        right_cs.deltas_applied.insert(path("f"), (content(1), content(3)));
        let left = history.commit(&root, &left_cs).unwrap();
        let right = history.commit(&root, &right_cs).unwrap();

        let result = history.merge(&left, &right).unwrap();

        assert_eq!(
            history.commit_merge(&left, &right, &result),
            Err(StructuralError::UnresolvedConflicts(1))
        );
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut history = History::new();
        let unknown = RevisionId::for_data(b"nowhere");

        assert_eq!(
            history.commit(&unknown, &ChangeSet::new()),
            Err(StructuralError::UnknownRevision(unknown))
        );
    }
}
