//! Change-set application
//!
//! A change-set is applied to any [`EditableTree`] in five phases:
//!
//! 1. **Create**: every added directory, then every added file, becomes a
//!    fresh detached node scheduled for attachment at its destination.
//! 2. **Plan detaches**: deleted paths and rename sources are collected and
//!    ordered deepest first.
//! 3. **Detach**: nodes are detached bottom-up. Renamed nodes join the attach
//!    schedule, deleted nodes the drop schedule.
//! 4. **Attach**: nodes are attached top-down, so a directory is in place
//!    before anything is attached beneath it.
//! 5. **Finish**: drops, then content deltas, attribute clears, attribute
//!    sets, and finally `commit`.
//!
//! Splitting detaches from attaches lets a change-set swap two names, or move
//! a subtree into a slot another subtree just vacated, without any
//! intermediate collision.
//!
//! ## Validation
//!
//! The path-level schedule is built and checked before the tree is touched:
//! a path that would be detached twice (deleted and renamed) or that would
//! receive two nodes (added twice, or added and renamed onto) is rejected
//! with [`StructuralError::DuplicateSchedule`]. Errors raised by the tree
//! during phases 3–5 abort the application; use
//! [`ChangeSet::apply_to_roster`] to get all-or-nothing behavior on a roster.

use crate::artifacts::core::file_path::FilePath;
use crate::artifacts::core::hex_id::ContentId;
use crate::artifacts::core::node_id::{NodeId, NodeIdSource};
use crate::artifacts::cset::change_set::ChangeSet;
use crate::artifacts::roster::editable::{EditableRoster, EditableTree};
use crate::artifacts::roster::roster::Roster;
use crate::error::{Result, StructuralError};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy)]
enum Detach<'c> {
    Delete,
    RenameTo(&'c FilePath),
}

#[derive(Debug, Clone, Copy)]
enum Attach<'c> {
    NewDir,
    NewFile(&'c ContentId),
    Renamed,
}

/// Path-level plan of one application
#[derive(Debug, Default)]
struct Schedule<'c> {
    detaches: BTreeMap<&'c FilePath, Detach<'c>>,
    attaches: BTreeMap<&'c FilePath, Attach<'c>>,
}

impl<'c> Schedule<'c> {
    fn build(cs: &'c ChangeSet) -> Result<Self> {
        let mut schedule = Self::default();

        for dst in &cs.dirs_added {
            schedule.attach(dst, Attach::NewDir)?;
        }
        for (dst, content) in &cs.files_added {
            schedule.attach(dst, Attach::NewFile(content))?;
        }
        for (src, dst) in &cs.nodes_renamed {
            schedule.detach(src, Detach::RenameTo(dst))?;
            schedule.attach(dst, Attach::Renamed)?;
        }
        for src in &cs.nodes_deleted {
            schedule.detach(src, Detach::Delete)?;
        }

        Ok(schedule)
    }

    fn attach(&mut self, dst: &'c FilePath, attach: Attach<'c>) -> Result<()> {
        match self.attaches.entry(dst) {
            Entry::Occupied(_) => Err(StructuralError::DuplicateSchedule(dst.clone())),
            Entry::Vacant(slot) => {
                slot.insert(attach);
                Ok(())
            }
        }
    }

    fn detach(&mut self, src: &'c FilePath, detach: Detach<'c>) -> Result<()> {
        match self.detaches.entry(src) {
            Entry::Occupied(_) => Err(StructuralError::DuplicateSchedule(src.clone())),
            Entry::Vacant(slot) => {
                slot.insert(detach);
                Ok(())
            }
        }
    }
}

impl ChangeSet {
    /// Apply this change-set to an editable tree
    pub fn apply_to(&self, tree: &mut dyn EditableTree) -> Result<()> {
        self.check_normalized()?;
        let schedule = Schedule::build(self)?;

        // phase 1: new nodes, directories before files
        let mut ready: BTreeMap<&FilePath, NodeId> = BTreeMap::new();
        for (dst, attach) in &schedule.attaches {
            if let Attach::NewDir = attach {
                let nid = tree.create_dir_node()?;
                trace!(%nid, path = %dst, "created directory");
                ready.insert(*dst, nid);
            }
        }
        for (dst, attach) in &schedule.attaches {
            if let Attach::NewFile(content) = attach {
                let nid = tree.create_file_node(content)?;
                trace!(%nid, path = %dst, "created file");
                ready.insert(*dst, nid);
            }
        }
        debug!(created = ready.len(), "created new nodes");

        // phases 2 and 3: detach bottom-up
        let mut drops = Vec::new();
        for (src, detach) in schedule.detaches.iter().rev() {
            let nid = tree.detach_node(src)?;
            trace!(%nid, path = %src, "detached");
            match detach {
                Detach::Delete => drops.push(nid),
                Detach::RenameTo(dst) => {
                    ready.insert(*dst, nid);
                }
            }
        }
        debug!(detached = schedule.detaches.len(), "detached nodes");

        // phase 4: attach top-down
        for (dst, nid) in &ready {
            tree.attach_node(*nid, dst)?;
            trace!(%nid, path = %dst, "attached");
        }
        debug!(attached = ready.len(), "attached nodes");

        // phase 5: drops, then in-place edits
        for nid in drops {
            tree.drop_detached_node(nid)?;
            trace!(%nid, "dropped");
        }
        for (path, (old, new)) in &self.deltas_applied {
            tree.apply_delta(path, old, new)?;
        }
        for (path, key) in &self.attrs_cleared {
            tree.clear_attr(path, key)?;
        }
        for ((path, key), value) in &self.attrs_set {
            tree.set_attr(path, key, value)?;
        }
        debug!(
            deltas = self.deltas_applied.len(),
            cleared = self.attrs_cleared.len(),
            set = self.attrs_set.len(),
            "applied in-place edits"
        );

        tree.commit()
    }

    /// Apply to a roster as a single all-or-nothing step
    ///
    /// The edit runs on a scratch copy that replaces `roster` only once every
    /// phase succeeded.
    pub fn apply_to_roster(&self, roster: &mut Roster, nis: &mut dyn NodeIdSource) -> Result<()> {
        let mut scratch = roster.clone();
        self.apply_to(&mut EditableRoster::new(&mut scratch, nis))?;
        *roster = scratch;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::core::attr::{AttrKey, AttrState, AttrValue};
    use crate::artifacts::core::node_id::TempNodeIds;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    fn path(raw: &str) -> FilePath {
        FilePath::try_parse(raw).unwrap()
    }

    fn content(n: u8) -> ContentId {
        ContentId::try_parse(format!("{:040x}", n)).unwrap()
    }

    struct Workspace {
        roster: Roster,
        nis: TempNodeIds,
    }

    impl Workspace {
        fn apply(&mut self, cs: &ChangeSet) -> Result<()> {
            cs.apply_to(&mut EditableRoster::new(&mut self.roster, &mut self.nis))
        }

        fn is_file(&self, raw: &str) -> bool {
            self.roster.node_at(&path(raw)).is_ok_and(|node| node.is_file())
        }

        fn is_dir(&self, raw: &str) -> bool {
            self.roster.node_at(&path(raw)).is_ok_and(|node| node.is_dir())
        }
    }

    /// Root, directory `foo` with attr `attr_dir`, file `foo/bar` (content 1)
    /// with attr `attr_file`
    #[fixture]
    fn workspace() -> Workspace {
        let mut nis = TempNodeIds::new();
        let mut roster = Roster::new();
        let root = roster.create_dir_node(&mut nis).unwrap();
        roster.attach_node(root, &FilePath::root()).unwrap();
        let foo = roster.create_dir_node(&mut nis).unwrap();
        roster.attach_node(foo, &path("foo")).unwrap();
        roster
            .set_attr(&path("foo"), &AttrKey::from("attr_dir"), &AttrValue::from("value_dir"))
            .unwrap();
        let bar = roster.create_file_node(&content(1), &mut nis).unwrap();
        roster.attach_node(bar, &path("foo/bar")).unwrap();
        roster
            .set_attr(&path("foo/bar"), &AttrKey::from("attr_file"), &AttrValue::from("value_file"))
            .unwrap();
        roster.commit_edits();
        Workspace { roster, nis }
    }

    #[rstest]
    fn adds_files_and_directories(mut workspace: Workspace) {
        let mut cs = ChangeSet::new();
        cs.dirs_added.insert(path("baz"));
        cs.files_added.insert(path("baz/new"), content(2));

        workspace.apply(&cs).unwrap();

        assert!(workspace.is_dir("baz"));
        assert!(workspace.is_file("baz/new"));
        assert_eq!(workspace.roster.len(), 5);
        workspace.roster.check_sane_with(true).unwrap();
    }

    #[rstest]
    fn deletes_a_directory_with_its_contents(mut workspace: Workspace) {
        let mut cs = ChangeSet::new();
        cs.nodes_deleted.insert(path("foo/bar"));
        cs.nodes_deleted.insert(path("foo"));

        workspace.apply(&cs).unwrap();

        assert_eq!(workspace.roster.len(), 1);
        workspace.roster.check_sane_with(true).unwrap();
    }

    #[rstest]
    fn renaming_a_directory_moves_its_subtree(mut workspace: Workspace) {
        let mut cs = ChangeSet::new();
        cs.nodes_renamed.insert(path("foo"), path("quux"));

        workspace.apply(&cs).unwrap();

        assert!(workspace.is_file("quux/bar"));
        assert!(!workspace.is_dir("foo"));
        assert_eq!(workspace.roster.len(), 3);
    }

    #[rstest]
    fn patches_and_attribute_edits_apply_in_place(mut workspace: Workspace) {
        let mut cs = ChangeSet::new();
        cs.deltas_applied
            .insert(path("foo/bar"), (content(1), content(2)));
        cs.attrs_cleared
            .insert((path("foo/bar"), AttrKey::from("attr_file")));
        cs.attrs_set.insert(
            (path("foo"), AttrKey::from("ping")),
            AttrValue::from("klang"),
        );

        workspace.apply(&cs).unwrap();

        let bar = workspace.roster.node_at(&path("foo/bar")).unwrap();
        assert_eq!(bar.content(), Some(&content(2)));
        assert_eq!(bar.attrs()[&AttrKey::from("attr_file")], AttrState::Cleared);
        let foo = workspace.roster.node_at(&path("foo")).unwrap();
        assert_eq!(
            foo.attrs()[&AttrKey::from("ping")],
            AttrState::Set(AttrValue::from("klang"))
        );
    }

    #[rstest]
    fn swapping_two_names_never_collides(mut workspace: Workspace) {
        let mut setup = ChangeSet::new();
        setup.files_added.insert(path("a"), content(10));
        setup.files_added.insert(path("b"), content(11));
        workspace.apply(&setup).unwrap();

        let mut swap = ChangeSet::new();
        swap.nodes_renamed.insert(path("a"), path("b"));
        swap.nodes_renamed.insert(path("b"), path("a"));
        workspace.apply(&swap).unwrap();

        let a = workspace.roster.node_at(&path("a")).unwrap();
        let b = workspace.roster.node_at(&path("b")).unwrap();
        assert_eq!(a.content(), Some(&content(11)));
        assert_eq!(b.content(), Some(&content(10)));
    }

    #[rstest]
    fn renames_at_different_levels(mut workspace: Workspace) {
        let mut build = ChangeSet::new();
        build.dirs_added.insert(path("quux"));
        build.dirs_added.insert(path("quux/sub"));
        build.dirs_added.insert(path("foo/sub"));
        build.files_added.insert(path("foo/sub/deep"), content(2));
        build.files_added.insert(path("quux/sub/thing"), content(1));
        workspace.apply(&build).unwrap();
        assert_eq!(workspace.roster.len(), 8);

        let mut renames = ChangeSet::new();
        renames.nodes_renamed.insert(path("foo"), path("quux"));
        renames.nodes_renamed.insert(path("quux"), path("foo"));
        renames.nodes_renamed.insert(path("foo/sub"), path("foo/subsub"));
        workspace.apply(&renames).unwrap();

        assert_eq!(workspace.roster.len(), 8);
        assert!(workspace.is_file("quux/bar"));
        assert!(!workspace.is_file("foo/bar"));
        assert!(workspace.is_file("foo/subsub/deep"));
        assert!(!workspace.is_file("foo/sub/deep"));
        assert!(workspace.is_dir("foo/sub"));
        assert!(!workspace.is_dir("quux/sub"));
        assert!(workspace.is_file("foo/sub/thing"));
    }

    #[rstest]
    fn delete_targets_the_node_before_renames_land(mut workspace: Workspace) {
        let mut cs = ChangeSet::new();
        cs.nodes_renamed.insert(path("foo/bar"), path("foo"));
        cs.nodes_deleted.insert(path("foo"));

        workspace.apply(&cs).unwrap();

        assert_eq!(workspace.roster.len(), 2);
        assert!(workspace.is_file("foo"));
    }

    #[rstest]
    #[case::double_delete({
        let mut cs = ChangeSet::new();
        cs.nodes_deleted.insert(path("foo/bar"));
        cs
    })]
    #[case::double_add({
        let mut cs = ChangeSet::new();
        cs.files_added.insert(path("baz"), content(2));
        cs
    })]
    #[case::clear_twice({
        let mut cs = ChangeSet::new();
        cs.attrs_cleared.insert((path("foo/bar"), AttrKey::from("attr_file")));
        cs
    })]
    fn applying_twice_fails(mut workspace: Workspace, #[case] cs: ChangeSet) {
        workspace.apply(&cs).unwrap();

        assert!(workspace.apply(&cs).is_err());
    }

    #[rstest]
    #[case::file_on_top_of_dir({
        let mut cs = ChangeSet::new();
        cs.files_added.insert(path("foo"), content(2));
        cs
    })]
    #[case::add_on_top_of_root({
        let mut cs = ChangeSet::new();
        cs.dirs_added.insert(FilePath::root());
        cs
    })]
    #[case::rename_onto_root({
        let mut cs = ChangeSet::new();
        cs.nodes_renamed.insert(path("foo"), FilePath::root());
        cs
    })]
    #[case::rename_onto_itself({
        let mut cs = ChangeSet::new();
        cs.nodes_renamed.insert(path("foo/bar"), path("foo/bar"));
        cs
    })]
    #[case::rename_parent_and_child_alike({
        let mut cs = ChangeSet::new();
        cs.nodes_renamed.insert(path("foo"), path("baz"));
        cs.nodes_renamed.insert(path("foo/bar"), path("baz/bar"));
        cs
    })]
    #[case::set_and_clear_same_attr({
        let mut cs = ChangeSet::new();
        cs.attrs_set.insert((path("foo/bar"), AttrKey::from("blah")), AttrValue::from("blahblah"));
        cs.attrs_cleared.insert((path("foo/bar"), AttrKey::from("blah")));
        cs
    })]
    #[case::no_op_attr_set({
        let mut cs = ChangeSet::new();
        cs.attrs_set.insert((path("foo/bar"), AttrKey::from("attr_file")), AttrValue::from("value_file"));
        cs
    })]
    #[case::clear_missing_attr({
        let mut cs = ChangeSet::new();
        cs.attrs_cleared.insert((path("foo/bar"), AttrKey::from("blah")));
        cs
    })]
    #[case::no_op_delta({
        let mut cs = ChangeSet::new();
        cs.deltas_applied.insert(path("foo/bar"), (content(1), content(1)));
        cs
    })]
    #[case::add_and_delta({
        let mut cs = ChangeSet::new();
        cs.files_added.insert(path("baz"), content(1));
        cs.deltas_applied.insert(path("baz"), (content(1), content(2)));
        cs
    })]
    #[case::delta_on_directory({
        let mut cs = ChangeSet::new();
        cs.deltas_applied.insert(path("foo"), (content(1), content(2)));
        cs
    })]
    #[case::delete_non_empty_directory({
        let mut cs = ChangeSet::new();
        cs.nodes_deleted.insert(path("foo"));
        cs
    })]
    #[case::move_directory_under_itself({
        let mut cs = ChangeSet::new();
        cs.nodes_renamed.insert(path("foo"), path("foo/blah"));
        cs
    })]
    fn invalid_change_sets_are_rejected(mut workspace: Workspace, #[case] cs: ChangeSet) {
        let mut nis = TempNodeIds::new();
        let before = workspace.roster.clone();

        assert!(cs.apply_to_roster(&mut workspace.roster, &mut nis).is_err());
        assert_eq!(workspace.roster, before);
    }

    #[rstest]
    #[case::delete_and_rename({
        let mut cs = ChangeSet::new();
        cs.nodes_deleted.insert(path("foo/bar"));
        cs.nodes_renamed.insert(path("foo/bar"), path("baz"));
        cs
    }, "foo/bar")]
    #[case::add_and_rename_onto({
        let mut cs = ChangeSet::new();
        cs.dirs_added.insert(path("baz"));
        cs.nodes_renamed.insert(path("foo/bar"), path("baz"));
        cs
    }, "baz")]
    #[case::add_dir_and_file_alike({
        let mut cs = ChangeSet::new();
        cs.dirs_added.insert(path("baz"));
        cs.files_added.insert(path("baz"), content(3));
        cs
    }, "baz")]
    fn double_schedules_fail_before_touching_the_tree(
        #[case] cs: ChangeSet,
        #[case] duplicated: &str,
    ) {
        let mut recorder = RecordingTree::default();

        let err = cs.apply_to(&mut recorder).unwrap_err();

        assert_eq!(err, StructuralError::DuplicateSchedule(path(duplicated)));
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn attaching_without_a_root_fails() {
        let mut roster = Roster::new();
        let mut nis = TempNodeIds::new();
        let mut cs = ChangeSet::new();
        cs.dirs_added.insert(path("blah/blah/blah"));

        assert!(cs.apply_to_roster(&mut roster, &mut nis).is_err());
    }

    #[rstest]
    fn the_root_can_be_renamed_away(mut workspace: Workspace) {
        let mut cs = ChangeSet::new();
        cs.dirs_added.insert(FilePath::root());
        cs.nodes_renamed.insert(FilePath::root(), path("baz"));

        workspace.apply(&cs).unwrap();

        workspace.roster.check_sane_with(true).unwrap();
        assert!(workspace.is_file("baz/foo/bar"));
    }

    #[test]
    fn deleting_the_root_leaves_an_insane_roster() {
        let mut nis = TempNodeIds::new();
        let mut roster = Roster::new();
        let root = roster.create_dir_node(&mut nis).unwrap();
        roster.attach_node(root, &FilePath::root()).unwrap();
        let mut cs = ChangeSet::new();
        cs.nodes_deleted.insert(FilePath::root());

        cs.apply_to_roster(&mut roster, &mut nis).unwrap();

        assert!(roster.check_sane_with(true).is_err());
    }

    #[test]
    fn the_root_can_be_deleted_and_replaced() {
        let mut nis = TempNodeIds::new();
        let mut roster = Roster::new();
        let root = roster.create_dir_node(&mut nis).unwrap();
        roster.attach_node(root, &FilePath::root()).unwrap();
        let mut cs = ChangeSet::new();
        cs.nodes_deleted.insert(FilePath::root());
        cs.dirs_added.insert(FilePath::root());

        cs.apply_to_roster(&mut roster, &mut nis).unwrap();

        roster.check_sane_with(true).unwrap();
        assert_ne!(roster.root(), Some(root));
    }

    /// Records the primitive calls made by `apply_to`
    #[derive(Default)]
    struct RecordingTree {
        calls: Vec<String>,
        next: u64,
    }

    impl EditableTree for RecordingTree {
        fn detach_node(&mut self, src: &FilePath) -> Result<NodeId> {
            self.calls.push(format!("detach {}", src));
            self.next += 1;
            Ok(NodeId::new(100 + self.next))
        }

        fn drop_detached_node(&mut self, nid: NodeId) -> Result<()> {
            self.calls.push(format!("drop {}", nid));
            Ok(())
        }

        fn create_dir_node(&mut self) -> Result<NodeId> {
            self.calls.push("create dir".to_string());
            self.next += 1;
            Ok(NodeId::new(self.next))
        }

        fn create_file_node(&mut self, _content: &ContentId) -> Result<NodeId> {
            self.calls.push("create file".to_string());
            self.next += 1;
            Ok(NodeId::new(self.next))
        }

        fn attach_node(&mut self, nid: NodeId, dst: &FilePath) -> Result<()> {
            self.calls.push(format!("attach {} {}", nid, dst));
            Ok(())
        }

        fn apply_delta(&mut self, path: &FilePath, _old: &ContentId, _new: &ContentId) -> Result<()> {
            self.calls.push(format!("delta {}", path));
            Ok(())
        }

        fn clear_attr(&mut self, path: &FilePath, key: &AttrKey) -> Result<()> {
            self.calls.push(format!("clear {} {}", path, key));
            Ok(())
        }

        fn set_attr(&mut self, path: &FilePath, key: &AttrKey, _value: &AttrValue) -> Result<()> {
            self.calls.push(format!("set {} {}", path, key));
            Ok(())
        }

        fn commit(&mut self) -> Result<()> {
            self.calls.push("commit".to_string());
            Ok(())
        }
    }

    #[test]
    fn primitives_are_issued_in_phase_order() {
        let mut cs = ChangeSet::new();
        cs.files_added.insert(path("z/file"), content(1));
        cs.dirs_added.insert(path("z"));
        cs.nodes_deleted.insert(path("a"));
        cs.nodes_deleted.insert(path("a/b"));
        cs.nodes_renamed.insert(path("c"), path("d/e"));
        cs.deltas_applied.insert(path("d/e"), (content(1), content(2)));
        cs.attrs_set
            .insert((path("z"), AttrKey::from("k")), AttrValue::from("v"));
        cs.attrs_cleared.insert((path("d/e"), AttrKey::from("k")));
        let mut recorder = RecordingTree::default();

        cs.apply_to(&mut recorder).unwrap();

        assert_eq!(
            recorder.calls,
            vec![
                "create dir",
                "create file",
                "detach c",
                "detach a/b",
                "detach a",
                "attach 103 d/e",
                "attach 1 z",
                "attach 2 z/file",
                "drop 104",
                "drop 105",
                "delta d/e",
                "clear d/e k",
                "set z k",
                "commit",
            ]
        );
    }
}
