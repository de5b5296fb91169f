use crate::artifacts::core::attr::{AttrMap, AttrState};
use crate::artifacts::core::file_path::FilePath;
use crate::artifacts::core::node_id::NodeId;
use crate::artifacts::core::parallel::{Paired, parallel};
use crate::artifacts::cset::change_set::ChangeSet;
use crate::artifacts::roster::node::Node;
use crate::artifacts::roster::roster::Roster;
use crate::error::{Result, StructuralError};

/// Change-set turning `from` into `to`
///
/// Both rosters must be sane. Nodes are matched by id, so a node that moved
/// shows up as a rename and never as a delete plus an add.
pub fn make_cset(from: &Roster, to: &Roster) -> Result<ChangeSet> {
    let mut cs = ChangeSet::new();

    for paired in parallel(from.nodes(), to.nodes()) {
        match paired {
            Paired::LeftOnly(nid, _) => {
                cs.nodes_deleted.insert(from.path_of(*nid)?);
            }
            Paired::RightOnly(nid, node) => detect_addition(&mut cs, to, *nid, node)?,
            Paired::Both(nid, old, new) => detect_changes(&mut cs, (from, old), (to, new), *nid)?,
        }
    }

    tracing::debug!(edits = cs.len(), "derived change-set");
    Ok(cs)
}

fn detect_addition(cs: &mut ChangeSet, to: &Roster, nid: NodeId, node: &Node) -> Result<()> {
    let path = to.path_of(nid)?;

    if node.is_dir() {
        cs.dirs_added.insert(path.clone());
    } else {
        let content = node.content().ok_or_else(|| {
            StructuralError::Insane(format!("file {} has no content", nid))
        })?;
        cs.files_added.insert(path.clone(), content.clone());
    }

    for (key, state) in node.attrs() {
        if let AttrState::Set(value) = state {
            cs.attrs_set.insert((path.clone(), key.clone()), value.clone());
        }
    }

    Ok(())
}

fn detect_changes(
    cs: &mut ChangeSet,
    (from, old): (&Roster, &Node),
    (to, new): (&Roster, &Node),
    nid: NodeId,
) -> Result<()> {
    if !old.same_kind(new) {
        return Err(StructuralError::KindMismatch { nid });
    }

    let to_path = to.path_of(nid)?;

    if old.attachment() != new.attachment() {
        cs.nodes_renamed.insert(from.path_of(nid)?, to_path.clone());
    }

    if let (Some(old_content), Some(new_content)) = (old.content(), new.content())
        && old_content != new_content
    {
        cs.deltas_applied
            .insert(to_path.clone(), (old_content.clone(), new_content.clone()));
    }

    detect_attr_changes(cs, &to_path, old.attrs(), new.attrs());
    Ok(())
}

fn detect_attr_changes(cs: &mut ChangeSet, path: &FilePath, old: &AttrMap, new: &AttrMap) {
    for paired in parallel(old, new) {
        let (key, before, after) = match paired {
            Paired::LeftOnly(key, before) => (key, before.value(), None),
            Paired::RightOnly(key, after) => (key, None, after.value()),
            Paired::Both(key, before, after) => (key, before.value(), after.value()),
        };

        match (before, after) {
            (Some(_), None) => {
                cs.attrs_cleared.insert((path.clone(), key.clone()));
            }
            (before, Some(value)) if before != Some(value) => {
                cs.attrs_set
                    .insert((path.clone(), key.clone()), value.clone());
            }
            _ => {}
        }
    }
}
