use crate::artifacts::core::hex_id::RevisionId;
use crate::artifacts::core::node_id::SequentialNodeIds;
use crate::artifacts::cset::format::read_cset;
use crate::artifacts::roster::format::write_roster;
use crate::artifacts::roster::marking::mark_roster_with_one_parent;
use crate::artifacts::roster::roster::Roster;
use crate::commands::{load_roster, read_input};
use anyhow::Context;
use std::io::Write;
use std::path::Path;

/// Apply a change-set to a roster and print the child roster
///
/// The child is marked as revision `rid` with the input roster as its only
/// parent. New nodes are numbered from `first_node_id`, or right above the
/// highest id of the input when none is given. Branches applied separately
/// to one roster must use disjoint ranges, or their new nodes share ids and
/// cannot be merged.
pub fn apply(
    roster_path: &Path,
    cset_path: &Path,
    rid: &RevisionId,
    first_node_id: Option<u64>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let (parent, parent_markings) = load_roster(roster_path)?;
    let cs = read_cset(&read_input(cset_path)?)
        .with_context(|| format!("invalid change-set in {}", cset_path.display()))?;

    let mut nis = node_ids_for(&parent, first_node_id)
        .with_context(|| format!("cannot number new nodes of {}", roster_path.display()))?;
    let mut child = parent.clone();
    cs.apply_to_roster(&mut child, &mut nis)
        .with_context(|| format!("cannot apply {}", cset_path.display()))?;
    child.check_sane()?;

    let markings = mark_roster_with_one_parent(&parent, &parent_markings, rid, &child)?;
    write!(out, "{}", write_roster(&child, &markings)?)?;
    Ok(())
}

fn node_ids_for(parent: &Roster, first_node_id: Option<u64>) -> anyhow::Result<SequentialNodeIds> {
    let Some(first) = first_node_id else {
        return Ok(SequentialNodeIds::after([parent]));
    };

    if let Some(highest) = parent.node_ids().filter(|nid| !nid.is_temp()).max() {
        if first <= highest.value() {
            anyhow::bail!("node id {} is not above the highest id in use ({})", first, highest);
        }
    }
    Ok(SequentialNodeIds::starting_at(first))
}
