use crate::artifacts::core::hex_id::RevisionId;
use crate::artifacts::merge::conflict::{ConflictKind, ConflictMessage};
use crate::artifacts::merge::roster_merge::{MergeResult, merge_rosters};
use crate::artifacts::merge::{MergeOptions, MergeSide};
use crate::artifacts::roster::format::write_roster;
use crate::artifacts::roster::marking::{RevisionSet, mark_merge_roster};
use crate::commands::load_roster;
use colored::Colorize;
use derive_new::new;
use std::io::Write;
use std::path::PathBuf;

/// Inputs of one side of a command-line merge
#[derive(Debug, Clone, new)]
pub struct MergeInput {
    pub roster: PathBuf,
    pub uncommon: Vec<RevisionId>,
}

/// Merge two roster files
///
/// Conflicts are printed grouped by kind. A clean merge given a revision id
/// is printed as a roster marked for that revision. Returns whether the merge
/// was clean.
pub fn merge(
    left: &MergeInput,
    right: &MergeInput,
    revision: Option<&RevisionId>,
    options: &MergeOptions,
    out: &mut dyn Write,
) -> anyhow::Result<bool> {
    let (left_roster, left_markings) = load_roster(&left.roster)?;
    let (right_roster, right_markings) = load_roster(&right.roster)?;
    let left_uncommon = left.uncommon.iter().cloned().collect::<RevisionSet>();
    let right_uncommon = right.uncommon.iter().cloned().collect::<RevisionSet>();

    let left_side = MergeSide::new(&left_roster, &left_markings, &left_uncommon);
    let right_side = MergeSide::new(&right_roster, &right_markings, &right_uncommon);
    let result = merge_rosters(&left_side, &right_side, options)?;

    if !result.is_clean() {
        print_conflicts(&result, out)?;
        return Ok(false);
    }

    match revision {
        Some(rid) => {
            let markings = mark_merge_roster(&left_side, &right_side, rid, result.roster())?;
            write!(out, "{}", write_roster(result.roster(), &markings)?)?;
        }
        None => writeln!(out, "{}", "merge is clean".green())?,
    }

    Ok(true)
}

fn print_conflicts(result: &MergeResult, out: &mut dyn Write) -> anyhow::Result<()> {
    writeln!(
        out,
        "{}",
        format!("merge failed with {} conflicts", result.conflicts().len())
            .red()
            .bold()
    )?;

    for kind in ConflictKind::ALL {
        let mut conflicts = result.conflicts_of(kind).peekable();
        if conflicts.peek().is_none() {
            continue;
        }

        let message = ConflictMessage::from(kind);
        writeln!(out)?;
        writeln!(out, "{}", message.header.yellow())?;
        for conflict in conflicts {
            writeln!(out, "    {}", conflict.to_string().red())?;
        }
        writeln!(out, "{}", message.footer.dimmed())?;
    }

    Ok(())
}
