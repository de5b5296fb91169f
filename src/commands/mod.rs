//! Command implementations behind the `roster` binary
//!
//! Every command reads its inputs from files, runs one library operation and
//! prints the serialized result to the given writer.
//!
//! - `check_cset`: validate and normalize a change-set file
//! - `apply`: apply a change-set to a roster and re-mark it
//! - `diff`: derive the change-set between two rosters
//! - `merge`: merge two rosters and report conflicts

pub mod apply;
pub mod check_cset;
pub mod diff;
pub mod merge;

use crate::artifacts::core::hex_id::RevisionId;
use crate::artifacts::roster::format::read_roster;
use crate::artifacts::roster::marking::MarkingMap;
use crate::artifacts::roster::roster::Roster;
use anyhow::Context;
use std::path::Path;

pub(crate) fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub(crate) fn load_roster(path: &Path) -> anyhow::Result<(Roster, MarkingMap)> {
    let input = read_input(path)?;
    read_roster(&input).with_context(|| format!("invalid roster in {}", path.display()))
}

/// Parse a revision id given on the command line
pub fn parse_revision(raw: &str) -> anyhow::Result<RevisionId> {
    RevisionId::try_parse(raw)
}
