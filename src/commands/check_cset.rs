use crate::artifacts::cset::format::{read_cset, write_cset};
use crate::commands::read_input;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

/// Print the normalized form of a change-set file
pub fn check_cset(path: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let input = read_input(path)?;
    let cs = read_cset(&input).with_context(|| format!("invalid change-set in {}", path.display()))?;

    tracing::debug!(changes = cs.len(), "change-set is well formed");
    write!(out, "{}", write_cset(&cs))?;
    Ok(())
}
