use crate::artifacts::cset::format::write_cset;
use crate::artifacts::diff::roster_diff::make_cset;
use crate::commands::load_roster;
use std::io::Write;
use std::path::Path;

/// Print the change-set turning one roster into another
pub fn diff(from_path: &Path, to_path: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let (from, _) = load_roster(from_path)?;
    let (to, _) = load_roster(to_path)?;

    let cs = make_cset(&from, &to)?;
    write!(out, "{}", write_cset(&cs))?;
    Ok(())
}
