use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::{FileWriteStr, PathChild};
use roster::areas::history::History;
use roster::artifacts::core::hex_id::RevisionId;
use roster::artifacts::roster::format::write_roster;
use rstest::fixture;
use std::path::PathBuf;

#[fixture]
pub fn work_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

pub fn run_roster_command(dir: &TempDir, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("roster").expect("Failed to find roster binary");
    cmd.current_dir(dir.path()).args(args).env_remove("RUST_LOG");
    cmd
}

pub fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let file = dir.child(name);
    file.write_str(content).expect("Failed to write file");
    file.path().to_path_buf()
}

/// Serialize the roster of a stored revision into `dir`
pub fn write_revision(dir: &TempDir, name: &str, history: &History, rid: &RevisionId) -> PathBuf {
    let revision = history.revision(rid).expect("known revision");
    let text = write_roster(revision.roster(), revision.markings()).expect("writable roster");
    write_file(dir, name, &text)
}
