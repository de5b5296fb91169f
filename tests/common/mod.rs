#![allow(dead_code)]

pub mod command;

use roster::artifacts::core::attr::{AttrKey, AttrValue};
use roster::artifacts::core::file_path::FilePath;
use roster::artifacts::core::hex_id::{ContentId, RevisionId};
use roster::artifacts::cset::change_set::ChangeSet;

pub fn path(raw: &str) -> FilePath {
    FilePath::try_parse(raw).expect("valid path")
}

pub fn content(byte: u8) -> ContentId {
    ContentId::try_parse(format!("{:02x}", byte).repeat(20)).expect("valid content id")
}

pub fn rid(byte: u8) -> RevisionId {
    RevisionId::try_parse(format!("{:02x}", byte).repeat(20)).expect("valid revision id")
}

/// Fluent construction of change-sets in tests
#[derive(Debug, Default)]
pub struct CsBuilder {
    cs: ChangeSet,
}

impl CsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(mut self, raw: &str) -> Self {
        self.cs.nodes_deleted.insert(path(raw));
        self
    }

    pub fn rename(mut self, src: &str, dst: &str) -> Self {
        self.cs.nodes_renamed.insert(path(src), path(dst));
        self
    }

    pub fn add_dir(mut self, raw: &str) -> Self {
        self.cs.dirs_added.insert(path(raw));
        self
    }

    pub fn add_file(mut self, raw: &str, byte: u8) -> Self {
        self.cs.files_added.insert(path(raw), content(byte));
        self
    }

    pub fn patch(mut self, raw: &str, from: u8, to: u8) -> Self {
        self.cs
            .deltas_applied
            .insert(path(raw), (content(from), content(to)));
        self
    }

    pub fn clear(mut self, raw: &str, key: &str) -> Self {
        self.cs.attrs_cleared.insert((path(raw), AttrKey::from(key)));
        self
    }

    pub fn set(mut self, raw: &str, key: &str, value: &str) -> Self {
        self.cs
            .attrs_set
            .insert((path(raw), AttrKey::from(key)), AttrValue::from(value));
        self
    }

    pub fn build(self) -> ChangeSet {
        self.cs
    }
}
