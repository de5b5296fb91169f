//! Error types
//!
//! Two failure classes leave this crate as errors:
//!
//! - [`StructuralError`]: an invariant was violated while editing, diffing,
//!   marking or merging trees. These point at a programming error or corrupt
//!   input data and abort the current operation.
//! - [`ParseError`]: serialized input was malformed. These carry the position
//!   of the offending token so callers can report them to a user.
//!
//! Merge conflicts are not errors; they are returned as data inside a
//! [`MergeResult`](crate::artifacts::merge::roster_merge::MergeResult).

use crate::artifacts::core::attr::AttrKey;
use crate::artifacts::core::file_path::{FilePath, PathComponent};
use crate::artifacts::core::hex_id::{ContentId, RevisionId};
use crate::artifacts::core::node_id::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("node id {0} is already in use")]
    NodeIdInUse(NodeId),

    #[error("no node at path '{0}'")]
    PathNotFound(FilePath),

    #[error("path '{0}' is already occupied")]
    PathOccupied(FilePath),

    #[error("directory {parent} already has a child named '{name}'")]
    NameTaken { parent: NodeId, name: PathComponent },

    #[error("the roster already has a root")]
    RootExists,

    #[error("the roster has no root")]
    MissingRoot,

    #[error("node {0} is a file, expected a directory")]
    NotADirectory(NodeId),

    #[error("node {0} is a directory, expected a file")]
    NotAFile(NodeId),

    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),

    #[error("node {0} is not attached")]
    NotAttached(NodeId),

    #[error("node {0} would be reattached at the location it was detached from")]
    ReattachedInPlace(NodeId),

    #[error("attaching node {0} would place a directory inside itself")]
    DirectoryLoop(NodeId),

    #[error("cannot drop node {0}: it still has children")]
    DirectoryNotEmpty(NodeId),

    #[error("content of '{path}' is {actual:?}, delta expects {expected}")]
    ContentMismatch {
        path: FilePath,
        expected: ContentId,
        actual: Option<ContentId>,
    },

    #[error("delta on '{0}' does not change its content")]
    NoOpDelta(FilePath),

    #[error("attribute '{key}' on '{path}' already has that value")]
    AttrUnchanged { path: FilePath, key: AttrKey },

    #[error("attribute '{key}' on '{path}' is not set")]
    AttrNotSet { path: FilePath, key: AttrKey },

    #[error("change-set is not normalized: {0}")]
    NotNormalized(String),

    #[error("path '{0}' is scheduled more than once")]
    DuplicateSchedule(FilePath),

    #[error("roster is insane: {0}")]
    Insane(String),

    #[error("node {0} has no marking")]
    MissingMarking(NodeId),

    #[error("node {nid} is a file on one side and a directory on the other")]
    KindMismatch { nid: NodeId },

    #[error("ancestry input is inconsistent: {0}")]
    InconsistentAncestry(String),

    #[error("both sides win the merge of {scalar} on node {nid}")]
    AmbiguousMerge { nid: NodeId, scalar: &'static str },

    #[error("revision {0} is unknown")]
    UnknownRevision(RevisionId),

    #[error("merge still has {0} unresolved conflicts")]
    UnresolvedConflicts(usize),
}

/// Malformed serialized input, positioned at the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Failure while reading a structure that is parsed and then validated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

pub type Result<T, E = StructuralError> = std::result::Result<T, E>;
