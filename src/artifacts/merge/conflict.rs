use crate::artifacts::core::attr::{AttrKey, AttrState};
use crate::artifacts::core::hex_id::ContentId;
use crate::artifacts::core::node_id::NodeId;
use crate::artifacts::roster::node::Attachment;
use std::fmt;

#[derive(Debug)]
pub struct ConflictMessage {
    pub header: &'static str,
    pub footer: &'static str,
}

impl From<ConflictKind> for ConflictMessage {
    fn from(value: ConflictKind) -> Self {
        match value {
            ConflictKind::NodeName => Self {
                header: "The following nodes were renamed differently on each side:",
                footer: "Pick one location for each node and merge again.",
            },
            ConflictKind::FileContent => Self {
                header: "The following files were edited differently on each side:",
                footer: "Their contents need a textual merge.",
            },
            ConflictKind::NodeAttr => Self {
                header: "The following attributes were changed differently on each side:",
                footer: "Pick one value for each attribute and merge again.",
            },
            ConflictKind::OrphanedNode => Self {
                header: "The following nodes would live in a directory deleted on the other side:",
                footer: "Move them elsewhere or restore the directory.",
            },
            ConflictKind::RenameTarget => Self {
                header: "The following locations were claimed by two different nodes:",
                footer: "Rename one of each pair and merge again.",
            },
            ConflictKind::DirectoryLoop => Self {
                header: "The following directories would end up inside themselves:",
                footer: "Undo one of the renames involved.",
            },
            ConflictKind::IllegalName => Self {
                header: "The following nodes would take a reserved name:",
                footer: "Rename them before merging.",
            },
            ConflictKind::MissingRoot => Self {
                header: "The merged tree would have no root directory.",
                footer: "Restore the root on one side and merge again.",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConflictKind {
    NodeName,
    FileContent,
    NodeAttr,
    OrphanedNode,
    RenameTarget,
    DirectoryLoop,
    IllegalName,
    MissingRoot,
}

impl ConflictKind {
    pub const ALL: [ConflictKind; 8] = [
        ConflictKind::NodeName,
        ConflictKind::FileContent,
        ConflictKind::NodeAttr,
        ConflictKind::OrphanedNode,
        ConflictKind::RenameTarget,
        ConflictKind::DirectoryLoop,
        ConflictKind::IllegalName,
        ConflictKind::MissingRoot,
    ];
}

/// One unresolved problem found while merging
///
/// Node ids refer to the merged roster, where conflicted nodes are left
/// detached (or, for content conflicts, without content).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Conflict {
    NodeName {
        nid: NodeId,
        left: Attachment,
        right: Attachment,
    },
    FileContent {
        nid: NodeId,
        left: ContentId,
        right: ContentId,
    },
    NodeAttr {
        nid: NodeId,
        key: AttrKey,
        left: AttrState,
        right: AttrState,
    },
    OrphanedNode {
        nid: NodeId,
        location: Attachment,
    },
    RenameTarget {
        left: NodeId,
        right: NodeId,
        location: Attachment,
    },
    DirectoryLoop {
        nid: NodeId,
        location: Attachment,
    },
    IllegalName {
        nid: NodeId,
        location: Attachment,
    },
    MissingRoot,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        match self {
            Conflict::NodeName { .. } => ConflictKind::NodeName,
            Conflict::FileContent { .. } => ConflictKind::FileContent,
            Conflict::NodeAttr { .. } => ConflictKind::NodeAttr,
            Conflict::OrphanedNode { .. } => ConflictKind::OrphanedNode,
            Conflict::RenameTarget { .. } => ConflictKind::RenameTarget,
            Conflict::DirectoryLoop { .. } => ConflictKind::DirectoryLoop,
            Conflict::IllegalName { .. } => ConflictKind::IllegalName,
            Conflict::MissingRoot => ConflictKind::MissingRoot,
        }
    }

    /// The same conflict as seen from a merge with its inputs exchanged
    pub fn swapped(&self) -> Self {
        match self.clone() {
            Conflict::NodeName { nid, left, right } => Conflict::NodeName {
                nid,
                left: right,
                right: left,
            },
            Conflict::FileContent { nid, left, right } => Conflict::FileContent {
                nid,
                left: right,
                right: left,
            },
            Conflict::NodeAttr {
                nid,
                key,
                left,
                right,
            } => Conflict::NodeAttr {
                nid,
                key,
                left: right,
                right: left,
            },
            Conflict::RenameTarget {
                left,
                right,
                location,
            } => Conflict::RenameTarget {
                left: right,
                right: left,
                location,
            },
            other => other,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::NodeName { nid, left, right } => {
                write!(f, "node {}: left {}, right {}", nid, left, right)
            }
            Conflict::FileContent { nid, left, right } => write!(
                f,
                "file {}: left {}, right {}",
                nid,
                left.to_short_id(),
                right.to_short_id()
            ),
            Conflict::NodeAttr {
                nid,
                key,
                left,
                right,
            } => write!(f, "node {} attr '{}': left {}, right {}", nid, key, left, right),
            Conflict::OrphanedNode { nid, location } => {
                write!(f, "node {}: parent of {} is gone", nid, location)
            }
            Conflict::RenameTarget {
                left,
                right,
                location,
            } => write!(f, "{}: left node {}, right node {}", location, left, right),
            Conflict::DirectoryLoop { nid, location } => {
                write!(f, "node {}: {} is inside it", nid, location)
            }
            Conflict::IllegalName { nid, location } => write!(f, "node {}: {}", nid, location),
            Conflict::MissingRoot => write!(f, "no root directory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::core::file_path::PathComponent;
    use pretty_assertions::assert_eq;

    fn at(parent: u64, name: &str) -> Attachment {
        Attachment::child(NodeId::new(parent), PathComponent::try_parse(name).unwrap())
    }

    #[test]
    fn swapping_exchanges_sides_only() {
        let conflict = Conflict::RenameTarget {
            left: NodeId::new(4),
            right: NodeId::new(7),
            location: at(1, "x"),
        };

        let swapped = conflict.swapped();

        assert_eq!(
            swapped,
            Conflict::RenameTarget {
                left: NodeId::new(7),
                right: NodeId::new(4),
                location: at(1, "x"),
            }
        );
        assert_eq!(swapped.swapped(), conflict);
    }

    #[test]
    fn sideless_conflicts_are_their_own_swap() {
        let orphan = Conflict::OrphanedNode {
            nid: NodeId::new(3),
            location: at(2, "f"),
        };

        assert_eq!(orphan.swapped(), orphan);
        assert_eq!(Conflict::MissingRoot.swapped(), Conflict::MissingRoot);
    }

    #[test]
    fn every_kind_has_a_message() {
        for kind in ConflictKind::ALL {
            let message = ConflictMessage::from(kind);
            assert!(!message.header.is_empty());
        }
        assert_eq!(
            Conflict::NodeName {
                nid: NodeId::new(5),
                left: at(1, "a"),
                right: Attachment::Root,
            }
            .to_string(),
            "node 5: left 1/a, right <root>"
        );
    }
}
