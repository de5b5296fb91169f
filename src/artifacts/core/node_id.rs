//! Node identities
//!
//! Every node of a roster is addressed by a [`NodeId`]. Ids are handed out by
//! a [`NodeIdSource`] and are never reused while the node is alive.
//!
//! Two ranges exist:
//!
//! - permanent ids, starting at 1, assigned to nodes that belong to a
//!   committed revision;
//! - temporary ids, starting at [`FIRST_TEMP_NODE`], assigned to nodes that
//!   only exist inside an edit session (for instance a workspace that has not
//!   been committed yet).

use std::fmt;

/// First id of the temporary range
pub const FIRST_TEMP_NODE: u64 = 1 << 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_temp(&self) -> bool {
        self.0 >= FIRST_TEMP_NODE
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Supplier of fresh node ids
pub trait NodeIdSource {
    fn next_id(&mut self) -> NodeId;
}

/// Hands out consecutive permanent ids
#[derive(Debug, Clone)]
pub struct SequentialNodeIds {
    next: u64,
}

impl SequentialNodeIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// A source whose ids do not collide with any node of the given rosters
    pub fn after<'r>(rosters: impl IntoIterator<Item = &'r crate::artifacts::roster::roster::Roster>) -> Self {
        let highest = rosters
            .into_iter()
            .filter_map(|roster| {
                roster
                    .node_ids()
                    .filter(|nid| !nid.is_temp())
                    .max()
            })
            .max()
            .map(|nid| nid.value())
            .unwrap_or(0);

        Self::starting_at(highest + 1)
    }
}

impl Default for SequentialNodeIds {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeIdSource for SequentialNodeIds {
    fn next_id(&mut self) -> NodeId {
        let nid = NodeId(self.next);
        self.next += 1;
        nid
    }
}

/// Hands out ids from the temporary range
#[derive(Debug, Clone)]
pub struct TempNodeIds {
    next: u64,
}

impl TempNodeIds {
    pub fn new() -> Self {
        Self {
            next: FIRST_TEMP_NODE,
        }
    }
}

impl Default for TempNodeIds {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeIdSource for TempNodeIds {
    fn next_id(&mut self) -> NodeId {
        let nid = NodeId(self.next);
        self.next += 1;
        nid
    }
}
