//! Three-way merge of rosters
//!
//! Merges do not look at a common ancestor tree. Instead every scalar of
//! every node is reconciled from the two sides' values, their markings and
//! the set of revisions each side has seen that the other has not.
//!
//! - `scalar`: the per-scalar *-merge rule
//! - `conflict`: the conflict records a merge can produce
//! - `roster_merge`: lifecycle and per-node merge of two rosters
//! - `uncommon_ancestors`: computing each side's uncommon revisions

pub mod conflict;
pub mod roster_merge;
pub mod scalar;
pub mod uncommon_ancestors;

use crate::artifacts::roster::marking::{MarkingMap, RevisionSet};
use crate::artifacts::roster::roster::Roster;
use derive_new::new;

/// Root-level name reserved for workspace bookkeeping
pub const BOOKKEEPING_DIR: &str = "_MTN";

/// One input of a merge
#[derive(Debug, Clone, Copy, new)]
pub struct MergeSide<'a> {
    pub roster: &'a Roster,
    pub markings: &'a MarkingMap,
    /// Revisions this side has seen and the other side has not
    pub uncommon: &'a RevisionSet,
}

/// What to do when both sides of a scalar claim to win
///
/// This cannot happen with consistent ancestry; it signals stale or
/// mismatched uncommon-ancestor sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguityPolicy {
    #[default]
    Fail,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct MergeOptions {
    pub bookkeeping_dir: String,
    pub ambiguous_scalar: AmbiguityPolicy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self::new(BOOKKEEPING_DIR.to_string(), AmbiguityPolicy::default())
    }
}
