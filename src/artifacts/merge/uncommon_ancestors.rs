//! Uncommon ancestor finder
//!
//! The scalar merge rule needs, for each side of a merge, the revisions that
//! side has seen and the other has not. Those are the side's *uncommon
//! ancestors*: every ancestor of the side's revision (the revision included)
//! that is not also an ancestor of the other side's revision.
//!
//! ## Algorithm
//!
//! A breadth-first walk starts from both revisions at once, each tagged with
//! the side it was reached from. Tags flow from a revision to its parents; a
//! parent is re-queued only when it gains a tag it did not have yet, so every
//! revision is expanded at most twice. Once the walk settles, revisions
//! tagged by one side only are that side's uncommon ancestors.
//!
//! Unlike a best-common-ancestor search there is no early exit: common
//! history must be tagged from both sides all the way down, or revisions
//! behind it would be wrongly reported as uncommon.

use crate::artifacts::core::hex_id::RevisionId;
use crate::artifacts::roster::marking::RevisionSet;
use crate::error::{Result, StructuralError};
use bitflags::bitflags;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    struct VisitState: u8 {
        const NONE = 0b00;
        const VISITED_FROM_LEFT = 0b01;
        const VISITED_FROM_RIGHT = 0b10;
        const VISITED_FROM_BOTH = Self::VISITED_FROM_LEFT.bits() | Self::VISITED_FROM_RIGHT.bits();
    }
}

impl fmt::Debug for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.contains(VisitState::VISITED_FROM_LEFT) {
            flags.push("LEFT");
        }
        if self.contains(VisitState::VISITED_FROM_RIGHT) {
            flags.push("RIGHT");
        }
        if flags.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", flags.join("|"))
        }
    }
}

/// Each side's uncommon ancestors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uncommon {
    pub left: RevisionSet,
    pub right: RevisionSet,
}

/// Finds uncommon ancestors of two revisions
///
/// Parents come from `parents_loader`, so the finder works on any history
/// store; a loader error aborts the search.
pub struct UncommonAncestors<'g, ParentsLoaderFn>
where
    ParentsLoaderFn: Fn(&RevisionId) -> Result<&'g [RevisionId]>,
{
    parents_loader: ParentsLoaderFn,
    _marker: std::marker::PhantomData<&'g ()>,
}

impl<'g, ParentsLoaderFn> UncommonAncestors<'g, ParentsLoaderFn>
where
    ParentsLoaderFn: Fn(&RevisionId) -> Result<&'g [RevisionId]>,
{
    pub fn new(parents_loader: ParentsLoaderFn) -> Self {
        Self {
            parents_loader,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn find(&self, left: &RevisionId, right: &RevisionId) -> Result<Uncommon> {
        let mut uncommon = Uncommon::default();
        let mut common = 0usize;
        for (rid, state) in self.settle(left, right)? {
            if state == VisitState::VISITED_FROM_BOTH {
                common += 1;
            } else if state == VisitState::VISITED_FROM_LEFT {
                uncommon.left.insert(rid);
            } else if state == VisitState::VISITED_FROM_RIGHT {
                uncommon.right.insert(rid);
            }
        }

        tracing::debug!(
            left = uncommon.left.len(),
            right = uncommon.right.len(),
            common,
            "found uncommon ancestors"
        );
        Ok(uncommon)
    }

    /// Tag every ancestor of `left` and `right` with the sides reaching it
    fn settle(&self, left: &RevisionId, right: &RevisionId) -> Result<BTreeMap<RevisionId, VisitState>> {
        let mut states = BTreeMap::<RevisionId, VisitState>::new();
        let mut queue = VecDeque::new();

        states.insert(left.clone(), VisitState::VISITED_FROM_LEFT);
        *states.entry(right.clone()).or_insert(VisitState::NONE) |= VisitState::VISITED_FROM_RIGHT;
        queue.push_back(left.clone());
        queue.push_back(right.clone());

        while let Some(rid) = queue.pop_front() {
            let current_state = states.get(&rid).copied().unwrap_or(VisitState::NONE);
            tracing::trace!(%rid, state = ?current_state, "visiting revision");

            for parent in (self.parents_loader)(&rid)? {
                let parent_state = states.get(parent).copied().unwrap_or(VisitState::NONE);
                if !parent_state.contains(current_state) {
                    states.insert(parent.clone(), parent_state | current_state);
                    queue.push_back(parent.clone());
                }
            }
        }

        Ok(states)
    }
}

/// Revision parentage held in memory
#[derive(Debug, Clone, Default)]
pub struct RevisionGraph {
    parents: BTreeMap<RevisionId, Vec<RevisionId>>,
}

impl RevisionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a revision; its parents must already be known
    pub fn add(&mut self, rid: RevisionId, parents: Vec<RevisionId>) -> Result<()> {
        if let Some(unknown) = parents.iter().find(|p| !self.parents.contains_key(*p)) {
            return Err(StructuralError::UnknownRevision(unknown.clone()));
        }
        self.parents.insert(rid, parents);
        Ok(())
    }

    pub fn contains(&self, rid: &RevisionId) -> bool {
        self.parents.contains_key(rid)
    }

    pub fn parents(&self, rid: &RevisionId) -> Result<&[RevisionId]> {
        self.parents
            .get(rid)
            .map(Vec::as_slice)
            .ok_or_else(|| StructuralError::UnknownRevision(rid.clone()))
    }

    pub fn uncommon_ancestors(&self, left: &RevisionId, right: &RevisionId) -> Result<Uncommon> {
        UncommonAncestors::new(|rid| self.parents(rid)).find(left, right)
    }
}
