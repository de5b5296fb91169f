//! Roster comparison
//!
//! - `roster_diff`: derive the change-set between two rosters by walking
//!   both node arenas in parallel

pub mod roster_diff;
