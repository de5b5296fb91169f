//! Stateful stores
//!
//! - `history`: revisions held in memory, driving commit and merge

pub mod history;
