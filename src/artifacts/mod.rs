//! Tree model, change-sets and merge algorithms
//!
//! - `basic_io`: stanza-based text format shared by every serialized form
//! - `core`: identifiers, paths, attributes and lock-step map iteration
//! - `roster`: versioned trees, their edit primitives and markings
//! - `cset`: change-sets, their application and serialization
//! - `diff`: deriving a change-set from two rosters
//! - `merge`: scalar *-merge, roster merge and uncommon ancestors

pub mod basic_io;
pub mod core;
pub mod cset;
pub mod diff;
pub mod merge;
pub mod roster;
