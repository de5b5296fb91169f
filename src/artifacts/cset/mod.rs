//! Change-sets
//!
//! - `change_set`: the primitive-edit collections and their normalization rules
//! - `apply`: replaying a change-set through an editable tree
//! - `format`: basic-io serialization

pub mod apply;
pub mod change_set;
pub mod format;
