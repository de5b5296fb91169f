//! Versioned tree model
//!
//! - `node`: file and directory nodes, attachments
//! - `roster`: whole-tree snapshot and its edit primitives
//! - `editable`: the editable-tree protocol driven by change-sets
//! - `marking`: per-scalar ancestry markings
//! - `format`: basic-io serialization of a roster with its markings

pub mod editable;
pub mod format;
pub mod marking;
pub mod node;
pub mod roster;
