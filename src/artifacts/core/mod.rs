//! Core identifiers and shared types
//!
//! - `node_id`: node identities and id sources
//! - `hex_id`: content and revision hashes
//! - `file_path`: validated tree paths
//! - `attr`: attribute keys, values and live/cleared state
//! - `parallel`: lock-step iteration over two ordered maps

pub mod attr;
pub mod file_path;
pub mod hex_id;
pub mod node_id;
pub mod parallel;

/// Length of a SHA-1 hash in hexadecimal format
pub const HEX_ID_LENGTH: usize = 40;

pub const INVALID_COMPONENT_REGEX: &str = r"^\.\.?$|[/\x00\n\r]";
