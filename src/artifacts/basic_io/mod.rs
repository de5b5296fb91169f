//! Basic-io stanza format
//!
//! A line-oriented text format made of stanzas separated by blank lines.
//! Each line holds a symbol key followed by one or more values:
//!
//! ```text
//! rename "fish"
//!     to "womble"
//!
//! add_file "bar"
//!  content [1234567800000000000000000000000000000000]
//! ```
//!
//! Values are quoted strings (escapes `\"` and `\\`) or bracketed hex. Keys
//! are right-aligned to the widest key of their stanza.

pub mod parser;
pub mod printer;
pub mod tokenizer;
