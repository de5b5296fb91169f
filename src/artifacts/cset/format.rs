//! Textual change-set format
//!
//! One stanza per primitive edit, grouped by kind in a fixed order and sorted
//! by path (or path and attribute key) within each kind:
//!
//! ```text
//! delete "idle"
//!
//! rename "fish"
//!     to "womble"
//!
//! add_dir "foo"
//!
//! add_file "bar"
//!  content [1234567800000000000000000000000000000000]
//!
//! patch "womble"
//!  from [9876543212394657263900000000000000000000]
//!    to [0000000000011111111000000000000000000000]
//!
//! clear "policeman"
//!  attr "yodel"
//!
//!   set "policeman"
//!  attr "axolotyl"
//! value "fruitily"
//! ```
//!
//! The writer always emits this order, so the reader treats any misordered,
//! duplicated or unknown stanza as malformed input.

use crate::artifacts::basic_io::parser::Parser;
use crate::artifacts::basic_io::printer::{Printer, Stanza};
use crate::artifacts::core::attr::{AttrKey, AttrValue};
use crate::artifacts::core::file_path::FilePath;
use crate::artifacts::core::hex_id::ContentId;
use crate::artifacts::cset::change_set::ChangeSet;
use crate::error::ParseError;

const DELETE: &str = "delete";
const RENAME: &str = "rename";
const TO: &str = "to";
const ADD_DIR: &str = "add_dir";
const ADD_FILE: &str = "add_file";
const CONTENT: &str = "content";
const PATCH: &str = "patch";
const FROM: &str = "from";
const CLEAR: &str = "clear";
const SET: &str = "set";
const ATTR: &str = "attr";
const VALUE: &str = "value";

pub fn write_cset(cs: &ChangeSet) -> String {
    let mut printer = Printer::new();

    for path in &cs.nodes_deleted {
        let mut st = Stanza::new();
        st.push_file_pair(DELETE, path);
        printer.print_stanza(&st);
    }

    for (src, dst) in &cs.nodes_renamed {
        let mut st = Stanza::new();
        st.push_file_pair(RENAME, src).push_file_pair(TO, dst);
        printer.print_stanza(&st);
    }

    for path in &cs.dirs_added {
        let mut st = Stanza::new();
        st.push_file_pair(ADD_DIR, path);
        printer.print_stanza(&st);
    }

    for (path, content) in &cs.files_added {
        let mut st = Stanza::new();
        st.push_file_pair(ADD_FILE, path)
            .push_hex_pair(CONTENT, content.as_ref());
        printer.print_stanza(&st);
    }

    for (path, (old, new)) in &cs.deltas_applied {
        let mut st = Stanza::new();
        st.push_file_pair(PATCH, path)
            .push_hex_pair(FROM, old.as_ref())
            .push_hex_pair(TO, new.as_ref());
        printer.print_stanza(&st);
    }

    for (path, key) in &cs.attrs_cleared {
        let mut st = Stanza::new();
        st.push_file_pair(CLEAR, path).push_str_pair(ATTR, key.as_ref());
        printer.print_stanza(&st);
    }

    for ((path, key), value) in &cs.attrs_set {
        let mut st = Stanza::new();
        st.push_file_pair(SET, path)
            .push_str_pair(ATTR, key.as_ref())
            .push_str_pair(VALUE, value.as_ref());
        printer.print_stanza(&st);
    }

    printer.finish()
}

/// Remembers the previous key of a stanza kind to enforce strict ordering
struct Ascending<K> {
    kind: &'static str,
    last: Option<K>,
}

impl<K: Ord + Clone> Ascending<K> {
    fn new(kind: &'static str) -> Self {
        Self { kind, last: None }
    }

    fn check(&mut self, key: &K, at: (usize, usize)) -> Result<(), ParseError> {
        if self.last.as_ref().is_some_and(|last| last >= key) {
            return Err(ParseError::new(
                at.0,
                at.1,
                format!("'{}' stanzas are misordered or duplicated", self.kind),
            ));
        }
        self.last = Some(key.clone());
        Ok(())
    }
}

fn path(parser: &mut Parser) -> Result<FilePath, ParseError> {
    parser.string_as(FilePath::try_parse)
}

fn content(parser: &mut Parser) -> Result<ContentId, ParseError> {
    parser.hex_as(|raw| ContentId::try_parse(raw))
}

fn attr_key(parser: &mut Parser) -> Result<AttrKey, ParseError> {
    parser.string().map(AttrKey::new)
}

pub fn read_cset(input: &str) -> Result<ChangeSet, ParseError> {
    let mut parser = Parser::new(input)?;
    let mut cs = ChangeSet::new();

    let mut order = Ascending::new(DELETE);
    while parser.is_symbol(DELETE) {
        let at = parser.position();
        parser.expect_symbol(DELETE)?;
        let path = path(&mut parser)?;
        order.check(&path, at)?;
        cs.nodes_deleted.insert(path);
    }

    let mut order = Ascending::new(RENAME);
    while parser.is_symbol(RENAME) {
        let at = parser.position();
        parser.expect_symbol(RENAME)?;
        let src = path(&mut parser)?;
        parser.expect_symbol(TO)?;
        let dst = path(&mut parser)?;
        order.check(&src, at)?;
        cs.nodes_renamed.insert(src, dst);
    }

    let mut order = Ascending::new(ADD_DIR);
    while parser.is_symbol(ADD_DIR) {
        let at = parser.position();
        parser.expect_symbol(ADD_DIR)?;
        let path = path(&mut parser)?;
        order.check(&path, at)?;
        cs.dirs_added.insert(path);
    }

    let mut order = Ascending::new(ADD_FILE);
    while parser.is_symbol(ADD_FILE) {
        let at = parser.position();
        parser.expect_symbol(ADD_FILE)?;
        let path = path(&mut parser)?;
        parser.expect_symbol(CONTENT)?;
        let content = content(&mut parser)?;
        order.check(&path, at)?;
        cs.files_added.insert(path, content);
    }

    let mut order = Ascending::new(PATCH);
    while parser.is_symbol(PATCH) {
        let at = parser.position();
        parser.expect_symbol(PATCH)?;
        let path = path(&mut parser)?;
        parser.expect_symbol(FROM)?;
        let old = content(&mut parser)?;
        parser.expect_symbol(TO)?;
        let new = content(&mut parser)?;
        order.check(&path, at)?;
        cs.deltas_applied.insert(path, (old, new));
    }

    let mut order = Ascending::new(CLEAR);
    while parser.is_symbol(CLEAR) {
        let at = parser.position();
        parser.expect_symbol(CLEAR)?;
        let path = path(&mut parser)?;
        parser.expect_symbol(ATTR)?;
        let key = attr_key(&mut parser)?;
        let entry = (path, key);
        order.check(&entry, at)?;
        cs.attrs_cleared.insert(entry);
    }

    let mut order = Ascending::new(SET);
    while parser.is_symbol(SET) {
        let at = parser.position();
        parser.expect_symbol(SET)?;
        let path = path(&mut parser)?;
        parser.expect_symbol(ATTR)?;
        let key = attr_key(&mut parser)?;
        parser.expect_symbol(VALUE)?;
        let value = parser.string().map(AttrValue::new)?;
        let entry = (path, key);
        order.check(&entry, at)?;
        cs.attrs_set.insert(entry, value);
    }

    if !parser.is_at_end() {
        let found = parser.peek_symbol().unwrap_or("a non-symbol token");
        return Err(parser.error(format!("unexpected stanza starting with {}", found)));
    }

    cs.check_normalized()
        .map_err(|err| parser.error(err.to_string()))?;

    Ok(cs)
}
