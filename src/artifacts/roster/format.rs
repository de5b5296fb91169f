//! Textual roster format
//!
//! A roster is written together with its markings, one stanza per attached
//! node in depth-first path order:
//!
//! ```text
//!         file "src/main"
//!      content [f572d396fae9206628714fb2ce00f72e94f2258f]
//!        ident "3"
//!         attr "exec" "yes"
//! dormant_attr "mime"
//!        birth [0101010101010101010101010101010101010101]
//!    path_mark [0101010101010101010101010101010101010101]
//! content_mark [0202020202020202020202020202020202020202]
//!    attr_mark "exec" [0101010101010101010101010101010101010101]
//!    attr_mark "mime" [0202020202020202020202020202020202020202]
//! ```
//!
//! Directories use `dir` and carry no `content` or `content_mark` lines.
//! Reading rebuilds the roster node by node and then checks it against the
//! markings it was stored with.

use crate::artifacts::basic_io::parser::Parser;
use crate::artifacts::basic_io::printer::{Printer, Stanza};
use crate::artifacts::core::attr::{AttrKey, AttrState, AttrValue};
use crate::artifacts::core::file_path::FilePath;
use crate::artifacts::core::hex_id::{ContentId, RevisionId};
use crate::artifacts::core::node_id::NodeId;
use crate::artifacts::roster::marking::{Marking, MarkingMap, RevisionSet};
use crate::artifacts::roster::roster::Roster;
use crate::error::{ParseError, ReadError, Result, StructuralError};
use std::collections::BTreeMap;

const DIR: &str = "dir";
const FILE: &str = "file";
const CONTENT: &str = "content";
const IDENT: &str = "ident";
const ATTR: &str = "attr";
const DORMANT_ATTR: &str = "dormant_attr";
const BIRTH: &str = "birth";
const PATH_MARK: &str = "path_mark";
const CONTENT_MARK: &str = "content_mark";
const ATTR_MARK: &str = "attr_mark";

pub fn write_roster(roster: &Roster, markings: &MarkingMap) -> Result<String> {
    let mut printer = Printer::new();

    for (path, nid) in roster.walk() {
        let node = roster.node(nid)?;
        let marking = markings
            .get(&nid)
            .ok_or(StructuralError::MissingMarking(nid))?;

        let mut st = Stanza::new();
        match node.content() {
            Some(content) if node.is_file() => {
                st.push_file_pair(FILE, &path)
                    .push_hex_pair(CONTENT, content.as_ref());
            }
            None if node.is_file() => {
                return Err(StructuralError::Insane(format!("file {} has no content", nid)));
            }
            _ => {
                st.push_file_pair(DIR, &path);
            }
        }
        st.push_str_pair(IDENT, &nid.to_string());

        for (key, state) in node.attrs() {
            match state {
                AttrState::Set(value) => st.push_str_triple(ATTR, key.as_ref(), value.as_ref()),
                AttrState::Cleared => st.push_str_pair(DORMANT_ATTR, key.as_ref()),
            };
        }

        st.push_hex_pair(BIRTH, marking.birth_revision.as_ref());
        for rid in &marking.parent_name {
            st.push_hex_pair(PATH_MARK, rid.as_ref());
        }
        for rid in &marking.file_content {
            st.push_hex_pair(CONTENT_MARK, rid.as_ref());
        }
        for (key, marks) in &marking.attrs {
            for rid in marks {
                st.push_str_hex_triple(ATTR_MARK, key.as_ref(), rid.as_ref());
            }
        }

        printer.print_stanza(&st);
    }

    Ok(printer.finish())
}

/// One node stanza, before it is placed into a roster
struct NodeStanza {
    path: FilePath,
    nid: NodeId,
    content: Option<ContentId>,
    is_dir: bool,
    attrs: Vec<(AttrKey, AttrState)>,
    marking: Marking,
}

fn revision(parser: &mut Parser) -> std::result::Result<RevisionId, ParseError> {
    parser.hex_as(|raw| RevisionId::try_parse(raw))
}

fn read_marks(parser: &mut Parser, key: &str) -> std::result::Result<RevisionSet, ParseError> {
    let mut marks = RevisionSet::new();
    while parser.is_symbol(key) {
        parser.expect_symbol(key)?;
        if !marks.insert(revision(parser)?) {
            return Err(parser.error(format!("duplicate '{}' revision", key)));
        }
    }
    Ok(marks)
}

fn read_node_stanza(parser: &mut Parser) -> std::result::Result<NodeStanza, ParseError> {
    let is_dir = parser.is_symbol(DIR);
    if is_dir {
        parser.expect_symbol(DIR)?;
    } else {
        parser.expect_symbol(FILE)?;
    }
    let path = parser.string_as(FilePath::try_parse)?;

    let content = if is_dir {
        None
    } else {
        parser.expect_symbol(CONTENT)?;
        Some(parser.hex_as(|raw| ContentId::try_parse(raw))?)
    };

    parser.expect_symbol(IDENT)?;
    let nid = parser.string_as(|raw| Ok(NodeId::new(raw.parse::<u64>()?)))?;

    let mut attrs = Vec::<(AttrKey, AttrState)>::new();
    loop {
        let (key, state) = if parser.is_symbol(ATTR) {
            parser.expect_symbol(ATTR)?;
            let key = AttrKey::new(parser.string()?);
            (key, AttrState::Set(AttrValue::new(parser.string()?)))
        } else if parser.is_symbol(DORMANT_ATTR) {
            parser.expect_symbol(DORMANT_ATTR)?;
            (AttrKey::new(parser.string()?), AttrState::Cleared)
        } else {
            break;
        };

        if attrs.iter().any(|(seen, _)| *seen == key) {
            return Err(parser.error(format!("duplicate attribute '{}'", key)));
        }
        attrs.push((key, state));
    }

    parser.expect_symbol(BIRTH)?;
    let birth_revision = revision(parser)?;
    let parent_name = read_marks(parser, PATH_MARK)?;
    let file_content = read_marks(parser, CONTENT_MARK)?;

    let mut attr_marks = BTreeMap::<AttrKey, RevisionSet>::new();
    while parser.is_symbol(ATTR_MARK) {
        parser.expect_symbol(ATTR_MARK)?;
        let key = AttrKey::new(parser.string()?);
        let rid = revision(parser)?;
        if !attr_marks.entry(key).or_default().insert(rid) {
            return Err(parser.error("duplicate 'attr_mark' revision"));
        }
    }

    Ok(NodeStanza {
        path,
        nid,
        content,
        is_dir,
        attrs,
        marking: Marking {
            birth_revision,
            parent_name,
            file_content,
            attrs: attr_marks,
        },
    })
}

/// Rebuild a roster and its markings, validating the pair
pub fn read_roster(input: &str) -> std::result::Result<(Roster, MarkingMap), ReadError> {
    let mut parser = Parser::new(input)?;
    let mut roster = Roster::new();
    let mut markings = MarkingMap::new();

    while !parser.is_at_end() {
        let stanza = read_node_stanza(&mut parser)?;
        let nid = stanza.nid;

        if stanza.is_dir {
            roster.create_dir_node_with_id(nid)?;
        } else {
            roster.create_file_node_with_id(nid, stanza.content)?;
        }
        roster.attach_node(nid, &stanza.path)?;
        for (key, state) in stanza.attrs {
            roster.set_attr_state(nid, key, state)?;
        }
        markings.insert(nid, stanza.marking);
    }

    roster.commit_edits();
    roster.check_sane_against(&markings)?;
    tracing::debug!(nodes = roster.len(), "read roster");

    Ok((roster, markings))
}
