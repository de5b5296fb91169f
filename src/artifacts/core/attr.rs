//! Node attributes
//!
//! Every node carries a map from attribute key to [`AttrState`]. Clearing an
//! attribute keeps its key around as [`AttrState::Cleared`]: a cleared
//! attribute and an absent one merge differently, so the distinction is
//! kept rather than erasing the entry.

use derive_new::new;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, new)]
pub struct AttrKey(String);

impl AsRef<str> for AttrKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AttrKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, new)]
pub struct AttrValue(String);

impl AsRef<str> for AttrValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Whether an attribute is live, and with which value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrState {
    Set(AttrValue),
    Cleared,
}

impl AttrState {
    pub fn is_live(&self) -> bool {
        matches!(self, AttrState::Set(_))
    }

    pub fn value(&self) -> Option<&AttrValue> {
        match self {
            AttrState::Set(value) => Some(value),
            AttrState::Cleared => None,
        }
    }
}

impl fmt::Display for AttrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrState::Set(value) => write!(f, "{:?}", value.as_ref()),
            AttrState::Cleared => write!(f, "<cleared>"),
        }
    }
}

pub type AttrMap = BTreeMap<AttrKey, AttrState>;
