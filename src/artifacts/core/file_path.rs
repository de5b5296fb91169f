//! Paths inside a versioned tree
//!
//! A [`FilePath`] is a sequence of validated [`PathComponent`]s relative to
//! the tree root; the empty sequence names the root itself. Paths order
//! component by component, so a directory always sorts before everything
//! beneath it. The change-set scheduler relies on this to attach parents
//! before children and to detach children before parents.

use crate::artifacts::core::INVALID_COMPONENT_REGEX;
use anyhow::Context;
use std::fmt;

/// A single name inside a directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathComponent(String);

impl PathComponent {
    pub fn try_parse(name: impl Into<String>) -> anyhow::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            anyhow::bail!("path component cannot be empty");
        }
        let re = regex::Regex::new(INVALID_COMPONENT_REGEX)
            .with_context(|| format!("invalid path component regex: {INVALID_COMPONENT_REGEX}"))?;
        if re.is_match(&name) {
            anyhow::bail!("invalid path component: {:?}", name);
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for PathComponent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path from the tree root to a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FilePath(Vec<PathComponent>);

impl FilePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a `/`-separated relative path
    ///
    /// The empty string is the root. Leading, trailing and doubled
    /// separators are rejected, as is every invalid component.
    pub fn try_parse(path: &str) -> anyhow::Result<Self> {
        if path.is_empty() {
            return Ok(Self::root());
        }

        path.split('/')
            .map(PathComponent::try_parse)
            .collect::<anyhow::Result<Vec<_>>>()
            .map(Self)
            .map_err(|err| anyhow::anyhow!("invalid path '{}': {}", path, err))
    }

    pub fn from_components(components: Vec<PathComponent>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of components; the root has depth 0
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn basename(&self) -> Option<&PathComponent> {
        self.0.last()
    }

    pub fn parent(&self) -> Option<FilePath> {
        self.split().map(|(dirname, _)| dirname)
    }

    /// Split into the containing directory and the final component
    pub fn split(&self) -> Option<(FilePath, &PathComponent)> {
        let (basename, dirname) = self.0.split_last()?;
        Some((Self(dirname.to_vec()), basename))
    }

    pub fn join(&self, component: &PathComponent) -> FilePath {
        let mut components = self.0.clone();
        components.push(component.clone());
        Self(components)
    }

    /// Whether `self` is `other` or one of its ancestors
    pub fn is_ancestor_of(&self, other: &FilePath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", component)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for FilePath {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}
