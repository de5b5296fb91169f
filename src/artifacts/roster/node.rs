use crate::artifacts::core::attr::AttrMap;
use crate::artifacts::core::file_path::PathComponent;
use crate::artifacts::core::hex_id::ContentId;
use crate::artifacts::core::node_id::NodeId;
use std::collections::BTreeMap;
use std::fmt;

/// Where a node hangs in the tree
///
/// This is the "name" scalar of a node: renames change it, merges
/// reconcile it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attachment {
    Root,
    Child { parent: NodeId, name: PathComponent },
}

impl Attachment {
    pub fn child(parent: NodeId, name: PathComponent) -> Self {
        Attachment::Child { parent, name }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Attachment::Root => None,
            Attachment::Child { parent, .. } => Some(*parent),
        }
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attachment::Root => write!(f, "<root>"),
            Attachment::Child { parent, name } => write!(f, "{}/{}", parent, name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Dir {
        children: BTreeMap<PathComponent, NodeId>,
    },
    /// `None` content marks an unresolved content conflict
    File { content: Option<ContentId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) attachment: Option<Attachment>,
    pub(crate) attrs: AttrMap,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new_dir(id: NodeId) -> Self {
        Self {
            id,
            attachment: None,
            attrs: AttrMap::new(),
            kind: NodeKind::Dir {
                children: BTreeMap::new(),
            },
        }
    }

    pub(crate) fn new_file(id: NodeId, content: Option<ContentId>) -> Self {
        Self {
            id,
            attachment: None,
            attrs: AttrMap::new(),
            kind: NodeKind::File { content },
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// `None` while the node is detached
    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn attrs(&self) -> &AttrMap {
        &self.attrs
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Dir { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn same_kind(&self, other: &Node) -> bool {
        self.is_dir() == other.is_dir()
    }

    /// Content of a file node; `None` for directories and conflicted files
    pub fn content(&self) -> Option<&ContentId> {
        match &self.kind {
            NodeKind::File { content } => content.as_ref(),
            NodeKind::Dir { .. } => None,
        }
    }

    /// Children of a directory node; empty for files
    pub fn children(&self) -> impl Iterator<Item = (&PathComponent, NodeId)> {
        let children = match &self.kind {
            NodeKind::Dir { children } => Some(children),
            NodeKind::File { .. } => None,
        };
        children
            .into_iter()
            .flat_map(|children| children.iter().map(|(name, nid)| (name, *nid)))
    }

    pub fn has_children(&self) -> bool {
        self.children().next().is_some()
    }

    pub fn child(&self, name: &PathComponent) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Dir { children } => children.get(name).copied(),
            NodeKind::File { .. } => None,
        }
    }
}
