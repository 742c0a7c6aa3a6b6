//! Document host boundary.
//!
//! The engine never touches a concrete document. Everything it needs (finding
//! source elements, reading attributes, inserting and removing nodes, reading
//! the viewport and listening for viewport changes) goes through the
//! [`DocumentHost`] trait. Nodes are referred to by opaque [`NodeId`]s issued
//! by the host.
//!
//! [`MemoryDocument`] is an in-memory host, used as the default for tests,
//! demos and headless callers.

pub mod memory;

pub use memory::MemoryDocument;

use crate::events::ViewportEvent;
use crate::viewport::Viewport;
use anyhow::Result;
use std::fmt::Display;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Opaque reference to a node in a host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a new unique `NodeId` using a random UUID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for NodeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which elements a scan is interested in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    /// Tag name of the source elements (matched case-insensitively)
    pub tag_name: String,
    /// Attribute the element must carry
    pub attribute: String,
    /// Selector of the subtree(s) the scan is restricted to
    pub root: String,
}

/// A new element to be inserted by a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    pub tag_name: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementSpec {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Document operations consumed by the engine.
pub trait DocumentHost: Send {
    /// Returns all elements matching `query`, in document order.
    fn query(&self, query: &SourceQuery) -> Result<Vec<NodeId>>;

    /// Reads an attribute of `node`. `None` if either does not exist.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Inserts a new element directly before `reference` and returns its id.
    fn insert_before(&mut self, reference: NodeId, element: ElementSpec) -> Result<NodeId>;

    /// Removes `node` (and its subtree) from the document.
    fn remove(&mut self, node: NodeId) -> Result<()>;

    /// Current viewport of the document.
    fn viewport(&self) -> Viewport;

    /// Subscribes to viewport changes. Hosts without notifications return `None`.
    fn subscribe_viewport(&self) -> Option<broadcast::Receiver<ViewportEvent>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        assert_ne!(NodeId::new(), NodeId::new());
        let uuid = Uuid::new_v4();
        assert_eq!(NodeId::from(uuid).to_string(), uuid.to_string());
    }

    #[test]
    fn element_spec_attribute_lookup_ignores_case() {
        let el = ElementSpec::new("img").attr("SRC", "/a.jpg").attr("alt", "");
        assert_eq!(el.attribute("src"), Some("/a.jpg"));
        assert_eq!(el.attribute("alt"), Some(""));
        assert_eq!(el.attribute("class"), None);
    }
}
