use crate::document::{DocumentHost, ElementSpec, NodeId, SourceQuery};
use crate::events::ViewportEvent;
use crate::viewport::Viewport;
use anyhow::{anyhow, bail, Result};
use std::collections::{HashMap, HashSet};
use tokio::sync::broadcast;

pub(crate) const VIEWPORT_CHANNEL_CAPACITY: usize = 64;

/// Element stored in a [`MemoryDocument`].
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub tag_name: String,
    pub attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl MemoryNode {
    fn new(spec: ElementSpec, parent: Option<NodeId>) -> Self {
        Self {
            tag_name: spec.tag_name.to_ascii_lowercase(),
            attributes: spec.attributes,
            parent,
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|c| c.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Number of mutations made through the [`DocumentHost`] interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStats {
    pub inserted: usize,
    pub removed: usize,
}

/// In‑memory element tree (`<html><body>…</body></html>`). Used as a default when
/// no real document is available.
pub struct MemoryDocument {
    nodes: HashMap<NodeId, MemoryNode>,
    root: NodeId,
    body: NodeId,
    viewport: Viewport,
    viewport_tx: broadcast::Sender<ViewportEvent>,
    stats: MutationStats,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("nodes", &self.nodes.len())
            .field("viewport", &self.viewport)
            .field("stats", &self.stats)
            .finish()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::with_viewport(Viewport::default())
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        let root = NodeId::new();
        let body = NodeId::new();

        let mut html = MemoryNode::new(ElementSpec::new("html"), None);
        html.children.push(body);

        let mut nodes = HashMap::new();
        nodes.insert(root, html);
        nodes.insert(body, MemoryNode::new(ElementSpec::new("body"), Some(root)));

        let (viewport_tx, _) = broadcast::channel(VIEWPORT_CHANNEL_CAPACITY);

        Self {
            nodes,
            root,
            body,
            viewport,
            viewport_tx,
            stats: MutationStats::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.get(&id).map(|n| n.children.clone()).unwrap_or_default()
    }

    pub fn stats(&self) -> MutationStats {
        self.stats
    }

    /// Appends a new element as the last child of `parent`. Not counted in [`MutationStats`].
    pub fn append_element(&mut self, parent: NodeId, spec: ElementSpec) -> Result<NodeId> {
        let id = NodeId::new();
        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or_else(|| anyhow!("parent node {parent} does not exist"))?;
        parent_node.children.push(id);

        self.nodes.insert(id, MemoryNode::new(spec, Some(parent)));
        Ok(id)
    }

    /// All nodes in document (pre-)order, starting with the root.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.collect_subtree(self.root, &mut out);
        out
    }

    /// Elements carrying `class`, in document order.
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|id| self.nodes.get(id).map(|n| n.has_class(class)).unwrap_or(false))
            .collect()
    }

    /// Resizes the viewport and notifies subscribers.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport.resize(width, height);
        // No subscribers is fine
        let _ = self.viewport_tx.send(ViewportEvent::Resize { width, height });
    }

    /// Notifies subscribers of a scroll. The viewport size does not change.
    pub fn scroll(&mut self, dx: f32, dy: f32) {
        let _ = self.viewport_tx.send(ViewportEvent::Scroll { dx, dy });
    }

    /// Serializes the body subtree. Attribute values are escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(self.body, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };

        out.push('<');
        out.push_str(&node.tag_name);
        for (name, value) in &node.attributes {
            out.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
        }
        out.push('>');
        for child in &node.children {
            self.write_html(*child, out);
        }
        if node.tag_name != "img" {
            out.push_str(&format!("</{}>", node.tag_name));
        }
    }

    fn collect_subtree(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(&id) {
            out.push(id);
            for child in &node.children {
                self.collect_subtree(*child, out);
            }
        }
    }

    fn matches_selector(&self, id: NodeId, selector: &str) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };

        match selector.strip_prefix('#') {
            Some(wanted) => node.attribute("id") == Some(wanted),
            None => node.tag_name.eq_ignore_ascii_case(selector),
        }
    }

    fn drop_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.drop_subtree(child);
            }
        }
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl DocumentHost for MemoryDocument {
    fn query(&self, query: &SourceQuery) -> Result<Vec<NodeId>> {
        let selector = query.root.trim();
        if selector.is_empty() || selector == "#" {
            bail!("invalid root selector '{}'", query.root);
        }

        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for root in self.document_order() {
            if !self.matches_selector(root, selector) {
                continue;
            }

            let mut subtree = Vec::new();
            self.collect_subtree(root, &mut subtree);

            // Descendants only
            for id in subtree.into_iter().skip(1) {
                let Some(node) = self.nodes.get(&id) else {
                    continue;
                };
                if node.tag_name.eq_ignore_ascii_case(&query.tag_name)
                    && node.attribute(&query.attribute).is_some()
                    && seen.insert(id)
                {
                    found.push(id);
                }
            }
        }

        Ok(found)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.get(&node)?.attribute(name).map(str::to_string)
    }

    fn insert_before(&mut self, reference: NodeId, element: ElementSpec) -> Result<NodeId> {
        let parent = self
            .nodes
            .get(&reference)
            .ok_or_else(|| anyhow!("reference node {reference} does not exist"))?
            .parent
            .ok_or_else(|| anyhow!("cannot insert before the document root"))?;

        let id = NodeId::new();
        let siblings = &mut self
            .nodes
            .get_mut(&parent)
            .ok_or_else(|| anyhow!("parent node {parent} does not exist"))?
            .children;
        let pos = siblings.iter().position(|c| *c == reference).unwrap_or(siblings.len());
        siblings.insert(pos, id);

        self.nodes.insert(id, MemoryNode::new(element, Some(parent)));
        self.stats.inserted += 1;
        Ok(id)
    }

    fn remove(&mut self, node: NodeId) -> Result<()> {
        if node == self.root {
            bail!("cannot remove the document root");
        }

        let parent = self
            .nodes
            .get(&node)
            .ok_or_else(|| anyhow!("node {node} is not attached"))?
            .parent;

        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }
        self.drop_subtree(node);
        self.stats.removed += 1;
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn subscribe_viewport(&self) -> Option<broadcast::Receiver<ViewportEvent>> {
        Some(self.viewport_tx.subscribe())
    }
}
