//! Output rendering.
//!
//! A [`Renderer`] turns one candidate plus its selected variety into a new
//! node in the document and hands the node id back to the engine, which owns
//! it from then on. Rules may carry their own renderer; everything else goes
//! through [`render_default`], which inserts an `<img>` right before the
//! candidate:
//!
//! ```text
//! <img src="{url}" alt="{alt}" class="variety variety-{name}">
//! ```

use crate::document::{DocumentHost, ElementSpec, NodeId};
use crate::scanner::Candidate;
use std::fmt;
use std::sync::Arc;

/// Variety name used when no rule matches the current width.
pub const DEFAULT_VARIETY: &str = "default";

/// Class carried by every rendered variety.
pub const VARIETY_CLASS: &str = "variety";

/// Everything a renderer gets to know about one output.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// The source element the output is rendered for
    pub candidate: &'a Candidate,
    /// Derived (or original, when no rule matched) image URL
    pub url: &'a str,
    /// Selected variety name, or [`DEFAULT_VARIETY`]
    pub variety: &'a str,
    /// Alternative text taken from the candidate
    pub alt: &'a str,
}

/// Renders one output node and returns its id.
pub type Renderer =
    Arc<dyn Fn(&mut dyn DocumentHost, &RenderRequest<'_>) -> anyhow::Result<NodeId> + Send + Sync>;

/// A rule's renderer: either a function value or the name of a registered renderer.
#[derive(Clone)]
pub enum RendererRef {
    Custom(Renderer),
    Named(String),
}

impl fmt::Debug for RendererRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendererRef::Custom(_) => f.write_str("Custom(<fn>)"),
            RendererRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

/// Class attribute value for variety `name`.
pub fn variety_class(name: &str) -> String {
    format!("{VARIETY_CLASS} {VARIETY_CLASS}-{name}")
}

/// Inserts an `<img>` for the request directly before its candidate.
pub fn render_default(document: &mut dyn DocumentHost, request: &RenderRequest<'_>) -> anyhow::Result<NodeId> {
    let element = ElementSpec::new("img")
        .attr("src", request.url)
        .attr("alt", request.alt)
        .attr("class", variety_class(request.variety));

    document.insert_before(request.candidate.node, element)
}

/// [`render_default`] as a [`Renderer`] value.
pub fn default_renderer() -> Renderer {
    Arc::new(render_default)
}

/// Wraps a closure into a [`Renderer`].
pub fn renderer<F>(f: F) -> Renderer
where
    F: Fn(&mut dyn DocumentHost, &RenderRequest<'_>) -> anyhow::Result<NodeId> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    #[test]
    fn default_renderer_inserts_img_before_candidate() {
        let mut doc = MemoryDocument::new();
        let body = doc.body();
        let source = doc
            .append_element(body, ElementSpec::new("noscript").attr("data-url", "/a.jpg"))
            .unwrap();
        let candidate = Candidate {
            node: source,
            url: "/a.jpg".into(),
            alt: "A cat".into(),
        };

        let request = RenderRequest {
            candidate: &candidate,
            url: "/a.jpg/small.jpg",
            variety: "small",
            alt: &candidate.alt,
        };
        let img = default_renderer()(&mut doc, &request).unwrap();

        assert_eq!(doc.children(body), vec![img, source]);
        let node = doc.node(img).unwrap();
        assert_eq!(node.tag_name, "img");
        assert_eq!(node.attribute("src"), Some("/a.jpg/small.jpg"));
        assert_eq!(node.attribute("alt"), Some("A cat"));
        assert_eq!(node.attribute("class"), Some("variety variety-small"));
    }

    #[test]
    fn renderer_ref_debug_hides_closure() {
        let custom = RendererRef::Custom(renderer(render_default));
        assert_eq!(format!("{:?}", custom), "Custom(<fn>)");
        let named = RendererRef::Named("picture".into());
        assert_eq!(format!("{:?}", named), "Named(\"picture\")");
    }
}
