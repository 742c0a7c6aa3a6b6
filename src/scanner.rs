//! Source element discovery.

use crate::config::EngineConfig;
use crate::document::{DocumentHost, NodeId, SourceQuery};
use crate::errors::EngineError;

/// A source element the engine renders a variety for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub node: NodeId,
    /// Value of the configured URL attribute
    pub url: String,
    /// Value of the configured alt attribute, empty when absent
    pub alt: String,
}

/// Finds candidates through a [`DocumentHost`].
#[derive(Debug, Clone)]
pub struct Scanner {
    query: SourceQuery,
    alt_attribute: String,
}

impl Scanner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            query: SourceQuery {
                tag_name: config.tag_name.clone(),
                attribute: config.url_attribute.clone(),
                root: config.allowed_root.clone(),
            },
            alt_attribute: config.alt_attribute.clone(),
        }
    }

    /// Candidates in document order. No matches is not an error.
    pub fn scan(&self, document: &dyn DocumentHost) -> Result<Vec<Candidate>, EngineError> {
        let nodes = document.query(&self.query).map_err(EngineError::Document)?;

        let candidates = nodes
            .into_iter()
            .filter_map(|node| {
                let Some(url) = document.attribute(node, &self.query.attribute) else {
                    log::warn!("Scanner: node {} lost its '{}' attribute", node, self.query.attribute);
                    return None;
                };
                let alt = document.attribute(node, &self.alt_attribute).unwrap_or_default();
                Some(Candidate { node, url, alt })
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Scanner: found {} <{}[{}]> in '{}'",
            candidates.len(),
            self.query.tag_name,
            self.query.attribute,
            self.query.root
        );

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ElementSpec, MemoryDocument};

    #[test]
    fn scan_reads_url_and_alt() {
        let mut doc = MemoryDocument::new();
        let body = doc.body();
        let a = doc
            .append_element(
                body,
                ElementSpec::new("noscript").attr("data-url", "/a.jpg").attr("data-alt", "first"),
            )
            .unwrap();
        let b = doc
            .append_element(body, ElementSpec::new("noscript").attr("data-url", "/b.png"))
            .unwrap();

        let scanner = Scanner::new(&EngineConfig::default());
        let found = scanner.scan(&doc).unwrap();

        assert_eq!(
            found,
            vec![
                Candidate { node: a, url: "/a.jpg".into(), alt: "first".into() },
                Candidate { node: b, url: "/b.png".into(), alt: String::new() },
            ]
        );
    }

    #[test]
    fn scan_honours_configured_names() {
        let mut doc = MemoryDocument::new();
        let body = doc.body();
        doc.append_element(body, ElementSpec::new("noscript").attr("data-url", "/a.jpg")).unwrap();
        let span = doc
            .append_element(body, ElementSpec::new("span").attr("data-src", "/b.jpg").attr("title", "b"))
            .unwrap();

        let config = EngineConfig::builder()
            .tag_name("span")
            .url_attribute("data-src")
            .alt_attribute("title")
            .build()
            .unwrap();
        let found = Scanner::new(&config).scan(&doc).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].node, span);
        assert_eq!(found[0].alt, "b");
    }

    #[test]
    fn empty_document_yields_nothing() {
        let doc = MemoryDocument::new();
        let found = Scanner::new(&EngineConfig::default()).scan(&doc).unwrap();
        assert!(found.is_empty());
    }
}
