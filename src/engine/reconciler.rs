use crate::config::EngineConfig;
use crate::document::{DocumentHost, NodeId};
use crate::errors::EngineError;
use crate::events::EngineEvent;
use crate::render::{default_renderer, RenderRequest, Renderer, RendererRef, DEFAULT_VARIETY};
use crate::rules::VarietyMatch;
use crate::scanner::{Candidate, Scanner};
use crate::variety::variety_url;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// What the previous pass selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Selection {
    /// No pass has rendered yet
    #[default]
    Never,
    /// No rule matched the width
    Unmatched,
    /// The named rule matched
    Variety(String),
}

impl Selection {
    fn from_match(matched: Option<&VarietyMatch<'_>>) -> Self {
        match matched {
            Some(m) => Selection::Variety(m.name.to_string()),
            None => Selection::Unmatched,
        }
    }

    fn name(&self) -> Option<String> {
        match self {
            Selection::Variety(name) => Some(name.clone()),
            _ => None,
        }
    }
}

/// Result of a single reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Passes are disabled by configuration
    Disabled,
    /// The selected variety did not change; the document was left alone
    Unchanged { variety: Option<String> },
    /// Stale outputs were removed and new ones rendered
    Rendered {
        variety: Option<String>,
        outputs: usize,
        removed: usize,
    },
}

/// Owns the document and everything a pass mutates.
pub(crate) struct Reconciler<D> {
    config: Arc<EngineConfig>,
    scanner: Scanner,
    pub(crate) document: D,
    renderers: HashMap<String, Renderer>,
    last: Selection,
    /// Set when a pass failed part way; the next pass renders regardless of `last`
    incomplete: bool,
    outputs: Vec<NodeId>,
    event_tx: broadcast::Sender<EngineEvent>,
}

pub(crate) type SharedReconciler<D> = Arc<Mutex<Reconciler<D>>>;

pub(crate) fn lock<D>(shared: &SharedReconciler<D>) -> Result<MutexGuard<'_, Reconciler<D>>, EngineError> {
    shared.lock().map_err(|_| EngineError::Poisoned)
}

impl<D: DocumentHost> Reconciler<D> {
    pub(crate) fn new(
        config: Arc<EngineConfig>,
        document: D,
        renderers: HashMap<String, Renderer>,
        event_tx: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            scanner: Scanner::new(&config),
            config,
            document,
            renderers,
            last: Selection::Never,
            incomplete: false,
            outputs: Vec::new(),
            event_tx,
        }
    }

    pub(crate) fn register_renderer(&mut self, name: String, renderer: Renderer) {
        self.renderers.insert(name, renderer);
    }

    pub(crate) fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub(crate) fn current_variety(&self) -> Option<String> {
        self.last.name()
    }

    pub(crate) fn scan(&self) -> Result<Vec<Candidate>, EngineError> {
        self.scanner.scan(&self.document)
    }

    /// Runs one scan → match → derive → cleanup → render cycle.
    pub(crate) fn run_pass(&mut self) -> Result<PassOutcome, EngineError> {
        if !self.config.resize {
            log::trace!("Reconciler: passes disabled by configuration");
            return Ok(PassOutcome::Disabled);
        }

        let config = self.config.clone();
        let width = config.width_or(|| self.document.viewport().width_px());
        let matched = config.rules.find_variety(width);
        let selection = Selection::from_match(matched.as_ref());

        if selection == self.last && !config.force && !self.incomplete {
            log::debug!("Reconciler: width {} keeps variety {:?}", width, selection.name());
            return Ok(PassOutcome::Unchanged { variety: selection.name() });
        }

        let previous = std::mem::replace(&mut self.last, selection.clone());
        if previous != selection {
            log::info!("Reconciler: width {} selects variety {:?} (was {:?})", width, selection.name(), previous.name());
            self.emit(EngineEvent::VarietyChanged {
                previous: previous.name(),
                current: selection.name(),
            });
        }

        let removed = self.clear_outputs();

        if let Err(e) = self.render_outputs(&config, matched) {
            // Outputs rendered so far stay tracked and go away with the next pass
            self.incomplete = true;
            log::warn!("Reconciler: pass for variety {:?} failed after {} outputs", selection.name(), self.outputs.len());
            return Err(e);
        }
        self.incomplete = false;

        Ok(self.completed(selection.name(), removed))
    }

    fn render_outputs(&mut self, config: &EngineConfig, matched: Option<VarietyMatch<'_>>) -> Result<(), EngineError> {
        let candidates = self.scan()?;
        if candidates.is_empty() {
            return Ok(());
        }

        let name = matched.map(|m| m.name).unwrap_or(DEFAULT_VARIETY);
        let renderer = self.resolve_renderer(matched.and_then(|m| m.rule.renderer.as_ref()));

        for candidate in &candidates {
            let url = match matched {
                Some(m) => variety_url(&candidate.url, m.name),
                None => candidate.url.clone(),
            };
            let request = RenderRequest {
                candidate,
                url: &url,
                variety: name,
                alt: &candidate.alt,
            };

            let node = renderer(&mut self.document, &request).map_err(|source| EngineError::Render {
                variety: name.to_string(),
                source,
            })?;
            self.outputs.push(node);
        }

        // Only after rendering, so candidate ids stay valid during the loop
        if config.remove_original {
            for candidate in &candidates {
                if let Err(e) = self.document.remove(candidate.node) {
                    log::warn!("Reconciler: cannot remove source {}: {}", candidate.node, e);
                }
            }
        }

        Ok(())
    }

    /// Removes every tracked output. Returns how many were tracked.
    pub(crate) fn clear_outputs(&mut self) -> usize {
        let stale = std::mem::take(&mut self.outputs);
        for node in &stale {
            if let Err(e) = self.document.remove(*node) {
                log::warn!("Reconciler: stale output {} already gone: {}", node, e);
            }
        }
        stale.len()
    }

    /// Drops all outputs and forgets the last selection.
    pub(crate) fn reset(&mut self) -> usize {
        self.last = Selection::Never;
        self.incomplete = false;
        self.clear_outputs()
    }

    fn resolve_renderer(&self, wanted: Option<&RendererRef>) -> Renderer {
        match wanted {
            None => default_renderer(),
            Some(RendererRef::Custom(renderer)) => renderer.clone(),
            Some(RendererRef::Named(name)) => match self.renderers.get(name) {
                Some(renderer) => renderer.clone(),
                None => {
                    log::warn!("Reconciler: no renderer registered as '{}', using default", name);
                    default_renderer()
                }
            },
        }
    }

    fn completed(&self, variety: Option<String>, removed: usize) -> PassOutcome {
        let outputs = self.outputs.len();
        log::debug!("Reconciler: rendered {} outputs, removed {}", outputs, removed);

        self.emit(EngineEvent::PassCompleted {
            variety: variety.clone(),
            outputs,
            removed,
        });
        PassOutcome::Rendered { variety, outputs, removed }
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
