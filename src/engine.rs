//! The variety engine.
//!
//! [`VarietyEngine`] ties the pieces together: it owns a document host, runs
//! reconciliation passes (scan, match, derive, cleanup, render) and, when
//! subscribed, re-runs them after the viewport has stopped resizing for the
//! configured debounce interval.
//!
//! ```
//! use variety_engine::{EngineConfig, MemoryDocument, PassOutcome, VarietyEngine, Viewport};
//! use variety_engine::document::ElementSpec;
//! use variety_engine::rules::WidthRule;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = MemoryDocument::with_viewport(Viewport::new(320, 480));
//! doc.append_element(
//!     doc.body(),
//!     ElementSpec::new("noscript")
//!         .attr("data-url", "/site/__data/assets/image/2020/0101/foo.jpg")
//!         .attr("data-alt", "Foo"),
//! )?;
//!
//! let config = EngineConfig::builder()
//!     .rule("small", WidthRule::range(0.0, 480.0))
//!     .rule("large", WidthRule::range(481.0, 9001.0))
//!     .build()?;
//!
//! // Runs one pass right away
//! let engine = VarietyEngine::new(config, doc)?;
//!
//! let html = engine.with_document(|d| d.to_html())?;
//! assert!(html.contains(r#"src="/site/__data/assets/image/2020/0101/varieties/small.jpg""#));
//! assert!(html.contains(r#"class="variety variety-small""#));
//!
//! // Same width, same variety: nothing to do
//! assert!(matches!(engine.run_pass()?, PassOutcome::Unchanged { .. }));
//! # Ok(()) }
//! ```

mod reconciler;
mod resize;

pub use reconciler::PassOutcome;

use crate::config::EngineConfig;
use crate::document::{DocumentHost, NodeId};
use crate::errors::EngineError;
use crate::events::EngineEvent;
use crate::render::Renderer;
use crate::rules::VarietyMatch;
use crate::scanner::Candidate;
use reconciler::{lock, Reconciler, SharedReconciler};
use resize::ResizeSubscription;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Capacity of the engine event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

pub struct VarietyEngine<D: DocumentHost + 'static> {
    /// Configuration, fixed for the lifetime of the engine.
    config: Arc<EngineConfig>,
    /// Document and pass state, shared with the resize watcher.
    reconciler: SharedReconciler<D>,
    /// Event sender. Subscribe to receive pass events.
    event_tx: broadcast::Sender<EngineEvent>,
    /// Running resize watcher, if subscribed.
    resize: Option<ResizeSubscription>,
}

impl<D: DocumentHost + 'static> std::fmt::Debug for VarietyEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarietyEngine")
            .field("config", &self.config)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

impl<D: DocumentHost + 'static> VarietyEngine<D> {
    /// Create a new engine on top of `document`.
    ///
    /// Subscribes to viewport resizes when `config.resize` is set and a tokio
    /// runtime is available, then runs one pass when `config.run_on_construction`
    /// is set.
    pub fn new(config: EngineConfig, document: D) -> Result<Self, EngineError> {
        Self::with_renderers(config, document, HashMap::new())
    }

    /// Like [`VarietyEngine::new`], with renderers that rules can refer to by name.
    pub fn with_renderers(
        config: EngineConfig,
        document: D,
        renderers: HashMap<String, Renderer>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let config = Arc::new(config);
        let (event_tx, _first_rx) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        let reconciler = Reconciler::new(config.clone(), document, renderers, event_tx.clone());

        let mut engine = Self {
            config,
            reconciler: Arc::new(Mutex::new(reconciler)),
            event_tx,
            resize: None,
        };

        if engine.config.resize {
            match engine.subscribe_to_resize() {
                Ok(()) => {}
                Err(EngineError::NoRuntime) => {
                    log::warn!("VarietyEngine: no tokio runtime, viewport resizes will not be watched");
                }
                Err(EngineError::NoViewportEvents) => {
                    log::debug!("VarietyEngine: document has no viewport notifications");
                }
                Err(e) => return Err(e),
            }
        }

        if engine.config.run_on_construction {
            engine.run_pass()?;
        }

        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one reconciliation pass now.
    pub fn run_pass(&self) -> Result<PassOutcome, EngineError> {
        lock(&self.reconciler)?.run_pass()
    }

    /// Source elements the next pass would render for.
    pub fn scan(&self) -> Result<Vec<Candidate>, EngineError> {
        lock(&self.reconciler)?.scan()
    }

    /// The rule that would be selected for `width`.
    pub fn find_variety(&self, width: f64) -> Option<VarietyMatch<'_>> {
        self.config.rules.find_variety(width)
    }

    /// Variety selected by the last rendering pass. `None` if nothing matched
    /// or nothing has rendered yet.
    pub fn current_variety(&self) -> Result<Option<String>, EngineError> {
        Ok(lock(&self.reconciler)?.current_variety())
    }

    /// Output nodes of the last rendering pass, in candidate order.
    pub fn outputs(&self) -> Result<Vec<NodeId>, EngineError> {
        Ok(lock(&self.reconciler)?.outputs().to_vec())
    }

    /// Makes `renderer` available to rules that name it. Takes effect on the next pass.
    pub fn register_renderer(&self, name: impl Into<String>, renderer: Renderer) -> Result<(), EngineError> {
        lock(&self.reconciler)?.register_renderer(name.into(), renderer);
        Ok(())
    }

    /// Subscribe to pass events. Only events sent from this point on are received.
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Gives `f` access to the document.
    pub fn with_document<R>(&self, f: impl FnOnce(&mut D) -> R) -> Result<R, EngineError> {
        let mut guard = lock(&self.reconciler)?;
        Ok(f(&mut guard.document))
    }

    /// Starts re-running passes after viewport resizes. Replaces an existing subscription.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_to_resize(&mut self) -> Result<(), EngineError> {
        self.unsubscribe_from_resize();

        let events = lock(&self.reconciler)?
            .document
            .subscribe_viewport()
            .ok_or(EngineError::NoViewportEvents)?;

        let subscription = ResizeSubscription::spawn(
            self.reconciler.clone(),
            events,
            self.config.debounce,
            self.event_tx.clone(),
        )?;
        self.resize = Some(subscription);

        log::debug!("VarietyEngine: watching viewport resizes ({:?} debounce)", self.config.debounce);
        Ok(())
    }

    /// Stops watching resizes and drops any pending pass. Safe to call when not subscribed.
    pub fn unsubscribe_from_resize(&mut self) {
        if let Some(subscription) = self.resize.take() {
            subscription.cancel();
            log::debug!("VarietyEngine: stopped watching viewport resizes");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.resize.as_ref().map(|s| !s.is_finished()).unwrap_or(false)
    }

    /// Unsubscribes and removes all outputs. Returns how many outputs were removed.
    ///
    /// A later [`run_pass`](Self::run_pass) renders again even if the width did not change.
    pub fn teardown(&mut self) -> Result<usize, EngineError> {
        self.unsubscribe_from_resize();
        Ok(lock(&self.reconciler)?.reset())
    }
}

impl<D: DocumentHost + 'static> Drop for VarietyEngine<D> {
    fn drop(&mut self) {
        self.unsubscribe_from_resize();
    }
}
