//! Event types flowing into and out of the engine.
//!
//! - [`ViewportEvent`]: notifications the document host sends when its
//!   viewport changes. The resize watcher only reacts to [`ViewportEvent::Resize`].
//! - [`EngineEvent`]: events the engine broadcasts after reconciliation passes.

use std::fmt::{Display, Formatter};

/// Viewport changes reported by the document host
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEvent {
    /// The viewport was resized
    Resize {
        /// The new width of the viewport
        width: u32,
        /// The new height of the viewport
        height: u32,
    },
    /// The viewport was scrolled (with delta coordinates)
    Scroll {
        /// The x coordinate of the scroll delta
        dx: f32,
        /// The y coordinate of the scroll delta
        dy: f32,
    },
}

impl ViewportEvent {
    /// Returns true for notifications that may change the selected variety.
    pub fn is_resize(&self) -> bool {
        matches!(self, ViewportEvent::Resize { .. })
    }
}

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The selected variety changed. `None` means no rule matched.
    VarietyChanged {
        previous: Option<String>,
        current: Option<String>,
    },
    /// A pass rendered `outputs` nodes after removing `removed` stale ones
    PassCompleted {
        variety: Option<String>,
        outputs: usize,
        removed: usize,
    },
    /// A pass started by the resize watcher failed
    PassFailed { error: String },
}

impl Display for EngineEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn name(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("<none>")
        }

        match self {
            EngineEvent::VarietyChanged { previous, current } => {
                write!(f, "variety changed: {} -> {}", name(previous), name(current))
            }
            EngineEvent::PassCompleted { variety, outputs, removed } => {
                write!(f, "pass completed: {} ({} rendered, {} removed)", name(variety), outputs, removed)
            }
            EngineEvent::PassFailed { error } => write!(f, "pass failed: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_resize_is_resize() {
        assert!(ViewportEvent::Resize { width: 1, height: 1 }.is_resize());
        assert!(!ViewportEvent::Scroll { dx: 0.0, dy: 3.0 }.is_resize());
    }

    #[test]
    fn display_uses_placeholder_for_unmatched() {
        let ev = EngineEvent::VarietyChanged {
            previous: None,
            current: Some("large".into()),
        };
        assert_eq!(ev.to_string(), "variety changed: <none> -> large");
    }
}
