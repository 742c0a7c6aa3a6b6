//! Responsive image varieties.
//!
//! Pages ship their images as placeholder elements (by default
//! `<noscript data-url=".." data-alt="..">`). The engine picks a named variety
//! from the viewport width, derives the variety's URL from the original one,
//! renders an output node for every placeholder and keeps those outputs in
//! sync when the viewport is resized.
//!
//! See [`VarietyEngine`] for an end to end example.

pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod events;
pub mod render;
pub mod rules;
pub mod scanner;
pub mod variety;
pub mod viewport;

pub use config::EngineConfig;
pub use document::{DocumentHost, MemoryDocument};
pub use engine::*;
pub use errors::EngineError;
pub use events::{EngineEvent, ViewportEvent};
pub use viewport::Viewport;
