use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Document error: {0}")]
    Document(#[source] anyhow::Error),

    #[error("Renderer failed for variety '{variety}': {source}")]
    Render {
        variety: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Engine state lock is poisoned")]
    Poisoned,

    #[error("No tokio runtime available to watch viewport changes")]
    NoRuntime,

    #[error("Document does not provide viewport change notifications")]
    NoViewportEvents,
}
