//! Render error taxonomy.

/// Error type for render operations.
///
/// Any error aborts the in-flight render.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Component '{name}' failed: {message}")]
    Component { name: String, message: String },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RenderError {
    /// Failure raised while resolving a component.
    pub fn component(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Component {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
