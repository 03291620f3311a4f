//! Orchestration errors.

use edge_core::RenderError;
use edge_manifest::ManifestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The renderer could not be constructed.
    #[error("Renderer unavailable: {0}")]
    Unavailable(String),

    /// The application recorded an error on the render context.
    #[error("Application error: {0}")]
    Application(String),

    #[error("Response error: {0}")]
    Http(#[from] http::Error),
}

impl ServerError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}
