// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the preview pipeline

use std::fmt;

/// Result type alias using PreviewError
pub type PreviewResult<T> = Result<T, PreviewError>;

/// Result type alias for collaborator (backend) calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Top-level pipeline error type
#[derive(Debug, Clone)]
pub enum PreviewError {
    /// Error reported by a GPU or capture collaborator
    Backend(BackendError),
    /// Configuration errors (load/parse)
    Config(String),
}

/// Errors reported by the GPU and capture collaborators
#[derive(Debug, Clone)]
pub enum BackendError {
    /// GPU context creation failed
    ContextCreationFailed(String),
    /// The drawable surface is gone or was never created
    SurfaceUnavailable,
    /// Binding the context/surface on the render thread failed
    MakeCurrentFailed(String),
    /// Presenting the rendered frame failed
    SwapFailed(String),
    /// Texture allocation or binding failed
    TextureCreationFailed(String),
    /// Opening the capture device failed
    CameraOpenFailed(String),
    /// Starting the preview stream into the capture texture failed
    StreamingFailed(String),
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewError::Backend(e) => write!(f, "Backend error: {}", e),
            PreviewError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ContextCreationFailed(msg) => {
                write!(f, "Context creation failed: {}", msg)
            }
            BackendError::SurfaceUnavailable => write!(f, "Drawable surface unavailable"),
            BackendError::MakeCurrentFailed(msg) => write!(f, "Make-current failed: {}", msg),
            BackendError::SwapFailed(msg) => write!(f, "Buffer swap failed: {}", msg),
            BackendError::TextureCreationFailed(msg) => {
                write!(f, "Texture creation failed: {}", msg)
            }
            BackendError::CameraOpenFailed(msg) => write!(f, "Camera open failed: {}", msg),
            BackendError::StreamingFailed(msg) => write!(f, "Preview streaming failed: {}", msg),
        }
    }
}

impl std::error::Error for PreviewError {}
impl std::error::Error for BackendError {}

impl From<BackendError> for PreviewError {
    fn from(e: BackendError) -> Self {
        PreviewError::Backend(e)
    }
}
