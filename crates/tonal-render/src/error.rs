/// Failure reported by a compositor backend.
#[derive(Debug, thiserror::Error)]
pub enum CompositorError {
    #[error("no source image loaded")]
    NoSource,
    #[error("compositor error: {0}")]
    Backend(String),
}

/// Failure of a single render. The scheduler logs it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Compositor(#[from] CompositorError),
    #[error("render task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for RenderError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_panic() {
            Self::Task("render panicked".to_string())
        } else {
            Self::Task("render cancelled".to_string())
        }
    }
}
