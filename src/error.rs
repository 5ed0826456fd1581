//! Error taxonomy
//!
//! Almost everything in the engine degrades locally (fallback shapes, skipped
//! frames, rejected spawns). Only the conditions below ever reach the host.

/// Convenience result type used across the engine.
pub type RevealResult<T> = Result<T, RevealError>;

/// Errors surfaced to the host application.
#[derive(thiserror::Error, Debug)]
pub enum RevealError {
    /// No drawing surface could be acquired at construction time.
    #[error("drawing surface unavailable")]
    SurfaceUnavailable,

    /// The surface reported a zero-area size at construction time.
    #[error("invalid surface size {width}x{height}")]
    InvalidSurfaceSize { width: u32, height: u32 },

    /// A configuration patch could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl RevealError {
    /// Build a [`RevealError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<serde_json::Error> for RevealError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(err.to_string())
    }
}
