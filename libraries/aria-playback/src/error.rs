//! Error types for playback sessions

use aria_audio::{EngineError, LoadError};
use aria_core::{ExtractionError, PersistenceError};
use thiserror::Error;

/// Session errors
///
/// Load and extraction failures are recoverable: the session returns to a
/// consistent paused/idle state and queues a notification before
/// surfacing them.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A track's source could not be loaded
    #[error("Failed to load track {track_id}: {source}")]
    Load {
        track_id: String,
        #[source]
        source: LoadError,
    },

    /// The backend cannot be used any more and must be rebuilt
    #[error("Playback backend failed: {0}")]
    Backend(#[from] EngineError),

    /// The resolver could not produce a playable URL
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Index out of bounds
    #[error("Index out of bounds: {index} (playlist has {len} tracks)")]
    IndexOutOfBounds { index: usize, len: usize },

    /// No registered backend accepts the source
    #[error("No playback backend handles {0}")]
    NoBackend(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Parameter(#[from] ParameterRangeError),

    /// Demo material could not be rendered
    #[error("Failed to synthesize demo track: {0}")]
    Synthesis(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Session disposed")]
    Disposed,
}

impl SessionError {
    /// Turn a backend failure for `track_id` into the matching session error
    pub fn from_backend(track_id: &str, err: EngineError) -> Self {
        match err {
            EngineError::Load(source) => Self::Load {
                track_id: track_id.to_string(),
                source,
            },
            other => Self::Backend(other),
        }
    }

    /// The session can carry on after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Backend(e) if e.is_fatal()) && !matches!(self, Self::Disposed)
    }
}

/// A parameter outside its structural domain
///
/// Numeric values are clamped instead; only malformed addressing ends up here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParameterRangeError {
    #[error("Band index {0} is not in 0..10")]
    BandIndex(usize),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
