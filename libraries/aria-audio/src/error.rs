/// Error types for the signal graph engine
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// A source could not be turned into a playing buffer
///
/// Always recoverable: the engine keeps running and the caller may retry
/// with another source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Network failure, missing file, HTTP error status
    #[error("Source unreachable ({location}): {reason}")]
    Unreachable { location: String, reason: String },

    /// Container or codec not recognised
    #[error("Unsupported format: {0}")]
    Unsupported(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    /// Decoding finished without producing a single frame
    #[error("Source contains no audio")]
    Empty,

    #[error("Resampling failed: {0}")]
    Resample(String),

    /// A newer load was started before this one finished
    #[error("Load {generation} was superseded by load {current}")]
    Superseded { generation: u64, current: u64 },
}

impl LoadError {
    pub fn unreachable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unreachable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Graph or render context could not be built; construct a new engine
    #[error("Engine unusable: {0}")]
    Fatal(String),

    #[error("Engine has been disposed")]
    Disposed,

    /// `render` called on a context driven by its own thread
    #[error("Context renders on its own clock")]
    NotManual,

    #[error("Audio sink error: {0}")]
    Sink(String),
}

impl EngineError {
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl From<hound::Error> for EngineError {
    fn from(err: hound::Error) -> Self {
        Self::Sink(err.to_string())
    }
}
