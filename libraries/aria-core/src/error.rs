/// Errors raised at the collaborator boundaries
use thiserror::Error;

/// The source resolver could not produce a playable stream URL
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The reference is not something the resolver understands
    #[error("Unsupported source reference: {0}")]
    Unsupported(String),

    /// The resolver understood the reference but found nothing playable
    #[error("No playable stream for {0}")]
    NoStream(String),

    /// The resolver itself failed (network, quota, upstream change)
    #[error("Resolver failed for {input}: {reason}")]
    Failed { input: String, reason: String },
}

/// Playlist persistence failed
///
/// Never fatal for playback; callers log and move on.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Remote store rejected or dropped the request
    #[error("Store error: {0}")]
    Store(String),
}

impl PersistenceError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
