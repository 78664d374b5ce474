//! Contracts for the collaborators the session talks to
//!
//! Implementations live outside the core (HTTP extraction services, relay
//! endpoints, platform media sessions, remote playlist stores).

use crate::error::{ExtractionError, PersistenceError};
use crate::types::{PlaylistSnapshot, ResolvedSource, SessionMetadata};
use async_trait::async_trait;

/// Turns a user-supplied URL or platform reference into a loadable stream
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// The returned `stream_url` is treated as opaque
    async fn resolve(&self, input: &str) -> Result<ResolvedSource, ExtractionError>;
}

/// Rewrites a cross-origin URL into a same-origin one
///
/// The relay behind the rewritten URL must pass HTTP range semantics
/// through (206/200, `Content-Range`, `Accept-Ranges`) so seeking keeps working.
pub trait CrossOriginRelay: Send + Sync {
    fn relay(&self, url: &str) -> String;
}

/// Platform media-session integration
pub trait SessionMetadataSink: Send + Sync {
    fn publish(&self, metadata: &SessionMetadata);

    /// Called when nothing is loaded any more
    fn clear(&self) {}
}

/// Durable playlist storage
#[async_trait]
pub trait PlaylistStore: Send + Sync {
    async fn save(&self, snapshot: &PlaylistSnapshot) -> Result<(), PersistenceError>;

    async fn load(&self, playlist_id: &str) -> Result<Option<PlaylistSnapshot>, PersistenceError>;
}
