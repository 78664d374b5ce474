//! Playlist persistence
//!
//! Playlist edits mark the snapshot dirty; it is offered to the store once
//! no further edit arrived for the debounce delay. Store failures are
//! logged and never reach playback.

use aria_core::{PersistenceError, PlaylistSnapshot, PlaylistStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Coalesces bursts of playlist edits into one save
#[derive(Debug, Clone)]
pub struct PersistenceDebouncer {
    delay: Duration,
    pending: Option<(PlaylistSnapshot, Instant)>,
}

impl PersistenceDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace the pending snapshot and restart the delay
    pub fn mark(&mut self, snapshot: PlaylistSnapshot, now: Instant) {
        self.pending = Some((snapshot, now));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending snapshot, once the delay has passed since the last edit
    pub fn take_due(&mut self, now: Instant) -> Option<PlaylistSnapshot> {
        match &self.pending {
            Some((_, marked)) if now.duration_since(*marked) >= self.delay => {
                self.pending.take().map(|(snapshot, _)| snapshot)
            }
            _ => None,
        }
    }

    /// The pending snapshot regardless of the delay
    pub fn flush(&mut self) -> Option<PlaylistSnapshot> {
        self.pending.take().map(|(snapshot, _)| snapshot)
    }
}

/// A snapshot taken off the session, ready to be written without holding it
pub struct PendingSave {
    store: Arc<dyn PlaylistStore>,
    snapshot: PlaylistSnapshot,
}

impl PendingSave {
    pub fn new(store: Arc<dyn PlaylistStore>, snapshot: PlaylistSnapshot) -> Self {
        Self { store, snapshot }
    }

    pub fn snapshot(&self) -> &PlaylistSnapshot {
        &self.snapshot
    }

    /// Write the snapshot; failures are logged and reported as false
    pub async fn run(self) -> bool {
        match self.store.save(&self.snapshot).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(playlist = %self.snapshot.id, "Failed to save playlist: {}", e);
                false
            }
        }
    }
}

/// Stores each playlist as `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, playlist_id: &str) -> PathBuf {
        let name: String = playlist_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl PlaylistStore for JsonFileStore {
    async fn save(&self, snapshot: &PlaylistSnapshot) -> Result<(), PersistenceError> {
        let data = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write-then-rename so a crash never leaves a half-written file
        let path = self.path_for(&snapshot.id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(
            playlist = %snapshot.id,
            tracks = snapshot.tracks.len(),
            "Playlist saved"
        );
        Ok(())
    }

    async fn load(&self, playlist_id: &str) -> Result<Option<PlaylistSnapshot>, PersistenceError> {
        let path = self.path_for(playlist_id);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
