//! Frame scheduler
//!
//! Drives `PlaybackSession::tick` on an interval task and fans the queued
//! events out to subscribers. Every session operation goes through one
//! async mutex, so a load that is still in flight finishes before the next
//! intent is applied.

use crate::error::Result;
use crate::events::SessionEvent;
use crate::session::PlaybackSession;
use aria_core::TransportCommand;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const EVENT_CAPACITY: usize = 256;

/// Shared handle to a running session
pub struct SessionHandle {
    session: Arc<Mutex<PlaybackSession>>,
    events: broadcast::Sender<SessionEvent>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn new(session: PlaybackSession) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session: Arc::new(Mutex::new(session)),
            events,
            shutdown: CancellationToken::new(),
            task: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Exclusive access to the session
    ///
    /// Events queued while the guard is held go out on the next frame.
    pub async fn lock(&self) -> MutexGuard<'_, PlaybackSession> {
        self.session.lock().await
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start the frame loop; a second call is a no-op
    pub fn start(&mut self, interval: Duration) {
        if self.is_running() {
            return;
        }
        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        let shutdown = self.shutdown.clone();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // At most one save in flight so snapshots land in edit order
            let mut saving: Option<JoinHandle<bool>> = None;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let save_idle = saving.as_ref().map_or(true, JoinHandle::is_finished);
                        let pending = {
                            let mut session = session.lock().await;
                            session.tick().await;
                            for event in session.drain_events() {
                                // No subscribers is fine
                                let _ = events.send(event);
                            }
                            if save_idle {
                                session.take_pending_save(false)
                            } else {
                                None
                            }
                        };
                        if let Some(save) = pending {
                            saving = Some(tokio::spawn(save.run()));
                        }
                    }
                }
            }
            tracing::debug!("Frame loop stopped");
        }));
        tracing::debug!(?interval, "Frame loop started");
    }

    /// Apply a media-session command and publish what it changed
    pub async fn dispatch(&self, command: TransportCommand) -> Result<()> {
        let mut session = self.session.lock().await;
        let result = session.handle_command(command).await;
        for event in session.drain_events() {
            let _ = self.events.send(event);
        }
        result
    }

    /// Stop the frame loop, release the backends, then persist pending edits
    pub async fn dispose(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Frame loop ended abnormally: {}", e);
            }
        }

        let pending = {
            let mut session = self.session.lock().await;
            let pending = session.take_pending_save(true);
            session.dispose();
            for event in session.drain_events() {
                let _ = self.events.send(event);
            }
            pending
        };
        if let Some(save) = pending {
            save.run().await;
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::testing::FakeBackend;
    use aria_core::{
        AudioSource, PersistenceError, PlaylistSnapshot, PlaylistStore, Track, TransportState,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose writes never complete
    #[derive(Default)]
    struct StalledStore {
        saves: AtomicUsize,
    }

    #[async_trait]
    impl PlaylistStore for StalledStore {
        async fn save(&self, _snapshot: &PlaylistSnapshot) -> std::result::Result<(), PersistenceError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn load(
            &self,
            _playlist_id: &str,
        ) -> std::result::Result<Option<PlaylistSnapshot>, PersistenceError> {
            Ok(None)
        }
    }

    fn handle() -> (SessionHandle, crate::testing::FakeHandle) {
        let (backend, fake) = FakeBackend::new("fake", |_| true);
        let mut session = PlaybackSession::new(SessionConfig::default(), vec![Box::new(backend)]);
        session.add_tracks(["a", "b"].map(|id| {
            Track::new(id, id, "Artist", AudioSource::url(format!("https://x.test/{id}.mp3")))
        }));
        (SessionHandle::new(session), fake)
    }

    #[tokio::test(start_paused = true)]
    async fn frame_loop_reports_position_and_advances() {
        let (mut handle, fake) = handle();
        fake.set_duration(1.0);
        let mut events = handle.subscribe();

        handle.dispatch(TransportCommand::Play).await.unwrap();
        handle.start(Duration::from_millis(16));

        fake.set_position(0.5);
        tokio::time::sleep(Duration::from_millis(40)).await;
        fake.set_position(0.95);
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(handle.lock().await.current_index(), Some(1));

        let mut saw_position = false;
        let mut saw_finish = false;
        while let Ok(event) = events.try_recv() {
            saw_position |= event.is_position_update();
            saw_finish |= matches!(event, SessionEvent::TrackFinished { .. });
        }
        assert!(saw_position);
        assert!(saw_finish);

        handle.dispose().await;
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn dispatch_publishes_state_changes() {
        let (handle, _) = handle();
        let mut events = handle.subscribe();

        handle.dispatch(TransportCommand::Play).await.unwrap();
        handle.dispatch(TransportCommand::Pause).await.unwrap();

        let mut states = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::StateChanged { state } = event {
                states.push(state);
            }
        }
        assert_eq!(states.last(), Some(&TransportState::Paused));
        assert!(states.contains(&TransportState::Playing));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_does_not_block_commands() {
        let (backend, _fake) = FakeBackend::new("fake", |_| true);
        let config = SessionConfig {
            persistence_debounce_ms: 10,
            ..SessionConfig::default()
        };
        let store = Arc::new(StalledStore::default());
        let session = PlaybackSession::new(config, vec![Box::new(backend)])
            .with_store(Arc::clone(&store) as Arc<dyn PlaylistStore>);
        let mut handle = SessionHandle::new(session);
        handle.start(Duration::from_millis(16));

        handle.lock().await.add_tracks(["a", "b"].map(|id| {
            Track::new(id, id, "Artist", AudioSource::url(format!("https://x.test/{id}.mp3")))
        }));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);

        tokio::time::timeout(Duration::from_secs(1), handle.dispatch(TransportCommand::Play))
            .await
            .expect("play blocked behind the store")
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle.dispatch(TransportCommand::Pause))
            .await
            .expect("pause blocked behind the store")
            .unwrap();

        // Further edits wait for the stalled write instead of piling up
        handle.lock().await.add_to_playlist(Track::new(
            "c",
            "c",
            "Artist",
            AudioSource::url("https://x.test/c.mp3"),
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert!(handle.is_running());
    }

    #[tokio::test]
    async fn dispose_releases_session() {
        let (mut handle, fake) = handle();
        handle.dispatch(TransportCommand::Play).await.unwrap();
        handle.dispose().await;
        assert!(fake.is_disposed());
        assert!(handle.lock().await.is_disposed());
    }
}
