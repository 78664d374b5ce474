//! Playback session coordinator
//!
//! Owns the playlist and the current-track pointer and is the only place
//! that decides what plays next. Intents from the UI (or from the platform
//! media session) arrive here, parameters go through the store, and the
//! controller drives whichever backend handles the current source.
//!
//! Load and transport failures stop at this boundary: the session goes back
//! to a consistent idle/paused state, queues a notification and returns
//! the error to the caller.

use crate::backend::PlaybackBackend;
use crate::config::SessionConfig;
use crate::controller::PlaybackController;
use crate::error::{ParameterRangeError, Result, SessionError};
use crate::events::SessionEvent;
use crate::parameters::ParameterStore;
use crate::persistence::{PendingSave, PersistenceDebouncer};
use crate::playlist::Playlist;
use crate::presets::Mode;
use crate::shuffle::ShuffleOrder;
use crate::sources::{is_cross_origin, looks_like_direct_audio, title_for, track_id_for};
use aria_audio::{AudioSink, DefaultSourceLoader, RenderClock, SignalGraphEngine};
use aria_core::{
    AudioSource, CrossOriginRelay, EffectGroups, EffectsDelta, EffectsState, EqualizerState,
    ExtractionError, MetadataPlaybackState, PlaybackSessionState, PlaylistSnapshot,
    PlaylistStore, RepeatMode, SessionMetadata, SessionMetadataSink, SourceResolver, Track,
    TransportCommand, TransportState, BAND_COUNT,
};
use std::sync::Arc;
use tokio::time::Instant;

pub struct PlaybackSession {
    config: SessionConfig,
    playlist: Playlist,
    controller: PlaybackController,
    parameters: ParameterStore,

    shuffle: bool,
    shuffle_order: ShuffleOrder,
    repeat: RepeatMode,

    resolver: Option<Arc<dyn SourceResolver>>,
    relay: Option<Arc<dyn CrossOriginRelay>>,
    metadata: Option<Arc<dyn SessionMetadataSink>>,
    store: Option<Arc<dyn PlaylistStore>>,
    persistence: PersistenceDebouncer,

    events: Vec<SessionEvent>,
    last_state: TransportState,
    demo_count: usize,
    disposed: bool,
}

impl PlaybackSession {
    pub fn new(config: SessionConfig, backends: Vec<Box<dyn PlaybackBackend>>) -> Self {
        let config = config.sanitized();
        Self {
            playlist: Playlist::new(config.playlist_id.clone()),
            controller: PlaybackController::new(backends, config.initial_volume),
            parameters: ParameterStore::new(),
            shuffle: false,
            shuffle_order: ShuffleOrder::new(config.shuffle_seed),
            repeat: RepeatMode::Off,
            resolver: None,
            relay: None,
            metadata: None,
            store: None,
            persistence: PersistenceDebouncer::new(config.persistence_debounce()),
            events: Vec::new(),
            last_state: TransportState::Idle,
            demo_count: 0,
            disposed: false,
            config,
        }
    }

    /// Session playing through a signal graph engine built from `config`
    pub fn with_engine(
        config: SessionConfig,
        clock: RenderClock,
        sink: Box<dyn AudioSink>,
    ) -> Result<Self> {
        let engine = SignalGraphEngine::new(
            config.context_config(clock),
            sink,
            Arc::new(DefaultSourceLoader::new()),
        )?;
        Ok(Self::new(config, vec![Box::new(engine)]))
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn SourceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_relay(mut self, relay: Arc<dyn CrossOriginRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn with_metadata_sink(mut self, sink: Arc<dyn SessionMetadataSink>) -> Self {
        self.metadata = Some(sink);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn PlaylistStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn register_backend(&mut self, backend: Box<dyn PlaybackBackend>) {
        self.controller.register_backend(backend);
    }

    // ===== State =====

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackSessionState {
        PlaybackSessionState {
            current_track: self.playlist.current_track().cloned(),
            current_index: self.playlist.current_index(),
            transport: self.controller.state(),
            is_playing: self.controller.is_playing(),
            is_loading: self.controller.is_loading(),
            volume: self.controller.volume(),
            current_time: self.controller.current_time(),
            duration: self.controller.duration(),
            shuffle: self.shuffle,
            repeat: self.repeat,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn current_index(&self) -> Option<usize> {
        self.playlist.current_index()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.current_track()
    }

    pub fn transport_state(&self) -> TransportState {
        self.controller.state()
    }

    pub fn is_playing(&self) -> bool {
        self.controller.is_playing()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn volume(&self) -> f32 {
        self.controller.volume()
    }

    pub fn current_time(&self) -> f64 {
        self.controller.current_time()
    }

    pub fn duration(&self) -> f64 {
        self.controller.duration()
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Play order while shuffle is on
    pub fn shuffle_order(&self) -> &[usize] {
        self.shuffle_order.order()
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn equalizer(&self) -> &EqualizerState {
        self.parameters.equalizer()
    }

    pub fn effects(&self) -> &EffectsState {
        self.parameters.effects()
    }

    pub fn mode(&self) -> Option<Mode> {
        self.parameters.mode()
    }

    pub fn frequency_data(&self) -> Vec<u8> {
        self.controller.frequency_data()
    }

    pub fn time_domain_data(&self) -> Vec<u8> {
        self.controller.time_domain_data()
    }

    /// Queue the current position, replacing any older undrained report
    fn push_position(&mut self) -> (f64, f64) {
        let position = self.controller.current_time();
        let duration = self.controller.duration();
        self.events.retain(|event| !event.is_position_update());
        self.events
            .push(SessionEvent::PositionUpdate { position, duration });
        (position, duration)
    }

    /// Take every event queued since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ===== Loading =====

    /// Load a track, adding it to the playlist if it is not there yet
    pub async fn load_track(&mut self, track: Track) -> Result<usize> {
        let index = match self.playlist.position_of(&track.id) {
            Some(i) if self.playlist.get(i).map(|t| &t.source) == Some(&track.source) => i,
            _ => {
                self.add_to_playlist(track);
                self.playlist.len() - 1
            }
        };
        self.load_index(index).await?;
        Ok(index)
    }

    async fn load_index(&mut self, index: usize) -> Result<()> {
        self.ensure_active()?;
        let track = self
            .playlist
            .get(index)
            .cloned()
            .ok_or(SessionError::IndexOutOfBounds {
                index,
                len: self.playlist.len(),
            })?;

        let previous = self.playlist.current_index();
        self.playlist.set_current(Some(index))?;
        self.events.push(SessionEvent::StateChanged {
            state: TransportState::Loading,
        });
        self.last_state = TransportState::Loading;
        tracing::debug!(index, track = %track.id, "Loading track");

        match self.controller.load(&track.source).await {
            Ok(duration) => {
                if duration > 0.0 {
                    self.playlist.update_duration(index, duration);
                }
                // Fresh node chain: every parameter has to be pushed again
                if let Some(backend) = self.controller.active_backend_mut() {
                    self.parameters.apply_all(backend);
                }

                self.events.push(SessionEvent::TrackChanged {
                    index: Some(index),
                    track_id: Some(track.id.clone()),
                });
                self.events.push(SessionEvent::TrackLoaded {
                    track_id: track.id.clone(),
                    duration,
                });
                self.emit_state();
                self.publish_metadata();
                tracing::info!(track = %track.id, duration, "Track loaded");
                Ok(())
            }
            Err(err) => {
                if self.playlist.set_current(previous).is_err() {
                    let _ = self.playlist.set_current(None);
                }
                let err = match err {
                    SessionError::Backend(e) => SessionError::from_backend(&track.id, e),
                    other => other,
                };
                tracing::error!(track = %track.id, "Failed to load track: {}", err);

                self.emit_state();
                self.events.push(SessionEvent::error(format!(
                    "Could not play \"{}\": {}",
                    track.title, err
                )));
                self.publish_metadata();
                Err(err)
            }
        }
    }

    // ===== Transport =====

    /// Resume, or start the current (or first) track if nothing is loaded
    pub async fn play(&mut self) -> Result<()> {
        self.ensure_active()?;
        if self.controller.has_source() {
            self.resume();
            return Ok(());
        }
        match self.playlist.current_index().or_else(|| self.start_index()) {
            Some(index) => self.play_track_at_index(index).await,
            None => Ok(()),
        }
    }

    pub fn pause(&mut self) {
        self.controller.pause();
        self.emit_state();
        self.publish_metadata();
    }

    pub async fn toggle_play_pause(&mut self) -> Result<()> {
        if self.controller.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play().await
        }
    }

    /// Halt and rewind; the track stays loaded
    pub fn stop(&mut self) {
        self.controller.stop();
        self.emit_state();
        self.publish_metadata();
    }

    pub fn seek(&mut self, seconds: f64) {
        self.controller.seek(seconds);
        self.push_position();
        self.publish_metadata();
    }

    pub async fn play_track_at_index(&mut self, index: usize) -> Result<()> {
        self.load_index(index).await?;
        self.resume();
        Ok(())
    }

    /// Returns false when there is no next track under the repeat policy
    pub async fn next_track(&mut self) -> Result<bool> {
        self.step(true, false).await
    }

    pub async fn previous_track(&mut self) -> Result<bool> {
        self.step(false, false).await
    }

    async fn step(&mut self, forward: bool, auto: bool) -> Result<bool> {
        if self.playlist.is_empty() {
            return Ok(false);
        }
        let Some(target) = self.neighbour(forward) else {
            return Ok(false);
        };
        let resume = auto || self.controller.is_playing();
        self.load_index(target).await?;
        if resume {
            self.resume();
        }
        Ok(true)
    }

    /// Index `play()` starts from when no track is current
    pub fn start_index(&self) -> Option<usize> {
        if self.playlist.is_empty() {
            None
        } else if self.shuffle {
            self.shuffle_order.first()
        } else {
            Some(0)
        }
    }

    fn neighbour(&self, forward: bool) -> Option<usize> {
        let Some(current) = self.playlist.current_index() else {
            return self.start_index();
        };
        let wrap = self.repeat == RepeatMode::All;
        let last = self.playlist.len().checked_sub(1)?;

        if self.shuffle {
            return if forward {
                self.shuffle_order.next_after(current, wrap)
            } else {
                self.shuffle_order.previous_before(current, wrap)
            };
        }

        match (forward, wrap) {
            (true, _) if current < last => Some(current + 1),
            (true, true) => Some(0),
            (false, _) if current > 0 => Some(current - 1),
            (false, true) => Some(last),
            _ => None,
        }
    }

    fn resume(&mut self) {
        if self.controller.play() {
            self.emit_state();
            self.publish_metadata();
        }
    }

    /// Move manually clocked backends forward
    pub fn advance(&mut self, seconds: f64) -> Result<()> {
        self.controller.advance(seconds).map_err(SessionError::Backend)
    }

    /// Per-frame work: position reporting and end-of-track handling
    ///
    /// Never fails; errors are logged and the session is left paused or idle.
    pub async fn tick(&mut self) {
        if self.disposed || !self.controller.is_playing() {
            return;
        }

        let (position, duration) = self.push_position();
        self.publish_metadata();

        let reached_end = (duration > 0.0
            && position >= duration - self.config.end_of_track_epsilon)
            || self.controller.has_ended();
        if !reached_end {
            return;
        }

        if let Some(track) = self.playlist.current_track() {
            self.events.push(SessionEvent::TrackFinished {
                track_id: track.id.clone(),
            });
        }

        if self.repeat == RepeatMode::One {
            self.controller.seek(0.0);
            self.controller.play();
            self.publish_metadata();
            return;
        }

        match self.step(true, true).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("End of playlist");
                self.stop();
            }
            Err(e) => {
                tracing::warn!("Auto-advance failed: {}", e);
                self.stop();
            }
        }
    }

    /// Map an inbound media-session command onto the matching operation
    pub async fn handle_command(&mut self, command: TransportCommand) -> Result<()> {
        tracing::debug!(?command, "Transport command");
        match command {
            TransportCommand::Play => self.play().await,
            TransportCommand::Pause => {
                self.pause();
                Ok(())
            }
            TransportCommand::Next => self.next_track().await.map(|_| ()),
            TransportCommand::Previous => self.previous_track().await.map(|_| ()),
            TransportCommand::Seek(seconds) => {
                self.seek(seconds);
                Ok(())
            }
        }
    }

    // ===== Parameters =====

    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let volume = self.controller.set_volume(volume);
        self.events.push(SessionEvent::VolumeChanged { volume });
        volume
    }

    /// Clamp and apply one band; an invalid index changes nothing
    pub fn set_equalizer_band(
        &mut self,
        index: usize,
        gain_db: f32,
    ) -> std::result::Result<f32, ParameterRangeError> {
        let gain = self.parameters.set_band(index, gain_db).map_err(|e| {
            tracing::debug!("Ignoring band update: {}", e);
            e
        })?;
        self.sync_parameters();
        self.emit_equalizer();
        Ok(gain)
    }

    pub fn set_equalizer(&mut self, gains: [f32; BAND_COUNT]) {
        self.parameters.set_equalizer(gains);
        self.sync_parameters();
        self.emit_equalizer();
    }

    /// Unknown names are ignored
    pub fn apply_preset(&mut self, name: &str) -> bool {
        let applied = self.parameters.apply_preset(name);
        if applied {
            self.sync_parameters();
            self.emit_equalizer();
        }
        applied
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.parameters.set_mode(mode);
        self.sync_parameters();
        self.emit_equalizer();
    }

    /// Merge a partial effects update
    pub fn update_effects(&mut self, delta: &EffectsDelta) -> EffectGroups {
        let changed = self.parameters.update_effects(delta);
        if changed.any() {
            self.sync_parameters();
            self.events.push(SessionEvent::EffectsChanged {
                effects: *self.parameters.effects(),
            });
        }
        changed
    }

    pub fn reset_parameters(&mut self) {
        self.parameters.reset();
        self.sync_parameters();
        self.emit_equalizer();
        self.events.push(SessionEvent::EffectsChanged {
            effects: *self.parameters.effects(),
        });
    }

    fn sync_parameters(&mut self) {
        if let Some(backend) = self.controller.active_backend_mut() {
            self.parameters.sync(backend);
        }
    }

    fn emit_equalizer(&mut self) {
        self.events.push(SessionEvent::EqualizerChanged {
            gains: *self.parameters.equalizer().gains(),
            mode: self.parameters.mode(),
        });
    }

    // ===== Shuffle & Repeat =====

    pub fn set_shuffle(&mut self, enabled: bool) {
        self.shuffle = enabled;
        if enabled {
            self.shuffle_order
                .regenerate(self.playlist.len(), self.playlist.current_index());
        } else {
            self.shuffle_order.clear();
        }
        self.events.push(SessionEvent::ShuffleChanged { enabled });
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.set_shuffle(!self.shuffle);
        self.shuffle
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
        self.events.push(SessionEvent::RepeatChanged { mode });
    }

    /// none -> all -> one -> none
    pub fn cycle_repeat(&mut self) -> RepeatMode {
        let next = match self.repeat {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        };
        self.set_repeat(next);
        next
    }

    // ===== Playlist =====

    /// Append a track; returns the (possibly suffixed) id it was stored under
    pub fn add_to_playlist(&mut self, track: Track) -> String {
        let id = self.playlist.add(track);
        self.playlist_changed();
        id
    }

    pub fn add_tracks(&mut self, tracks: impl IntoIterator<Item = Track>) -> Vec<String> {
        let ids: Vec<String> = tracks
            .into_iter()
            .map(|track| self.playlist.add(track))
            .collect();
        if !ids.is_empty() {
            self.playlist_changed();
        }
        ids
    }

    /// Resolve a user-supplied URL and append it
    ///
    /// When the resolver fails but the input already points at an audio
    /// file, the input itself is used. Cross-origin URLs are routed through
    /// the relay when one is configured.
    pub async fn add_from_url(&mut self, input: &str) -> Result<String> {
        let resolved = match self.resolver.clone() {
            Some(resolver) => resolver.resolve(input).await,
            None => Err(ExtractionError::Unsupported(input.to_string())),
        };

        let track = match resolved {
            Ok(resolved) => {
                let mut track = Track::new(
                    track_id_for(input),
                    resolved.title,
                    resolved.artist,
                    AudioSource::url(self.route(&resolved.stream_url)),
                );
                track.artwork = resolved.thumbnail;
                track
            }
            Err(e) if looks_like_direct_audio(input) => {
                tracing::debug!(input, "Resolver failed ({}), using direct URL", e);
                Track::new(
                    track_id_for(input),
                    title_for(input),
                    "Unknown Artist",
                    AudioSource::url(self.route(input)),
                )
            }
            Err(e) => {
                tracing::warn!(input, "Could not resolve source: {}", e);
                self.events
                    .push(SessionEvent::error(format!("Could not add {input}: {e}")));
                return Err(e.into());
            }
        };

        Ok(self.add_to_playlist(track))
    }

    fn route(&self, url: &str) -> String {
        match (&self.relay, &self.config.app_origin) {
            (Some(relay), Some(origin)) if is_cross_origin(url, origin) => relay.relay(url),
            _ => url.to_string(),
        }
    }

    /// Append synthesized tones that need no network access
    pub fn add_demo_tracks(&mut self, count: usize, seconds: f32) -> Result<Vec<String>> {
        let mut tracks = Vec::with_capacity(count);
        for _ in 0..count {
            let track =
                aria_audio::synth::demo_track(self.demo_count, seconds, self.config.sample_rate)
                    .map_err(|e| SessionError::Synthesis(e.to_string()))?;
            self.demo_count += 1;
            tracks.push(track);
        }
        Ok(self.add_tracks(tracks))
    }

    /// Remove a track; removing the current one stops playback
    pub fn remove_from_playlist(&mut self, index: usize) -> Result<Track> {
        if self.playlist.current_index() == Some(index) {
            self.controller.unload();
            self.emit_state();
        }
        let track = self.playlist.remove(index)?;
        if self.playlist.current_index().is_none() {
            self.events.push(SessionEvent::TrackChanged {
                index: None,
                track_id: None,
            });
            self.publish_metadata();
        }
        self.playlist_changed();
        Ok(track)
    }

    pub fn reorder_playlist(&mut self, from: usize, to: usize) -> Result<()> {
        self.playlist.reorder(from, to)?;
        self.playlist_changed();
        Ok(())
    }

    /// Stop and empty the playlist
    pub fn clear_playlist(&mut self) {
        self.controller.unload();
        self.playlist.clear();
        self.emit_state();
        self.events.push(SessionEvent::TrackChanged {
            index: None,
            track_id: None,
        });
        self.publish_metadata();
        self.playlist_changed();
    }

    /// Replace the playlist with a persisted snapshot
    pub fn restore(&mut self, snapshot: PlaylistSnapshot) {
        self.controller.unload();
        self.playlist = Playlist::from_snapshot(snapshot);
        self.emit_state();
        if self.shuffle {
            self.shuffle_order.regenerate(self.playlist.len(), None);
        }
        self.events.push(SessionEvent::PlaylistChanged {
            length: self.playlist.len(),
        });
        tracing::info!(
            playlist = self.playlist.id(),
            tracks = self.playlist.len(),
            "Playlist restored"
        );
    }

    /// Seed the playlist from the store; failures are logged, not returned
    pub async fn restore_from_store(&mut self) -> bool {
        let Some(store) = self.store.clone() else {
            return false;
        };
        match store.load(&self.config.playlist_id).await {
            Ok(Some(snapshot)) => {
                self.restore(snapshot);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Failed to restore playlist: {}", e);
                false
            }
        }
    }

    fn playlist_changed(&mut self) {
        if self.shuffle {
            self.shuffle_order
                .regenerate(self.playlist.len(), self.playlist.current_index());
        }
        self.persistence
            .mark(self.playlist.snapshot(), Instant::now());
        self.events.push(SessionEvent::PlaylistChanged {
            length: self.playlist.len(),
        });
    }

    /// Offer the pending snapshot to the store once it is due
    ///
    /// Returns true when something was saved.
    pub async fn flush_persistence(&mut self, force: bool) -> bool {
        match self.take_pending_save(force) {
            Some(save) => save.run().await,
            None => false,
        }
    }

    /// Detach the pending snapshot so it can be saved after releasing the session
    ///
    /// Nothing is taken while no store is configured.
    pub fn take_pending_save(&mut self, force: bool) -> Option<PendingSave> {
        let store = self.store.clone()?;
        let snapshot = if force {
            self.persistence.flush()
        } else {
            self.persistence.take_due(Instant::now())
        }?;
        Some(PendingSave::new(store, snapshot))
    }

    // ===== Collaborators =====

    fn publish_metadata(&self) {
        let Some(sink) = &self.metadata else {
            return;
        };
        match self.playlist.current_track() {
            Some(track) if self.controller.has_source() => {
                sink.publish(&SessionMetadata {
                    title: track.title.clone(),
                    artist: track.artist.clone(),
                    artwork: track.artwork.clone(),
                    duration_seconds: self.controller.duration(),
                    position_seconds: self.controller.current_time(),
                    playback_state: if self.controller.is_playing() {
                        MetadataPlaybackState::Playing
                    } else {
                        MetadataPlaybackState::Paused
                    },
                });
            }
            _ => sink.clear(),
        }
    }

    fn emit_state(&mut self) {
        let state = self.controller.state();
        if state != self.last_state {
            self.last_state = state;
            self.events.push(SessionEvent::StateChanged { state });
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.disposed {
            Err(SessionError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Release every backend; idempotent
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.controller.dispose();
        self.emit_state();
        if let Some(sink) = &self.metadata {
            sink.clear();
        }
        self.disposed = true;
        tracing::debug!("Playback session disposed");
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NotificationLevel;
    use crate::testing::{FakeBackend, FakeHandle};
    use aria_core::ResolvedSource;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn url_track(id: &str) -> Track {
        Track::new(
            id,
            format!("Title {id}"),
            "Artist",
            AudioSource::url(format!("https://cdn.example.com/{id}.mp3")),
        )
    }

    fn session_with(ids: &[&str]) -> (PlaybackSession, FakeHandle) {
        let (backend, handle) = FakeBackend::new("fake", |_| true);
        let config = SessionConfig {
            shuffle_seed: Some(11),
            ..SessionConfig::default()
        };
        let mut session = PlaybackSession::new(config, vec![Box::new(backend)]);
        session.add_tracks(ids.iter().map(|id| url_track(id)));
        session.drain_events();
        (session, handle)
    }

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<SessionMetadata>>,
        cleared: Mutex<usize>,
    }

    impl SessionMetadataSink for RecordingSink {
        fn publish(&self, metadata: &SessionMetadata) {
            self.published.lock().unwrap().push(metadata.clone());
        }

        fn clear(&self) {
            *self.cleared.lock().unwrap() += 1;
        }
    }

    struct StaticResolver;

    #[async_trait]
    impl SourceResolver for StaticResolver {
        async fn resolve(&self, input: &str) -> std::result::Result<ResolvedSource, ExtractionError> {
            if input.contains("watch") {
                Ok(ResolvedSource {
                    stream_url: "https://media.other.com/stream/123.m4a".into(),
                    title: "Resolved".into(),
                    artist: "Channel".into(),
                    thumbnail: Some("https://img.other.com/123.jpg".into()),
                })
            } else {
                Err(ExtractionError::NoStream(input.into()))
            }
        }
    }

    struct PrefixRelay;

    impl CrossOriginRelay for PrefixRelay {
        fn relay(&self, url: &str) -> String {
            format!("/proxy/{url}")
        }
    }

    #[tokio::test]
    async fn play_starts_first_track() {
        let (mut session, handle) = session_with(&["a", "b"]);
        session.play().await.unwrap();

        assert_eq!(session.current_index(), Some(0));
        assert!(session.is_playing());
        assert_eq!(handle.loads(), 1);
        assert_eq!(handle.volume(), 0.7);

        let events = session.drain_events();
        assert!(events.contains(&SessionEvent::StateChanged {
            state: TransportState::Playing
        }));
    }

    #[tokio::test]
    async fn next_wraps_only_with_repeat_all() {
        let (mut session, handle) = session_with(&["a", "b", "c"]);
        session.play_track_at_index(2).await.unwrap();

        assert!(!session.next_track().await.unwrap());
        assert_eq!(session.current_index(), Some(2));
        assert_eq!(handle.loads(), 1, "no reload at the boundary");

        session.set_repeat(RepeatMode::All);
        assert!(session.next_track().await.unwrap());
        assert_eq!(session.current_index(), Some(0));
        assert!(session.is_playing());

        assert!(session.previous_track().await.unwrap());
        assert_eq!(session.current_index(), Some(2));
    }

    #[tokio::test]
    async fn previous_clamps_at_start() {
        let (mut session, _) = session_with(&["a", "b"]);
        session.play_track_at_index(0).await.unwrap();
        assert!(!session.previous_track().await.unwrap());
        assert_eq!(session.current_index(), Some(0));
    }

    #[tokio::test]
    async fn empty_playlist_navigation_is_noop() {
        let (mut session, handle) = session_with(&[]);
        assert!(!session.next_track().await.unwrap());
        session.play().await.unwrap();
        assert_eq!(handle.loads(), 0);
        assert_eq!(session.current_index(), None);
    }

    #[tokio::test]
    async fn repeat_one_rewinds_at_end() {
        let (mut session, handle) = session_with(&["a", "b"]);
        handle.set_duration(60.0);
        session.set_repeat(RepeatMode::One);
        session.play_track_at_index(0).await.unwrap();

        handle.set_position(59.95);
        session.tick().await;

        assert_eq!(handle.position(), 0.0);
        assert!(session.is_playing());
        assert!(handle.is_playing());
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(handle.loads(), 1);
    }

    #[tokio::test]
    async fn end_of_track_advances_and_keeps_playing() {
        let (mut session, handle) = session_with(&["a", "b"]);
        handle.set_duration(10.0);
        session.play().await.unwrap();

        session.advance(9.95).unwrap();
        session.tick().await;

        assert_eq!(session.current_index(), Some(1));
        assert!(session.is_playing());
        assert_eq!(handle.loads(), 2);
        let events = session.drain_events();
        assert!(events.contains(&SessionEvent::TrackFinished {
            track_id: "a".into()
        }));
    }

    #[tokio::test]
    async fn end_of_playlist_stops_without_error() {
        let (mut session, handle) = session_with(&["a"]);
        handle.set_duration(5.0);
        session.play().await.unwrap();

        session.advance(6.0).unwrap();
        session.tick().await;

        assert!(!session.is_playing());
        assert_eq!(session.transport_state(), TransportState::Idle);
        assert_eq!(session.current_index(), Some(0));
    }

    #[tokio::test]
    async fn unknown_duration_ends_on_backend_signal() {
        let (mut session, handle) = session_with(&["a", "b"]);
        handle.set_duration(0.0);
        session.play().await.unwrap();

        session.advance(1.0).unwrap();
        session.tick().await;
        assert_eq!(session.current_index(), Some(0));
        assert!(session.is_playing());
    }

    #[tokio::test]
    async fn tick_does_nothing_while_paused() {
        let (mut session, handle) = session_with(&["a", "b"]);
        session.play().await.unwrap();
        session.pause();
        handle.set_position(59.99);
        session.drain_events();

        session.tick().await;
        assert!(session.drain_events().is_empty());
        assert_eq!(session.current_index(), Some(0));
    }

    #[tokio::test]
    async fn seek_past_end_lands_on_duration() {
        let (mut session, handle) = session_with(&["a", "b"]);
        handle.set_duration(60.0);
        session.play().await.unwrap();
        session.drain_events();

        session.seek(1000.0);
        assert_eq!(handle.position(), 60.0);
        assert_eq!(
            session.drain_events().first(),
            Some(&SessionEvent::PositionUpdate {
                position: 60.0,
                duration: 60.0
            })
        );
    }

    #[tokio::test]
    async fn undrained_position_reports_do_not_pile_up() {
        let (mut session, handle) = session_with(&["a", "b"]);
        session.play().await.unwrap();

        for step in 0..100 {
            handle.set_position(f64::from(step) * 0.1);
            session.tick().await;
        }

        let positions: Vec<_> = session
            .drain_events()
            .into_iter()
            .filter(SessionEvent::is_position_update)
            .collect();
        assert_eq!(positions.len(), 1);
        assert!(matches!(
            positions[0],
            SessionEvent::PositionUpdate { position, .. } if (position - 9.9).abs() < 1e-9
        ));
    }

    #[tokio::test]
    async fn clear_playlist_mid_playback() {
        let (mut session, handle) = session_with(&["a", "b"]);
        session.play().await.unwrap();

        session.clear_playlist();

        assert!(!session.is_playing());
        assert_eq!(session.current_index(), None);
        assert!(session.playlist().is_empty());
        assert!(handle.loaded().is_none());
    }

    #[tokio::test]
    async fn unreachable_source_leaves_session_consistent() {
        let (mut session, handle) = session_with(&["a", "b"]);
        session.play_track_at_index(0).await.unwrap();
        session.pause();
        handle.fail_source("https://cdn.example.com/b.mp3");
        session.drain_events();

        let err = session.play_track_at_index(1).await.unwrap_err();

        assert!(matches!(err, SessionError::Load { ref track_id, .. } if track_id == "b"));
        assert!(err.is_recoverable());
        assert_eq!(session.current_index(), Some(0));
        assert!(!session.is_playing());
        assert!(!session.is_loading());
        assert_eq!(session.playlist().len(), 2);

        let events = session.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Notification {
                level: NotificationLevel::Error,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn parameters_are_reapplied_after_each_load() {
        let (mut session, handle) = session_with(&["a", "b"]);
        session.set_mode(Mode::BassBoost);
        session.update_effects(&EffectsDelta {
            distortion: Some(aria_core::DistortionDelta {
                amount: Some(30.0),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(handle.effects(), None, "nothing loaded yet");

        session.play().await.unwrap();
        assert_eq!(handle.equalizer(), Mode::BassBoost.gains());
        assert_eq!(handle.effects().unwrap().distortion.amount, 30.0);

        session.set_equalizer_band(9, 20.0).unwrap();
        assert_eq!(handle.equalizer()[9], 12.0);

        session.next_track().await.unwrap();
        assert_eq!(handle.equalizer()[9], 12.0);
        assert_eq!(handle.equalizer()[0], 6.0);
    }

    #[tokio::test]
    async fn set_mode_overrides_manual_edits() {
        let (mut session, _) = session_with(&["a"]);
        session.set_equalizer_band(5, 9.0).unwrap();
        session.set_mode(Mode::BassBoost);
        assert_eq!(
            *session.equalizer().gains(),
            [6.0, 4.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
        assert!(session.set_equalizer_band(10, 1.0).is_err());
        assert!(!session.apply_preset("unknown"));
        assert_eq!(session.mode(), Some(Mode::BassBoost));
    }

    #[tokio::test]
    async fn removing_current_track_stops_playback() {
        let (mut session, handle) = session_with(&["a", "b", "c"]);
        session.play_track_at_index(1).await.unwrap();

        session.remove_from_playlist(0).unwrap();
        assert_eq!(session.current_index(), Some(0));
        assert!(session.is_playing());

        session.remove_from_playlist(0).unwrap();
        assert_eq!(session.current_index(), None);
        assert!(!session.is_playing());
        assert!(handle.loaded().is_none());
    }

    #[tokio::test]
    async fn duplicate_ids_are_suffixed() {
        let (mut session, _) = session_with(&[]);
        assert_eq!(session.add_to_playlist(url_track("a")), "a");
        assert_eq!(session.add_to_playlist(url_track("a")), "a-2");
        assert!(session.playlist().position_of("a").is_some());
        assert!(session.playlist().position_of("a-2").is_some());
    }

    #[tokio::test]
    async fn shuffle_walks_the_play_order() {
        let (mut session, _) = session_with(&["a", "b", "c", "d", "e"]);
        session.play_track_at_index(2).await.unwrap();
        session.set_shuffle(true);

        let order = session.shuffle_order().to_vec();
        assert_eq!(order[0], 2);

        let mut visited = vec![2];
        while session.next_track().await.unwrap() {
            visited.push(session.current_index().unwrap());
        }
        assert_eq!(visited, order);

        let names: Vec<_> = session.playlist().tracks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(names, ["a", "b", "c", "d", "e"], "playlist order untouched");
    }

    #[tokio::test]
    async fn transport_commands_map_onto_operations() {
        let (mut session, handle) = session_with(&["a", "b"]);
        session.handle_command(TransportCommand::Play).await.unwrap();
        assert!(session.is_playing());

        session
            .handle_command(TransportCommand::Seek(12.0))
            .await
            .unwrap();
        assert_eq!(handle.position(), 12.0);

        session.handle_command(TransportCommand::Next).await.unwrap();
        assert_eq!(session.current_index(), Some(1));

        session
            .handle_command(TransportCommand::Previous)
            .await
            .unwrap();
        assert_eq!(session.current_index(), Some(0));

        session.handle_command(TransportCommand::Pause).await.unwrap();
        assert!(!session.is_playing());
    }

    #[tokio::test]
    async fn metadata_follows_transitions() {
        let sink = Arc::new(RecordingSink::default());
        let (session, _) = session_with(&["a"]);
        let mut session = session.with_metadata_sink(sink.clone());

        session.play().await.unwrap();
        let last = sink.published.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.title, "Title a");
        assert_eq!(last.playback_state, MetadataPlaybackState::Playing);

        session.pause();
        let last = sink.published.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.playback_state, MetadataPlaybackState::Paused);

        session.clear_playlist();
        assert!(*sink.cleared.lock().unwrap() >= 1);
    }

    #[tokio::test]
    async fn add_from_url_resolves_and_relays() {
        let (backend, _handle) = FakeBackend::new("fake", |_| true);
        let config = SessionConfig {
            app_origin: Some("https://player.example.com".into()),
            ..SessionConfig::default()
        };
        let mut session = PlaybackSession::new(config, vec![Box::new(backend)])
            .with_resolver(Arc::new(StaticResolver))
            .with_relay(Arc::new(PrefixRelay));

        let id = session
            .add_from_url("https://video.example.com/watch?v=123")
            .await
            .unwrap();
        let track = session.playlist().get(0).unwrap();
        assert_eq!(id, "watch");
        assert_eq!(track.title, "Resolved");
        assert_eq!(track.artwork.as_deref(), Some("https://img.other.com/123.jpg"));
        assert_eq!(
            track.source,
            AudioSource::url("/proxy/https://media.other.com/stream/123.m4a")
        );

        session
            .add_from_url("https://player.example.com/media/local.mp3")
            .await
            .unwrap();
        assert_eq!(
            session.playlist().get(1).unwrap().source,
            AudioSource::url("https://player.example.com/media/local.mp3")
        );

        let err = session
            .add_from_url("https://example.com/page")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Extraction(_)));
        assert_eq!(session.playlist().len(), 2);
    }

    #[tokio::test]
    async fn demo_tracks_are_in_memory() {
        let (mut session, _) = session_with(&[]);
        let ids = session.add_demo_tracks(2, 0.1).unwrap();
        assert_eq!(ids, ["demo-1", "demo-2"]);
        assert!(session
            .playlist()
            .tracks()
            .iter()
            .all(|t| matches!(t.source, AudioSource::Bytes(_))));
        assert!(session.playlist().snapshot().tracks.is_empty());
    }

    #[tokio::test]
    async fn dispose_is_idempotent() {
        let (mut session, handle) = session_with(&["a"]);
        session.play().await.unwrap();
        session.dispose();
        session.dispose();

        assert!(handle.is_disposed());
        assert!(session.is_disposed());
        assert!(matches!(session.play().await, Err(SessionError::Disposed)));
        session.tick().await;
    }
}
