//! Single-track transport state machine
//!
//! ```text
//! Idle -> Loading -> Ready <-> {Playing, Paused}
//!   ^                  |            |
//!   +------ stop / unload ----------+
//! ```
//!
//! The controller owns the registered backends and dispatches each source
//! to the first backend that handles it. Volume lives here so it carries
//! over when the active backend changes.

use crate::backend::PlaybackBackend;
use crate::error::{Result, SessionError};
use aria_audio::EngineError;
use aria_core::{AudioSource, TransportState};

pub struct PlaybackController {
    backends: Vec<Box<dyn PlaybackBackend>>,
    active: Option<usize>,
    state: TransportState,
    has_source: bool,
    duration: f64,
    volume: f32,
}

impl PlaybackController {
    pub fn new(backends: Vec<Box<dyn PlaybackBackend>>, volume: f32) -> Self {
        Self {
            backends,
            active: None,
            state: TransportState::Idle,
            has_source: false,
            duration: 0.0,
            volume: clamp_volume(volume),
        }
    }

    /// Backends registered later are consulted after earlier ones
    pub fn register_backend(&mut self, backend: Box<dyn PlaybackBackend>) {
        tracing::debug!(backend = backend.name(), "Registered playback backend");
        self.backends.push(backend);
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn is_loading(&self) -> bool {
        self.state == TransportState::Loading
    }

    pub fn has_source(&self) -> bool {
        self.has_source
    }

    pub fn active_backend(&self) -> Option<&dyn PlaybackBackend> {
        self.active.and_then(|i| self.backends.get(i)).map(|b| b.as_ref())
    }

    pub fn active_backend_mut(&mut self) -> Option<&mut (dyn PlaybackBackend + 'static)> {
        match self.active {
            Some(i) => self.backends.get_mut(i).map(|b| b.as_mut()),
            None => None,
        }
    }

    /// Load `source` into the first backend that handles it
    ///
    /// On failure the controller is back in `Idle` with nothing loaded.
    pub async fn load(&mut self, source: &AudioSource) -> Result<f64> {
        let index = self
            .backends
            .iter()
            .position(|b| b.handles(source))
            .ok_or_else(|| SessionError::NoBackend(source.to_string()))?;

        self.teardown(index);
        self.active = Some(index);
        self.set_state(TransportState::Loading);

        let volume = self.volume;
        let backend = &mut self.backends[index];
        match backend.load(source).await {
            Ok(duration) => {
                backend.set_volume(volume);
                self.duration = duration;
                self.has_source = true;
                self.set_state(TransportState::Ready);
                Ok(duration)
            }
            Err(e) => {
                self.duration = 0.0;
                self.has_source = false;
                self.set_state(TransportState::Idle);
                Err(SessionError::Backend(e))
            }
        }
    }

    /// Unload whatever the previously active backend held
    fn teardown(&mut self, next: usize) {
        if let Some(previous) = self.active {
            if previous != next {
                if let Some(backend) = self.backends.get_mut(previous) {
                    backend.unload();
                }
            }
        }
        self.has_source = false;
        self.duration = 0.0;
    }

    /// Returns false when there is nothing to play
    pub fn play(&mut self) -> bool {
        if !self.has_source || self.is_loading() {
            return false;
        }
        if let Some(backend) = self.active_backend_mut() {
            backend.play();
        }
        self.set_state(TransportState::Playing);
        true
    }

    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        if let Some(backend) = self.active_backend_mut() {
            backend.pause();
        }
        self.set_state(TransportState::Paused);
    }

    /// Back to `Idle` at position 0; the source stays loaded
    pub fn stop(&mut self) {
        if let Some(backend) = self.active_backend_mut() {
            backend.stop();
        }
        self.set_state(TransportState::Idle);
    }

    /// Drop the source entirely
    pub fn unload(&mut self) {
        if let Some(backend) = self.active_backend_mut() {
            backend.stop();
            backend.unload();
        }
        self.active = None;
        self.has_source = false;
        self.duration = 0.0;
        self.set_state(TransportState::Idle);
    }

    pub fn seek(&mut self, seconds: f64) {
        if !self.has_source || !seconds.is_finite() {
            return;
        }
        let mut seconds = seconds.max(0.0);
        let duration = self.duration();
        if duration > 0.0 {
            seconds = seconds.min(duration);
        }
        if let Some(backend) = self.active_backend_mut() {
            backend.seek(seconds);
        }
    }

    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.volume = clamp_volume(volume);
        let volume = self.volume;
        for backend in &mut self.backends {
            backend.set_volume(volume);
        }
        volume
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn current_time(&self) -> f64 {
        if !self.has_source {
            return 0.0;
        }
        self.active_backend().map_or(0.0, |b| b.position())
    }

    /// Declared duration, 0 while unknown
    pub fn duration(&self) -> f64 {
        if !self.has_source {
            return 0.0;
        }
        let live = self.active_backend().map_or(0.0, |b| b.duration());
        if live > 0.0 {
            live
        } else {
            self.duration
        }
    }

    pub fn has_ended(&self) -> bool {
        self.has_source && self.active_backend().is_some_and(|b| b.has_ended())
    }

    pub fn frequency_data(&self) -> Vec<u8> {
        self.active_backend()
            .map(|b| b.frequency_data())
            .unwrap_or_default()
    }

    pub fn time_domain_data(&self) -> Vec<u8> {
        self.active_backend()
            .map(|b| b.time_domain_data())
            .unwrap_or_default()
    }

    /// Advance manually clocked backends
    pub fn advance(&mut self, seconds: f64) -> std::result::Result<(), EngineError> {
        match self.active_backend_mut() {
            Some(backend) => backend.advance(seconds),
            None => {
                for backend in &mut self.backends {
                    backend.advance(seconds)?;
                }
                Ok(())
            }
        }
    }

    /// Release every backend; idempotent
    pub fn dispose(&mut self) {
        for backend in &mut self.backends {
            backend.dispose();
        }
        self.active = None;
        self.has_source = false;
        self.duration = 0.0;
        self.state = TransportState::Idle;
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "Transport state changed");
            self.state = state;
        }
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn controller() -> (PlaybackController, crate::testing::FakeHandle) {
        let (backend, handle) = FakeBackend::new("fake", |s| s.as_url().is_some());
        (PlaybackController::new(vec![Box::new(backend)], 0.7), handle)
    }

    #[tokio::test]
    async fn load_then_play_pause_stop() {
        let (mut controller, handle) = controller();
        assert!(!controller.play());

        handle.set_duration(60.0);
        let duration = controller.load(&AudioSource::url("https://a/b.mp3")).await.unwrap();
        assert_eq!(duration, 60.0);
        assert_eq!(controller.state(), TransportState::Ready);
        assert_eq!(handle.volume(), 0.7);

        assert!(controller.play());
        assert_eq!(controller.state(), TransportState::Playing);
        controller.pause();
        assert_eq!(controller.state(), TransportState::Paused);
        assert!(controller.play());

        controller.stop();
        assert_eq!(controller.state(), TransportState::Idle);
        assert!(controller.has_source());
        assert!(controller.play(), "stopped source can be replayed");
    }

    #[tokio::test]
    async fn failed_load_returns_to_idle() {
        let (mut controller, handle) = controller();
        handle.fail_next_load();
        let err = controller
            .load(&AudioSource::url("https://a/missing.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Backend(EngineError::Load(_))));
        assert_eq!(controller.state(), TransportState::Idle);
        assert!(!controller.has_source());
        assert!(!controller.play());
    }

    #[tokio::test]
    async fn unhandled_source_has_no_backend() {
        let (mut controller, _) = controller();
        let err = controller
            .load(&AudioSource::embedded("video", "xyz"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NoBackend(_)));
    }

    #[tokio::test]
    async fn dispatches_to_first_matching_backend() {
        let (urls, url_handle) = FakeBackend::new("urls", |s| s.as_url().is_some());
        let (embedded, embedded_handle) =
            FakeBackend::new("embedded", |s| matches!(s, AudioSource::Embedded { .. }));
        let mut controller = PlaybackController::new(vec![Box::new(urls)], 1.0);
        controller.register_backend(Box::new(embedded));

        controller.load(&AudioSource::embedded("video", "xyz")).await.unwrap();
        assert_eq!(controller.active_backend().unwrap().name(), "embedded");
        assert_eq!(embedded_handle.loads(), 1);

        controller.load(&AudioSource::url("https://a/b.mp3")).await.unwrap();
        assert_eq!(controller.active_backend().unwrap().name(), "urls");
        assert_eq!(url_handle.loads(), 1);
        assert!(embedded_handle.unloads() >= 1);
    }

    #[test]
    fn volume_is_clamped() {
        let (mut controller, handle) = controller();
        assert_eq!(controller.set_volume(0.4), 0.4);
        assert_eq!(controller.set_volume(-1.0), 0.0);
        assert_eq!(controller.set_volume(5.0), 1.0);
        assert_eq!(handle.volume(), 1.0);
    }

    #[tokio::test]
    async fn seek_is_clamped_to_the_track() {
        let (mut controller, handle) = controller();
        handle.set_duration(60.0);
        controller.load(&AudioSource::url("https://a/b.mp3")).await.unwrap();

        controller.seek(1000.0);
        assert_eq!(handle.position(), 60.0);
        controller.seek(-5.0);
        assert_eq!(handle.position(), 0.0);

        handle.set_duration(0.0);
        controller.seek(1000.0);
        assert_eq!(handle.position(), 1000.0, "unknown length is not clamped");
    }

    #[tokio::test]
    async fn unknown_duration_stays_playable() {
        let (mut controller, handle) = controller();
        handle.set_duration(0.0);
        controller.load(&AudioSource::url("https://a/stream")).await.unwrap();
        assert_eq!(controller.duration(), 0.0);
        assert!(controller.play());
    }
}
