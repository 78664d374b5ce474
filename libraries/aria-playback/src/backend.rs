//! Pluggable playback backends
//!
//! The session never special-cases a backend. Each one says which sources
//! it handles and the first match plays the track. The signal graph engine
//! is the default backend for URLs and in-memory audio.

use crate::parameters::ParameterTarget;
use aria_audio::{EngineError, RenderClock, SignalGraphEngine};
use aria_core::AudioSource;
use async_trait::async_trait;

/// Common transport surface over one playing source
#[async_trait]
pub trait PlaybackBackend: ParameterTarget + Send {
    fn name(&self) -> &str;

    fn handles(&self, source: &AudioSource) -> bool;

    /// Replace the current source; returns the declared duration (0 if unknown)
    async fn load(&mut self, source: &AudioSource) -> Result<f64, EngineError>;

    /// Drop the current source
    fn unload(&mut self);

    fn play(&mut self);

    fn pause(&mut self);

    /// Pause and rewind
    fn stop(&mut self);

    fn seek(&mut self, seconds: f64);

    fn set_volume(&mut self, volume: f32);

    fn position(&self) -> f64;

    fn duration(&self) -> f64;

    fn is_playing(&self) -> bool;

    /// The source ran out of audio
    fn has_ended(&self) -> bool;

    fn frequency_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn time_domain_data(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Move a manually clocked backend forward; real-time backends ignore it
    fn advance(&mut self, _seconds: f64) -> Result<(), EngineError> {
        Ok(())
    }

    /// Release everything; safe to call more than once
    fn dispose(&mut self);
}

#[async_trait]
impl PlaybackBackend for SignalGraphEngine {
    fn name(&self) -> &str {
        "signal-graph"
    }

    fn handles(&self, source: &AudioSource) -> bool {
        matches!(source, AudioSource::Url(_) | AudioSource::Bytes(_))
    }

    async fn load(&mut self, source: &AudioSource) -> Result<f64, EngineError> {
        let info = self.load_source(source.clone()).await?;
        Ok(info.duration.unwrap_or(0.0))
    }

    fn unload(&mut self) {
        SignalGraphEngine::unload(self);
    }

    fn play(&mut self) {
        SignalGraphEngine::play(self);
    }

    fn pause(&mut self) {
        SignalGraphEngine::pause(self);
    }

    fn stop(&mut self) {
        SignalGraphEngine::stop(self);
    }

    fn seek(&mut self, seconds: f64) {
        self.set_current_time(seconds);
    }

    fn set_volume(&mut self, volume: f32) {
        SignalGraphEngine::set_volume(self, volume);
    }

    fn position(&self) -> f64 {
        self.current_time()
    }

    fn duration(&self) -> f64 {
        SignalGraphEngine::duration(self)
    }

    fn is_playing(&self) -> bool {
        SignalGraphEngine::is_playing(self)
    }

    fn has_ended(&self) -> bool {
        SignalGraphEngine::has_ended(self)
    }

    fn frequency_data(&self) -> Vec<u8> {
        SignalGraphEngine::frequency_data(self)
    }

    fn time_domain_data(&self) -> Vec<u8> {
        SignalGraphEngine::time_domain_data(self)
    }

    fn advance(&mut self, seconds: f64) -> Result<(), EngineError> {
        if self.clock() == RenderClock::Manual {
            self.render_seconds(seconds)?;
        }
        Ok(())
    }

    fn dispose(&mut self) {
        SignalGraphEngine::dispose(self);
    }
}
