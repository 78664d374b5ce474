//! In-memory backend for unit tests

use crate::backend::PlaybackBackend;
use crate::parameters::ParameterTarget;
use aria_audio::{EngineError, LoadError};
use aria_core::{AudioSource, EffectGroups, EffectsState, BAND_COUNT};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct FakeState {
    duration: f64,
    position: f64,
    playing: bool,
    ended: bool,
    volume: f32,
    loads: usize,
    unloads: usize,
    fail_next: bool,
    failing: Vec<String>,
    loaded: Option<AudioSource>,
    equalizer: [f32; BAND_COUNT],
    effects: Option<EffectsState>,
    disposed: bool,
}

pub struct FakeBackend {
    name: String,
    accepts: fn(&AudioSource) -> bool,
    state: Arc<Mutex<FakeState>>,
}

/// Inspects and steers a `FakeBackend` after it moved into a session
#[derive(Clone)]
pub struct FakeHandle {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new(name: &str, accepts: fn(&AudioSource) -> bool) -> (Self, FakeHandle) {
        let state = Arc::new(Mutex::new(FakeState {
            duration: 60.0,
            volume: 1.0,
            ..FakeState::default()
        }));
        (
            Self {
                name: name.to_string(),
                accepts,
                state: Arc::clone(&state),
            },
            FakeHandle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

impl FakeHandle {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Duration reported by subsequent loads
    pub fn set_duration(&self, seconds: f64) {
        self.state().duration = seconds;
    }

    pub fn set_position(&self, seconds: f64) {
        self.state().position = seconds;
    }

    pub fn fail_next_load(&self) {
        self.state().fail_next = true;
    }

    pub fn fail_source(&self, url: &str) {
        self.state().failing.push(url.to_string());
    }

    pub fn volume(&self) -> f32 {
        self.state().volume
    }

    pub fn loads(&self) -> usize {
        self.state().loads
    }

    pub fn unloads(&self) -> usize {
        self.state().unloads
    }

    pub fn position(&self) -> f64 {
        self.state().position
    }

    pub fn is_playing(&self) -> bool {
        self.state().playing
    }

    pub fn loaded(&self) -> Option<AudioSource> {
        self.state().loaded.clone()
    }

    pub fn equalizer(&self) -> [f32; BAND_COUNT] {
        self.state().equalizer
    }

    pub fn effects(&self) -> Option<EffectsState> {
        self.state().effects
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }
}

impl ParameterTarget for FakeBackend {
    fn set_equalizer_band(&mut self, index: usize, gain_db: f32) {
        self.state().equalizer[index] = gain_db;
    }

    fn apply_effects(&mut self, effects: &EffectsState, _changed: EffectGroups) {
        self.state().effects = Some(*effects);
    }
}

#[async_trait]
impl PlaybackBackend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn handles(&self, source: &AudioSource) -> bool {
        (self.accepts)(source)
    }

    async fn load(&mut self, source: &AudioSource) -> Result<f64, EngineError> {
        let mut state = self.state();
        state.loaded = None;
        state.position = 0.0;
        state.playing = false;
        state.ended = false;

        let url = source.to_string();
        if std::mem::take(&mut state.fail_next) || state.failing.contains(&url) {
            return Err(LoadError::unreachable(url, "connection refused").into());
        }
        state.loads += 1;
        state.loaded = Some(source.clone());
        Ok(state.duration)
    }

    fn unload(&mut self) {
        let mut state = self.state();
        state.unloads += 1;
        state.loaded = None;
        state.playing = false;
    }

    fn play(&mut self) {
        let mut state = self.state();
        if state.ended {
            state.position = 0.0;
            state.ended = false;
        }
        state.playing = state.loaded.is_some();
    }

    fn pause(&mut self) {
        self.state().playing = false;
    }

    fn stop(&mut self) {
        let mut state = self.state();
        state.playing = false;
        state.position = 0.0;
        state.ended = false;
    }

    fn seek(&mut self, seconds: f64) {
        let mut state = self.state();
        state.position = seconds;
        state.ended = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.state().volume = volume;
    }

    fn position(&self) -> f64 {
        self.state().position
    }

    fn duration(&self) -> f64 {
        let state = self.state();
        if state.loaded.is_some() {
            state.duration
        } else {
            0.0
        }
    }

    fn is_playing(&self) -> bool {
        self.state().playing
    }

    fn has_ended(&self) -> bool {
        self.state().ended
    }

    fn advance(&mut self, seconds: f64) -> Result<(), EngineError> {
        let mut state = self.state();
        if state.playing {
            state.position += seconds;
            if state.duration > 0.0 && state.position >= state.duration {
                state.position = state.duration;
                state.playing = false;
                state.ended = true;
            }
        }
        Ok(())
    }

    fn dispose(&mut self) {
        let mut state = self.state();
        state.disposed = true;
        state.loaded = None;
        state.playing = false;
    }
}
