//! Canonical equalizer and effect parameters
//!
//! The store outlives any single source or backend, so parameters survive
//! track changes. Every change goes through the pure value types in
//! `aria_core` and is then diffed against what was last pushed to the
//! backend, so only changed bands and groups reach the live graph.

use crate::error::ParameterRangeError;
use crate::presets::{find_preset, Mode};
use aria_audio::SignalGraphEngine;
use aria_core::{EffectGroups, EffectsDelta, EffectsState, EqualizerState, BAND_COUNT};

/// Something live parameters can be pushed into
pub trait ParameterTarget {
    fn set_equalizer_band(&mut self, index: usize, gain_db: f32);

    fn set_all_equalizer_bands(&mut self, gains: &[f32; BAND_COUNT]) {
        for (index, &gain) in gains.iter().enumerate() {
            self.set_equalizer_band(index, gain);
        }
    }

    /// Apply the groups flagged in `changed`
    fn apply_effects(&mut self, effects: &EffectsState, changed: EffectGroups);
}

impl ParameterTarget for SignalGraphEngine {
    fn set_equalizer_band(&mut self, index: usize, gain_db: f32) {
        SignalGraphEngine::set_equalizer_band(self, index, gain_db);
    }

    fn set_all_equalizer_bands(&mut self, gains: &[f32; BAND_COUNT]) {
        SignalGraphEngine::set_all_equalizer_bands(self, gains);
    }

    fn apply_effects(&mut self, effects: &EffectsState, changed: EffectGroups) {
        if changed.reverb {
            self.set_reverb_settings(effects.reverb);
        }
        if changed.chorus {
            self.set_chorus_settings(effects.chorus);
        }
        if changed.distortion {
            self.set_distortion_settings(effects.distortion);
        }
        if changed.compressor {
            self.set_compressor_settings(effects.compressor);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    equalizer: EqualizerState,
    effects: EffectsState,
    mode: Option<Mode>,
    /// What the target currently has; `None` forces a full push
    pushed: Option<(EqualizerState, EffectsState)>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equalizer(&self) -> &EqualizerState {
        &self.equalizer
    }

    pub fn effects(&self) -> &EffectsState {
        &self.effects
    }

    /// The mode last selected, if no manual edit happened since
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Clamp and store one band; returns the stored gain
    pub fn set_band(&mut self, index: usize, gain_db: f32) -> Result<f32, ParameterRangeError> {
        let next = self
            .equalizer
            .with_band(index, gain_db)
            .ok_or(ParameterRangeError::BandIndex(index))?;
        self.equalizer = next;
        self.mode = None;
        Ok(next.gains()[index])
    }

    pub fn set_equalizer(&mut self, gains: [f32; BAND_COUNT]) {
        self.equalizer = EqualizerState::from_gains(gains);
        self.mode = None;
    }

    /// Replace the equalizer with a named preset; unknown names are ignored
    pub fn apply_preset(&mut self, name: &str) -> bool {
        match find_preset(name) {
            Some(preset) => {
                self.equalizer = EqualizerState::from_gains(preset.gains);
                self.mode = name.parse().ok();
                true
            }
            None => {
                tracing::debug!(preset = name, "Ignoring unknown preset");
                false
            }
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.equalizer = EqualizerState::from_gains(mode.gains());
        self.mode = Some(mode);
    }

    /// Merge a partial effects update; returns the groups that changed
    pub fn update_effects(&mut self, delta: &EffectsDelta) -> EffectGroups {
        let next = self.effects.apply(delta);
        let changed = self.effects.diff(&next);
        self.effects = next;
        changed
    }

    /// Back to a flat equalizer and default effects
    pub fn reset(&mut self) {
        self.equalizer = EqualizerState::flat();
        self.effects = EffectsState::default();
        self.mode = Some(Mode::Normal);
    }

    /// Push whatever changed since the last push
    pub fn sync<T: ParameterTarget + ?Sized>(&mut self, target: &mut T) {
        let Some((pushed_eq, pushed_fx)) = self.pushed else {
            self.apply_all(target);
            return;
        };

        let bands: Vec<usize> = self.equalizer.changed_bands(&pushed_eq).collect();
        match bands.len() {
            0 => {}
            1 => target.set_equalizer_band(bands[0], self.equalizer.gains()[bands[0]]),
            _ => target.set_all_equalizer_bands(self.equalizer.gains()),
        }

        let changed = pushed_fx.diff(&self.effects);
        if changed.any() {
            target.apply_effects(&self.effects, changed);
        }

        self.pushed = Some((self.equalizer, self.effects));
    }

    /// Push everything, e.g. into a freshly loaded source chain
    pub fn apply_all<T: ParameterTarget + ?Sized>(&mut self, target: &mut T) {
        target.set_all_equalizer_bands(self.equalizer.gains());
        target.apply_effects(&self.effects, EffectGroups::all());
        self.pushed = Some((self.equalizer, self.effects));
    }
}
