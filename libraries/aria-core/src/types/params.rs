//! Equalizer and effect parameter values
//!
//! All types here are plain values. Updates go through pure `apply` / `with_*`
//! functions that return a new, clamped state; nothing mutates in place.

use serde::{Deserialize, Serialize};

/// Number of equalizer bands
pub const BAND_COUNT: usize = 10;

/// Center frequency of each band (Hz)
pub const BAND_FREQUENCIES: [f32; BAND_COUNT] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

pub const MIN_BAND_GAIN_DB: f32 = -12.0;
pub const MAX_BAND_GAIN_DB: f32 = 12.0;

/// Clamp into `[lo, hi]`, mapping NaN to `fallback`
fn bounded(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(lo, hi)
    }
}

/// Ten band gains in dB, each within [-12, +12]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 10]", into = "[f32; 10]")]
pub struct EqualizerState {
    gains: [f32; BAND_COUNT],
}

impl EqualizerState {
    pub fn flat() -> Self {
        Self::default()
    }

    /// Build from raw gains, clamping each band
    pub fn from_gains(gains: [f32; BAND_COUNT]) -> Self {
        Self {
            gains: gains.map(|g| bounded(g, MIN_BAND_GAIN_DB, MAX_BAND_GAIN_DB, 0.0)),
        }
    }

    pub fn gains(&self) -> &[f32; BAND_COUNT] {
        &self.gains
    }

    pub fn gain(&self, index: usize) -> Option<f32> {
        self.gains.get(index).copied()
    }

    /// New state with one band replaced; `None` when `index` is not a band
    pub fn with_band(&self, index: usize, gain_db: f32) -> Option<Self> {
        if index >= BAND_COUNT {
            return None;
        }
        let mut next = *self;
        next.gains[index] = bounded(gain_db, MIN_BAND_GAIN_DB, MAX_BAND_GAIN_DB, 0.0);
        Some(next)
    }

    /// Indices of bands whose gain differs from `other`
    pub fn changed_bands<'a>(&'a self, other: &'a Self) -> impl Iterator<Item = usize> + 'a {
        (0..BAND_COUNT).filter(move |&i| self.gains[i] != other.gains[i])
    }

    pub fn is_flat(&self) -> bool {
        self.gains.iter().all(|&g| g == 0.0)
    }
}

impl From<[f32; BAND_COUNT]> for EqualizerState {
    fn from(gains: [f32; BAND_COUNT]) -> Self {
        Self::from_gains(gains)
    }
}

impl From<EqualizerState> for [f32; BAND_COUNT] {
    fn from(state: EqualizerState) -> Self {
        state.gains
    }
}

/// Convolution reverb parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReverbSettings {
    /// Impulse response amplitude (0 to 1)
    pub room_size: f32,
    /// Impulse response decay rate (0 to 1)
    pub damping: f32,
    pub wet_level: f32,
    pub dry_level: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.0,
            dry_level: 1.0,
        }
    }
}

impl ReverbSettings {
    pub fn clamped(self) -> Self {
        let d = Self::default();
        Self {
            room_size: bounded(self.room_size, 0.0, 1.0, d.room_size),
            damping: bounded(self.damping, 0.0, 1.0, d.damping),
            wet_level: bounded(self.wet_level, 0.0, 1.0, d.wet_level),
            dry_level: bounded(self.dry_level, 0.0, 1.0, d.dry_level),
        }
    }

    pub fn apply(self, delta: &ReverbDelta) -> Self {
        Self {
            room_size: delta.room_size.unwrap_or(self.room_size),
            damping: delta.damping.unwrap_or(self.damping),
            wet_level: delta.wet_level.unwrap_or(self.wet_level),
            dry_level: delta.dry_level.unwrap_or(self.dry_level),
        }
        .clamped()
    }
}

/// Modulated-delay chorus parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChorusSettings {
    /// LFO rate in Hz (0.1 to 10)
    pub rate: f32,
    pub depth: f32,
    /// 0 to 0.9
    pub feedback: f32,
    pub wet_level: f32,
}

impl Default for ChorusSettings {
    fn default() -> Self {
        Self {
            rate: 1.5,
            depth: 0.5,
            feedback: 0.2,
            wet_level: 0.0,
        }
    }
}

impl ChorusSettings {
    pub fn clamped(self) -> Self {
        let d = Self::default();
        Self {
            rate: bounded(self.rate, 0.1, 10.0, d.rate),
            depth: bounded(self.depth, 0.0, 1.0, d.depth),
            feedback: bounded(self.feedback, 0.0, 0.9, d.feedback),
            wet_level: bounded(self.wet_level, 0.0, 1.0, d.wet_level),
        }
    }

    pub fn apply(self, delta: &ChorusDelta) -> Self {
        Self {
            rate: delta.rate.unwrap_or(self.rate),
            depth: delta.depth.unwrap_or(self.depth),
            feedback: delta.feedback.unwrap_or(self.feedback),
            wet_level: delta.wet_level.unwrap_or(self.wet_level),
        }
        .clamped()
    }
}

/// Waveshaper oversampling factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OversampleMode {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "2x")]
    TwoX,
    #[default]
    #[serde(rename = "4x")]
    FourX,
}

impl OversampleMode {
    pub fn factor(self) -> usize {
        match self {
            Self::None => 1,
            Self::TwoX => 2,
            Self::FourX => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DistortionSettings {
    /// 0 is a straight line, 100 is heavy soft clipping
    pub amount: f32,
    pub oversample_mode: OversampleMode,
}

impl DistortionSettings {
    pub fn clamped(self) -> Self {
        Self {
            amount: bounded(self.amount, 0.0, 100.0, 0.0),
            oversample_mode: self.oversample_mode,
        }
    }

    pub fn apply(self, delta: &DistortionDelta) -> Self {
        Self {
            amount: delta.amount.unwrap_or(self.amount),
            oversample_mode: delta.oversample_mode.unwrap_or(self.oversample_mode),
        }
        .clamped()
    }
}

/// Dynamics compressor parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressorSettings {
    /// -100 to 0 dB
    pub threshold_db: f32,
    /// 0 to 40 dB, 0 is a hard knee
    pub knee_db: f32,
    /// 1 to 20
    pub ratio: f32,
    /// Seconds, 0 to 1
    pub attack_sec: f32,
    /// Seconds, 0 to 1
    pub release_sec: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            knee_db: 30.0,
            ratio: 12.0,
            attack_sec: 0.003,
            release_sec: 0.25,
        }
    }
}

impl CompressorSettings {
    pub fn clamped(self) -> Self {
        let d = Self::default();
        Self {
            threshold_db: bounded(self.threshold_db, -100.0, 0.0, d.threshold_db),
            knee_db: bounded(self.knee_db, 0.0, 40.0, d.knee_db),
            ratio: bounded(self.ratio, 1.0, 20.0, d.ratio),
            attack_sec: bounded(self.attack_sec, 0.0, 1.0, d.attack_sec),
            release_sec: bounded(self.release_sec, 0.0, 1.0, d.release_sec),
        }
    }

    pub fn apply(self, delta: &CompressorDelta) -> Self {
        Self {
            threshold_db: delta.threshold_db.unwrap_or(self.threshold_db),
            knee_db: delta.knee_db.unwrap_or(self.knee_db),
            ratio: delta.ratio.unwrap_or(self.ratio),
            attack_sec: delta.attack_sec.unwrap_or(self.attack_sec),
            release_sec: delta.release_sec.unwrap_or(self.release_sec),
        }
        .clamped()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReverbDelta {
    pub room_size: Option<f32>,
    pub damping: Option<f32>,
    pub wet_level: Option<f32>,
    pub dry_level: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChorusDelta {
    pub rate: Option<f32>,
    pub depth: Option<f32>,
    pub feedback: Option<f32>,
    pub wet_level: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DistortionDelta {
    pub amount: Option<f32>,
    pub oversample_mode: Option<OversampleMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressorDelta {
    pub threshold_db: Option<f32>,
    pub knee_db: Option<f32>,
    pub ratio: Option<f32>,
    pub attack_sec: Option<f32>,
    pub release_sec: Option<f32>,
}

/// A partial update touching any subset of effect groups
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsDelta {
    pub reverb: Option<ReverbDelta>,
    pub chorus: Option<ChorusDelta>,
    pub distortion: Option<DistortionDelta>,
    pub compressor: Option<CompressorDelta>,
}

/// Which effect groups differ between two states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectGroups {
    pub reverb: bool,
    pub chorus: bool,
    pub distortion: bool,
    pub compressor: bool,
}

impl EffectGroups {
    pub fn all() -> Self {
        Self {
            reverb: true,
            chorus: true,
            distortion: true,
            compressor: true,
        }
    }

    pub fn any(&self) -> bool {
        self.reverb || self.chorus || self.distortion || self.compressor
    }
}

/// Canonical effect parameters, one independently mutable group per effect
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsState {
    pub reverb: ReverbSettings,
    pub chorus: ChorusSettings,
    pub distortion: DistortionSettings,
    pub compressor: CompressorSettings,
}

impl EffectsState {
    /// Merge a partial update; untouched groups are carried over unchanged
    pub fn apply(&self, delta: &EffectsDelta) -> Self {
        Self {
            reverb: delta
                .reverb
                .map_or(self.reverb, |d| self.reverb.apply(&d)),
            chorus: delta
                .chorus
                .map_or(self.chorus, |d| self.chorus.apply(&d)),
            distortion: delta
                .distortion
                .map_or(self.distortion, |d| self.distortion.apply(&d)),
            compressor: delta
                .compressor
                .map_or(self.compressor, |d| self.compressor.apply(&d)),
        }
    }

    pub fn diff(&self, other: &Self) -> EffectGroups {
        EffectGroups {
            reverb: self.reverb != other.reverb,
            chorus: self.chorus != other.chorus,
            distortion: self.distortion != other.distortion,
            compressor: self.compressor != other.compressor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_gain_is_clamped() {
        let eq = EqualizerState::flat();
        assert_eq!(eq.with_band(3, 30.0).unwrap().gain(3), Some(12.0));
        assert_eq!(eq.with_band(3, -30.0).unwrap().gain(3), Some(-12.0));
        assert_eq!(eq.with_band(3, 4.5).unwrap().gain(3), Some(4.5));
    }

    #[test]
    fn invalid_band_is_rejected() {
        assert!(EqualizerState::flat().with_band(10, 3.0).is_none());
    }

    #[test]
    fn nan_gain_becomes_flat() {
        let eq = EqualizerState::from_gains([f32::NAN; BAND_COUNT]);
        assert!(eq.is_flat());
    }

    #[test]
    fn changed_bands_lists_differences() {
        let a = EqualizerState::flat();
        let b = a.with_band(2, 3.0).unwrap().with_band(7, -1.0).unwrap();
        assert_eq!(a.changed_bands(&b).collect::<Vec<_>>(), vec![2, 7]);
    }

    #[test]
    fn equalizer_serializes_as_array() {
        let eq = EqualizerState::from_gains([1.0; BAND_COUNT]);
        let json = serde_json::to_string(&eq).unwrap();
        assert_eq!(json, "[1.0,1.0,1.0,1.0,1.0,1.0,1.0,1.0,1.0,1.0]");
        let back: EqualizerState = serde_json::from_str("[99,0,0,0,0,0,0,0,0,0]").unwrap();
        assert_eq!(back.gain(0), Some(12.0));
    }

    #[test]
    fn partial_merge_keeps_other_fields() {
        let state = EffectsState::default();
        let delta = EffectsDelta {
            reverb: Some(ReverbDelta {
                wet_level: Some(0.4),
                ..Default::default()
            }),
            ..Default::default()
        };

        let next = state.apply(&delta);
        assert_eq!(next.reverb.wet_level, 0.4);
        assert_eq!(next.reverb.room_size, state.reverb.room_size);
        assert_eq!(next.chorus, state.chorus);
        assert_eq!(next.compressor, state.compressor);

        let changed = state.diff(&next);
        assert!(changed.reverb);
        assert!(!changed.chorus && !changed.distortion && !changed.compressor);
    }

    #[test]
    fn deltas_are_clamped() {
        let next = EffectsState::default().apply(&EffectsDelta {
            chorus: Some(ChorusDelta {
                rate: Some(50.0),
                feedback: Some(2.0),
                ..Default::default()
            }),
            compressor: Some(CompressorDelta {
                threshold_db: Some(-500.0),
                ratio: Some(0.5),
                ..Default::default()
            }),
            distortion: Some(DistortionDelta {
                amount: Some(400.0),
                oversample_mode: None,
            }),
            ..Default::default()
        });

        assert_eq!(next.chorus.rate, 10.0);
        assert_eq!(next.chorus.feedback, 0.9);
        assert_eq!(next.compressor.threshold_db, -100.0);
        assert_eq!(next.compressor.ratio, 1.0);
        assert_eq!(next.distortion.amount, 100.0);
        assert_eq!(next.distortion.oversample_mode, OversampleMode::FourX);
    }

    #[test]
    fn delta_deserializes_from_partial_json() {
        let delta: EffectsDelta =
            serde_json::from_str(r#"{"compressor":{"ratio":4.0}}"#).unwrap();
        assert_eq!(delta.compressor.unwrap().ratio, Some(4.0));
        assert!(delta.reverb.is_none());
    }

    #[test]
    fn oversample_mode_wire_names() {
        assert_eq!(serde_json::to_string(&OversampleMode::TwoX).unwrap(), "\"2x\"");
        assert_eq!(OversampleMode::None.factor(), 1);
        assert_eq!(OversampleMode::FourX.factor(), 4);
    }
}
