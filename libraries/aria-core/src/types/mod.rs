//! Domain value types

mod params;
mod session;
mod track;

pub use params::{
    ChorusDelta, ChorusSettings, CompressorDelta, CompressorSettings, DistortionDelta,
    DistortionSettings, EffectGroups, EffectsDelta, EffectsState, EqualizerState,
    OversampleMode, ReverbDelta, ReverbSettings, BAND_COUNT, BAND_FREQUENCIES,
    MAX_BAND_GAIN_DB, MIN_BAND_GAIN_DB,
};
pub use session::{
    MetadataPlaybackState, PlaybackSessionState, PlaylistSnapshot, RepeatMode, ResolvedSource,
    SessionMetadata, TransportCommand, TransportState,
};
pub use track::{AudioSource, Track};
