use super::track::Track;
use serde::{Deserialize, Serialize};

/// Repeat policy for the playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop at the playlist boundaries
    #[default]
    #[serde(rename = "none")]
    Off,
    /// Loop the current track
    One,
    /// Wrap around the playlist
    All,
}

/// Single-track transport state
///
/// `Idle -> Loading -> Ready <-> {Playing, Paused} -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
}

impl TransportState {
    pub fn is_playing(self) -> bool {
        self == Self::Playing
    }
}

/// Read-only view of the session for UI consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSessionState {
    pub current_track: Option<Track>,
    pub current_index: Option<usize>,
    pub transport: TransportState,
    pub is_playing: bool,
    pub is_loading: bool,
    pub volume: f32,
    pub current_time: f64,
    pub duration: f64,
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

/// Serializable playlist as offered to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    pub id: String,
    pub tracks: Vec<Track>,
}

/// What the source resolver hands back for a user-supplied reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSource {
    pub stream_url: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Media-session playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataPlaybackState {
    None,
    Paused,
    Playing,
}

/// Pushed to the session metadata sink on every meaningful transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub title: String,
    pub artist: String,
    pub artwork: Option<String>,
    pub duration_seconds: f64,
    pub position_seconds: f64,
    pub playback_state: MetadataPlaybackState,
}

/// Inbound transport command from the platform media session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "seconds", rename_all = "lowercase")]
pub enum TransportCommand {
    Play,
    Pause,
    Next,
    Previous,
    Seek(f64),
}
