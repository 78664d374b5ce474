//! Session events
//!
//! The session queues events as it changes; callers drain them after each
//! operation, or let the frame scheduler broadcast them to subscribers.

use crate::presets::Mode;
use aria_core::{EffectsState, RepeatMode, TransportState, BAND_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Transport state changed
    StateChanged { state: TransportState },

    /// The current track pointer moved
    #[serde(rename_all = "camelCase")]
    TrackChanged {
        index: Option<usize>,
        track_id: Option<String>,
    },

    /// A track finished loading
    #[serde(rename_all = "camelCase")]
    TrackLoaded { track_id: String, duration: f64 },

    /// Track reached its end
    #[serde(rename_all = "camelCase")]
    TrackFinished { track_id: String },

    /// Emitted every frame while playing
    PositionUpdate { position: f64, duration: f64 },

    VolumeChanged { volume: f32 },

    /// Playlist contents changed
    PlaylistChanged { length: usize },

    EqualizerChanged {
        gains: [f32; BAND_COUNT],
        mode: Option<Mode>,
    },

    EffectsChanged { effects: EffectsState },

    ShuffleChanged { enabled: bool },

    RepeatChanged { mode: RepeatMode },

    /// Something the user should be told about
    Notification {
        level: NotificationLevel,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

impl SessionEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Notification {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Notification {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    /// Position updates are high-frequency noise for most consumers
    pub fn is_position_update(&self) -> bool {
        matches!(self, Self::PositionUpdate { .. })
    }
}
