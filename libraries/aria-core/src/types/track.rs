use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a track's audio comes from
///
/// `Url` covers remote streams as well as `file://` URLs and plain paths.
/// `Bytes` holds audio already in memory (uploads, synthesized demo tones)
/// and is never persisted. `Embedded` is a reference into an external
/// player platform that a dedicated backend knows how to drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    Url(String),
    Bytes(Bytes),
    Embedded { provider: String, reference: String },
}

impl AudioSource {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self::Bytes(data.into())
    }

    pub fn embedded(provider: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::Embedded {
            provider: provider.into(),
            reference: reference.into(),
        }
    }

    /// In-memory byte handles cannot be written to a playlist store
    pub fn is_persistable(&self) -> bool {
        !matches!(self, Self::Bytes(_))
    }

    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            _ => None,
        }
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Bytes(data) => write!(f, "<{} bytes in memory>", data.len()),
            Self::Embedded {
                provider,
                reference,
            } => write!(f, "{provider}:{reference}"),
        }
    }
}

/// A playable track
///
/// Immutable once enqueued except for `duration`, which is filled in when
/// the source finishes loading (0 means unknown).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub duration: f64,
    pub source: AudioSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        source: AudioSource,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            duration: 0.0,
            source,
            artwork: None,
        }
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration.max(0.0);
        self
    }

    pub fn is_persistable(&self) -> bool {
        self.source.is_persistable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sources_are_not_persistable() {
        assert!(AudioSource::url("https://example.com/a.mp3").is_persistable());
        assert!(AudioSource::embedded("video", "abc").is_persistable());
        assert!(!AudioSource::bytes(vec![1u8, 2, 3]).is_persistable());
    }

    #[test]
    fn display_hides_raw_bytes() {
        let source = AudioSource::bytes(vec![0u8; 16]);
        assert_eq!(source.to_string(), "<16 bytes in memory>");
    }

    #[test]
    fn track_serializes_camel_case() {
        let track = Track::new("t1", "Song", "Band", AudioSource::url("https://x/a.ogg"))
            .with_artwork("https://x/cover.jpg");
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["id"], "t1");
        assert_eq!(json["artwork"], "https://x/cover.jpg");
        assert_eq!(json["source"]["url"], "https://x/a.ogg");

        let back: Track = serde_json::from_value(json).unwrap();
        assert_eq!(back, track);
    }

    #[test]
    fn negative_duration_is_floored() {
        let track = Track::new("t", "t", "a", AudioSource::url("x")).with_duration(-3.0);
        assert_eq!(track.duration, 0.0);
    }
}
