/// Session configuration
use crate::error::Result;
use aria_audio::{ContextConfig, RenderClock};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Volume a new session starts at, 0 to 1
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// How close to the declared duration counts as the end of a track
    #[serde(default = "default_end_of_track_epsilon")]
    pub end_of_track_epsilon: f64,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_persistence_debounce_ms")]
    pub persistence_debounce_ms: u64,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_block_frames")]
    pub block_frames: usize,

    /// Origin the player is served from; cross-origin sources go through the relay
    #[serde(default)]
    pub app_origin: Option<String>,

    /// Fixed seed for reproducible shuffle orders
    #[serde(default)]
    pub shuffle_seed: Option<u64>,

    #[serde(default = "default_playlist_id")]
    pub playlist_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_volume: default_initial_volume(),
            end_of_track_epsilon: default_end_of_track_epsilon(),
            tick_interval_ms: default_tick_interval_ms(),
            persistence_debounce_ms: default_persistence_debounce_ms(),
            sample_rate: default_sample_rate(),
            block_frames: default_block_frames(),
            app_origin: None,
            shuffle_seed: None,
            playlist_id: default_playlist_id(),
        }
    }
}

impl SessionConfig {
    /// Load from an optional TOML file, overridden by `ARIA_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path));
        }

        // ARIA_INITIAL_VOLUME, ARIA_SAMPLE_RATE, ...
        settings = settings.add_source(config::Environment::with_prefix("ARIA").try_parsing(true));

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config.sanitized())
    }

    /// Pull out-of-domain values back into range
    pub fn sanitized(mut self) -> Self {
        self.initial_volume = if self.initial_volume.is_nan() {
            default_initial_volume()
        } else {
            self.initial_volume.clamp(0.0, 1.0)
        };
        if !self.end_of_track_epsilon.is_finite() || self.end_of_track_epsilon < 0.0 {
            self.end_of_track_epsilon = default_end_of_track_epsilon();
        }
        self.tick_interval_ms = self.tick_interval_ms.max(1);
        self
    }

    /// Render context for an engine driven by this session
    pub fn context_config(&self, clock: RenderClock) -> ContextConfig {
        ContextConfig {
            sample_rate: self.sample_rate,
            block_frames: self.block_frames,
            clock,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn persistence_debounce(&self) -> Duration {
        Duration::from_millis(self.persistence_debounce_ms)
    }
}

// Default values
fn default_initial_volume() -> f32 {
    0.7
}

fn default_end_of_track_epsilon() -> f64 {
    0.1
}

fn default_tick_interval_ms() -> u64 {
    16
}

fn default_persistence_debounce_ms() -> u64 {
    1000
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_block_frames() -> usize {
    512
}

fn default_playlist_id() -> String {
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.initial_volume, 0.7);
        assert_eq!(config.end_of_track_epsilon, 0.1);
        assert_eq!(config.tick_interval(), Duration::from_millis(16));
        assert_eq!(config.persistence_debounce(), Duration::from_secs(1));
        assert_eq!(config.playlist_id, "default");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "initial_volume = 0.5\nshuffle_seed = 9\nsample_rate = 44100").unwrap();

        let config = SessionConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.initial_volume, 0.5);
        assert_eq!(config.shuffle_seed, Some(9));
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.block_frames, 512);
    }

    #[test]
    fn sanitized_clamps_volume() {
        let config = SessionConfig {
            initial_volume: 3.0,
            end_of_track_epsilon: -1.0,
            tick_interval_ms: 0,
            ..SessionConfig::default()
        }
        .sanitized();
        assert_eq!(config.initial_volume, 1.0);
        assert_eq!(config.end_of_track_epsilon, 0.1);
        assert_eq!(config.tick_interval_ms, 1);
    }

    #[test]
    fn context_config_uses_rate_and_block() {
        let config = SessionConfig {
            sample_rate: 22050,
            block_frames: 256,
            ..SessionConfig::default()
        };
        let ctx = config.context_config(RenderClock::Manual);
        assert_eq!(ctx.sample_rate, 22050);
        assert_eq!(ctx.block_frames, 256);
        assert_eq!(ctx.clock, RenderClock::Manual);
    }
}
