//! Named equalizer presets and listening modes
//!
//! Applying either one overwrites the whole equalizer; effects are never
//! touched. Switching mode discards manual band edits made under the
//! previous one.

use aria_core::BAND_COUNT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Listening mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Normal,
    VocalEnhance,
    InstrumentFocus,
    BassBoost,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::Normal,
        Mode::VocalEnhance,
        Mode::InstrumentFocus,
        Mode::BassBoost,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::VocalEnhance => "vocal-enhance",
            Self::InstrumentFocus => "instrument-focus",
            Self::BassBoost => "bass-boost",
        }
    }

    /// Fixed gain vector for this mode (dB, 32 Hz to 16 kHz)
    pub fn gains(self) -> [f32; BAND_COUNT] {
        match self {
            Self::Normal => [0.0; BAND_COUNT],
            Self::VocalEnhance => [0.0, 0.0, 0.0, 2.0, 4.0, 4.0, 2.0, 1.0, 0.0, 0.0],
            Self::InstrumentFocus => [0.0, 0.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 2.0, 1.0],
            Self::BassBoost => [6.0, 4.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| format!("unknown mode '{s}'"))
    }
}

/// A named equalizer curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub gains: [f32; BAND_COUNT],
}

/// Graphic-EQ curves offered next to the modes
const GRAPHIC_PRESETS: [Preset; 6] = [
    Preset {
        name: "flat",
        gains: [0.0; BAND_COUNT],
    },
    Preset {
        name: "treble-boost",
        gains: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 4.0, 5.0, 6.0],
    },
    Preset {
        name: "v-shape",
        gains: [5.0, 4.0, 2.0, -1.0, -2.0, -2.0, -1.0, 2.0, 4.0, 5.0],
    },
    Preset {
        name: "rock",
        gains: [4.0, 3.0, 1.0, 0.0, -1.0, 0.0, 1.0, 3.0, 4.0, 4.0],
    },
    Preset {
        name: "electronic",
        gains: [5.0, 4.0, 2.0, 0.0, 1.0, 2.0, 1.0, 3.0, 4.0, 4.0],
    },
    Preset {
        name: "acoustic",
        gains: [2.0, 1.0, 0.0, 1.0, 2.0, 2.0, 1.0, 2.0, 2.0, 1.0],
    },
];

/// Look up a preset by name; modes count as presets too
pub fn find_preset(name: &str) -> Option<Preset> {
    if let Ok(mode) = name.parse::<Mode>() {
        return Some(Preset {
            name: mode.name(),
            gains: mode.gains(),
        });
    }
    GRAPHIC_PRESETS.iter().find(|p| p.name == name).copied()
}

/// Every name `find_preset` accepts
pub fn preset_names() -> impl Iterator<Item = &'static str> {
    Mode::ALL
        .into_iter()
        .map(Mode::name)
        .chain(GRAPHIC_PRESETS.iter().map(|p| p.name))
}
