//! Aria Playback
//!
//! Session-level playback for Aria: the playlist, the transport state
//! machine, parameter storage with presets, and the coordinator that ties
//! them to a signal graph engine.
//!
//! # Architecture
//!
//! - [`PlaybackSession`] owns the playlist and decides what plays next
//! - [`PlaybackController`] drives whichever [`PlaybackBackend`] handles the source
//! - [`ParameterStore`] keeps canonical EQ/effects values and pushes diffs
//! - [`SessionHandle`] runs the frame loop and broadcasts [`SessionEvent`]s
//!
//! # Example
//!
//! ```rust,no_run
//! use aria_audio::{MemorySink, RenderClock};
//! use aria_playback::{Mode, PlaybackSession, SessionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = PlaybackSession::with_engine(
//!     SessionConfig::default(),
//!     RenderClock::Manual,
//!     Box::new(MemorySink::new()),
//! )?;
//! session.add_demo_tracks(3, 5.0)?;
//! session.set_mode(Mode::BassBoost);
//! session.play().await?;
//!
//! session.advance(1.0)?;
//! session.tick().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod parameters;
pub mod persistence;
pub mod playlist;
pub mod presets;
pub mod scheduler;
pub mod session;
pub mod shuffle;
pub mod sources;

#[cfg(test)]
mod testing;

pub use backend::PlaybackBackend;
pub use config::SessionConfig;
pub use controller::PlaybackController;
pub use error::{ParameterRangeError, Result, SessionError};
pub use events::{NotificationLevel, SessionEvent};
pub use parameters::{ParameterStore, ParameterTarget};
pub use persistence::{JsonFileStore, PendingSave, PersistenceDebouncer};
pub use playlist::Playlist;
pub use presets::{find_preset, preset_names, Mode, Preset};
pub use scheduler::SessionHandle;
pub use session::PlaybackSession;
pub use shuffle::ShuffleOrder;
pub use sources::QueryRelay;
