/// Aria Player - offline renderer for playback sessions
use anyhow::{bail, Context};
use aria_audio::{RenderClock, WavFileSink};
use aria_core::{DistortionDelta, EffectsDelta, RepeatMode, ReverbDelta};
use aria_playback::{
    preset_names, JsonFileStore, Mode, PlaybackSession, QueryRelay, SessionConfig, SessionEvent,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "aria-player")]
#[command(about = "Render Aria playback sessions to WAV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a playlist through the signal graph and write the output to a file
    Render(RenderArgs),
    /// List equalizer presets and modes
    Presets,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Audio files or URLs, played in order
    sources: Vec<String>,

    /// Output WAV file
    #[arg(short, long, default_value = "aria-output.wav")]
    out: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Equalizer mode (normal, vocal-enhance, instrument-focus, bass-boost)
    #[arg(long)]
    mode: Option<Mode>,

    /// Named equalizer preset, applied after --mode
    #[arg(long)]
    preset: Option<String>,

    #[arg(long, value_enum, default_value_t = RepeatArg::Off)]
    repeat: RepeatArg,

    #[arg(long)]
    shuffle: bool,

    /// Volume, 0 to 1
    #[arg(long)]
    volume: Option<f32>,

    /// Reverb wet level, 0 to 1
    #[arg(long)]
    reverb: Option<f32>,

    /// Distortion amount, 0 to 100
    #[arg(long)]
    distortion: Option<f32>,

    /// Append this many generated demo tones
    #[arg(long, default_value_t = 0)]
    demo: usize,

    #[arg(long, default_value_t = 5.0)]
    demo_seconds: f32,

    /// Relay endpoint for cross-origin URLs
    #[arg(long)]
    relay: Option<String>,

    /// Directory holding saved playlists; restored before sources are added
    #[arg(long)]
    playlist_dir: Option<PathBuf>,

    /// Stop rendering after this many seconds
    #[arg(long, default_value_t = 600.0)]
    max_seconds: f64,
}

#[derive(Clone, Copy, ValueEnum)]
enum RepeatArg {
    Off,
    All,
    One,
}

impl From<RepeatArg> for RepeatMode {
    fn from(arg: RepeatArg) -> Self {
        match arg {
            RepeatArg::Off => RepeatMode::Off,
            RepeatArg::All => RepeatMode::All,
            RepeatArg::One => RepeatMode::One,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aria_player=info,aria_playback=info,aria_audio=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => render(args).await?,
        Commands::Presets => list_presets(),
    }

    Ok(())
}

fn list_presets() {
    for name in preset_names() {
        println!("{name}");
    }
}

async fn render(args: RenderArgs) -> anyhow::Result<()> {
    let config = SessionConfig::load(args.config.as_deref()).context("Failed to load config")?;
    // One render block per frame so the clock and the output stay in step
    let tick = config.block_frames as f64 / f64::from(config.sample_rate);

    let sink = WavFileSink::create(&args.out, config.sample_rate)
        .with_context(|| format!("Cannot write {}", args.out.display()))?;
    let mut session = PlaybackSession::with_engine(config, RenderClock::Manual, Box::new(sink))?;

    if let Some(endpoint) = &args.relay {
        session = session.with_relay(Arc::new(QueryRelay::new(endpoint.as_str())));
    }
    if let Some(dir) = &args.playlist_dir {
        session = session.with_store(Arc::new(JsonFileStore::new(dir)));
        if session.restore_from_store().await {
            tracing::info!("Restored {} saved tracks", session.playlist().len());
        }
    }

    for source in &args.sources {
        match session.add_from_url(source).await {
            Ok(id) => tracing::info!("Added {}", id),
            Err(e) => tracing::warn!("Skipping {}: {}", source, e),
        }
    }
    if args.demo > 0 {
        session.add_demo_tracks(args.demo, args.demo_seconds)?;
    }
    if session.playlist().is_empty() {
        bail!("Nothing to play: pass sources or --demo");
    }

    if let Some(mode) = args.mode {
        session.set_mode(mode);
    }
    if let Some(preset) = &args.preset {
        if !session.apply_preset(preset) {
            tracing::warn!("Unknown preset '{}'", preset);
        }
    }
    if let Some(volume) = args.volume {
        session.set_volume(volume);
    }
    session.update_effects(&EffectsDelta {
        reverb: args.reverb.map(|wet| ReverbDelta {
            wet_level: Some(wet),
            ..Default::default()
        }),
        distortion: args.distortion.map(|amount| DistortionDelta {
            amount: Some(amount),
            ..Default::default()
        }),
        ..Default::default()
    });
    session.set_repeat(args.repeat.into());
    session.set_shuffle(args.shuffle);

    tracing::info!(
        "Rendering {} tracks to {}",
        session.playlist().len(),
        args.out.display()
    );
    let first = session.current_index().or_else(|| session.start_index());
    if let Err(e) = session.play().await {
        tracing::warn!("First track failed: {}", e);
        let mut started = false;
        for index in fallback_order(session.playlist().len(), first) {
            if session.play_track_at_index(index).await.is_ok() {
                started = true;
                break;
            }
        }
        if !started {
            bail!("No playable track");
        }
    }

    let mut elapsed = 0.0;
    while session.is_playing() && elapsed < args.max_seconds {
        session.advance(tick)?;
        session.tick().await;
        elapsed += tick;
        report(session.drain_events());
    }

    session.flush_persistence(true).await;
    let state = session.state();
    session.dispose();

    tracing::info!("Rendered {:.1}s", elapsed);
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

/// Indices to try after `failed` could not start, wrapping once around
fn fallback_order(len: usize, failed: Option<usize>) -> Vec<usize> {
    match failed {
        Some(failed) if failed < len => (failed + 1..len).chain(0..failed).collect(),
        _ => (0..len).collect(),
    }
}

fn report(events: Vec<SessionEvent>) {
    for event in events {
        match event {
            SessionEvent::TrackLoaded { track_id, duration } => {
                tracing::info!("Now playing {} ({:.1}s)", track_id, duration);
            }
            SessionEvent::Notification { message, .. } => tracing::warn!("{}", message),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_skips_the_failed_track() {
        assert_eq!(fallback_order(4, Some(0)), vec![1, 2, 3]);
        assert_eq!(fallback_order(4, Some(2)), vec![3, 0, 1]);
        assert_eq!(fallback_order(1, Some(0)), Vec::<usize>::new());
        assert_eq!(fallback_order(3, None), vec![0, 1, 2]);
    }
}
