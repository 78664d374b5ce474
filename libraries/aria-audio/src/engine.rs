//! Signal graph engine: the control surface over the live graph
//!
//! Parameter changes go straight into the long-lived nodes under a short
//! lock, and a mirror of every parameter is kept on the control side so
//! reads never wait on the render thread. Expensive rebuilds (reverb
//! impulse, distortion curve) are computed before taking the lock.
//!
//! Loads run in three steps so that late results can be told apart:
//! `prepare_load` bumps the generation and tears down the old source,
//! `PendingLoad::fetch` fetches and decodes without touching the engine, and
//! `commit_load` installs the result only if its generation is still current.

use crate::analysis::SpectrumAnalyzer;
use crate::context::{AudioSink, ContextConfig, NullSink, RenderClock, RenderContext};
use crate::decoder::{decode_bytes, DecodedAudio};
use crate::error::{EngineError, LoadError, Result};
use crate::graph::{SignalGraph, SourceNode};
use crate::loader::{DefaultSourceLoader, FetchedBytes, SourceLoader};
use crate::nodes::{distortion_curve, ImpulseResponse};
use crate::resampling::resample_stereo;
use aria_core::{
    AudioSource, ChorusSettings, CompressorSettings, DistortionSettings, ReverbSettings,
    BAND_COUNT,
};
use std::sync::{Arc, Mutex, PoisonError};

/// What the engine knows about the source it is playing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    pub generation: u64,
    /// Container-declared duration; `None` when the container did not say
    pub duration: Option<f64>,
    pub frames: usize,
}

/// A load that has been started but not fetched yet
pub struct PendingLoad {
    generation: u64,
    source: AudioSource,
    loader: Arc<dyn SourceLoader>,
    target_rate: u32,
}

impl PendingLoad {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    /// Fetch, decode and resample to the context rate
    pub async fn fetch(self) -> FetchedLoad {
        let result = match self.loader.fetch(&self.source).await {
            Ok(fetched) => {
                let target_rate = self.target_rate;
                tokio::task::spawn_blocking(move || prepare_audio(fetched, target_rate))
                    .await
                    .unwrap_or_else(|e| Err(LoadError::Decode(format!("decoder task failed: {e}"))))
            }
            Err(e) => Err(e),
        };
        self.resolve(result)
    }

    /// Complete the load with audio obtained some other way
    pub fn resolve(self, result: std::result::Result<DecodedAudio, LoadError>) -> FetchedLoad {
        FetchedLoad {
            generation: self.generation,
            target_rate: self.target_rate,
            result,
        }
    }
}

/// A finished fetch waiting to be committed
pub struct FetchedLoad {
    generation: u64,
    target_rate: u32,
    result: std::result::Result<DecodedAudio, LoadError>,
}

impl FetchedLoad {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn prepare_audio(fetched: FetchedBytes, target_rate: u32) -> std::result::Result<DecodedAudio, LoadError> {
    let decoded = decode_bytes(fetched.data, fetched.extension.as_deref())?;
    let samples = resample_stereo(&decoded.samples, decoded.sample_rate, target_rate)?;
    Ok(DecodedAudio {
        samples,
        sample_rate: target_rate,
        declared_duration: decoded.declared_duration,
    })
}

pub struct SignalGraphEngine {
    context: RenderContext,
    loader: Arc<dyn SourceLoader>,
    spectrum: Mutex<SpectrumAnalyzer>,

    volume: f32,
    equalizer: [f32; BAND_COUNT],
    compressor: CompressorSettings,
    distortion: DistortionSettings,
    chorus: ChorusSettings,
    reverb: ReverbSettings,

    generation: u64,
    current: Option<SourceInfo>,
    loaded_once: bool,
    disposed: bool,
}

impl SignalGraphEngine {
    /// Build the graph and start its clock
    ///
    /// Fails with `EngineError::Fatal` when the context cannot be created.
    pub fn new(
        config: ContextConfig,
        sink: Box<dyn AudioSink>,
        loader: Arc<dyn SourceLoader>,
    ) -> Result<Self> {
        let graph = SignalGraph::new(config.sample_rate, 1.0);
        let context = RenderContext::new(config, graph, sink)?;

        Ok(Self {
            context,
            loader,
            spectrum: Mutex::new(SpectrumAnalyzer::new()),
            volume: 1.0,
            equalizer: [0.0; BAND_COUNT],
            compressor: CompressorSettings::default(),
            distortion: DistortionSettings::default(),
            chorus: ChorusSettings::default(),
            reverb: ReverbSettings::default(),
            generation: 0,
            current: None,
            loaded_once: false,
            disposed: false,
        })
    }

    /// Silent output, default loader
    pub fn with_config(config: ContextConfig) -> Result<Self> {
        Self::new(config, Box::new(NullSink), Arc::new(DefaultSourceLoader::new()))
    }

    pub fn sample_rate(&self) -> u32 {
        self.context.sample_rate()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source_info(&self) -> Option<SourceInfo> {
        self.current
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ===== Loading =====

    /// Start a new load, tearing down the current source
    ///
    /// Any load still in flight becomes stale.
    pub fn prepare_load(&mut self, source: AudioSource) -> Result<PendingLoad> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        if !self.context.is_running() && !self.loaded_once {
            return Err(EngineError::fatal(
                "render context stopped before the first load",
            ));
        }

        self.generation += 1;
        if let Some(mut previous) = self.context.graph().replace_source(None) {
            previous.stop();
        }
        self.current = None;

        tracing::debug!(generation = self.generation, source = %source, "Loading source");

        Ok(PendingLoad {
            generation: self.generation,
            source,
            loader: Arc::clone(&self.loader),
            target_rate: self.sample_rate(),
        })
    }

    /// Wire a fetched source into the graph if it is still the latest load
    pub fn commit_load(&mut self, fetched: FetchedLoad) -> Result<SourceInfo> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        if fetched.generation != self.generation {
            tracing::debug!(
                generation = fetched.generation,
                current = self.generation,
                "Ignoring superseded load"
            );
            return Err(LoadError::Superseded {
                generation: fetched.generation,
                current: self.generation,
            }
            .into());
        }

        let decoded = fetched.result.map_err(|e| {
            tracing::error!(generation = fetched.generation, "Load failed: {}", e);
            e
        })?;

        let samples = if decoded.sample_rate == fetched.target_rate {
            decoded.samples
        } else {
            resample_stereo(&decoded.samples, decoded.sample_rate, fetched.target_rate)?
        };
        let info = SourceInfo {
            generation: fetched.generation,
            duration: decoded.declared_duration,
            frames: samples.len() / 2,
        };
        if info.frames == 0 {
            return Err(LoadError::Empty.into());
        }

        self.context
            .graph()
            .replace_source(Some(SourceNode::new(samples.into())));
        self.spectrum
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
        self.current = Some(info);
        self.loaded_once = true;

        tracing::info!(
            generation = info.generation,
            frames = info.frames,
            duration = ?info.duration,
            "Source loaded"
        );
        Ok(info)
    }

    /// Load and connect a source in one go
    pub async fn load_source(&mut self, source: AudioSource) -> Result<SourceInfo> {
        let pending = self.prepare_load(source)?;
        let fetched = pending.fetch().await;
        self.commit_load(fetched)
    }

    /// Drop the current source without loading another
    pub fn unload(&mut self) {
        if self.disposed {
            return;
        }
        self.generation += 1;
        self.context.graph().replace_source(None);
        self.current = None;
    }

    // ===== Parameters =====

    pub fn set_volume(&mut self, volume: f32) {
        if self.disposed {
            return;
        }
        self.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.context.graph().set_volume(self.volume);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Ignored for indices outside the band range
    pub fn set_equalizer_band(&mut self, index: usize, gain_db: f32) {
        if self.disposed || index >= BAND_COUNT || !gain_db.is_finite() {
            return;
        }
        self.equalizer[index] = gain_db;
        self.context.graph().set_equalizer_band(index, gain_db);
    }

    /// All bands change within one render block
    pub fn set_all_equalizer_bands(&mut self, gains: &[f32; BAND_COUNT]) {
        if self.disposed {
            return;
        }
        for (slot, &gain) in self.equalizer.iter_mut().zip(gains) {
            if gain.is_finite() {
                *slot = gain;
            }
        }
        self.context.graph().set_equalizer(&self.equalizer);
    }

    pub fn equalizer_bands(&self) -> [f32; BAND_COUNT] {
        self.equalizer
    }

    /// Changing room size or damping regenerates the impulse response
    pub fn set_reverb_settings(&mut self, settings: ReverbSettings) {
        if self.disposed {
            return;
        }
        let settings = settings.clamped();
        let sample_rate = self.sample_rate();
        let needs_impulse = !self
            .context
            .graph()
            .reverb_impulse()
            .matches(sample_rate, &settings);

        if needs_impulse {
            let impulse = ImpulseResponse::new(sample_rate, &settings);
            self.context.graph().set_reverb_impulse(settings, impulse);
            tracing::debug!(
                room_size = settings.room_size,
                damping = settings.damping,
                "Reverb impulse regenerated"
            );
        } else {
            self.context.graph().set_reverb_levels(settings);
        }
        self.reverb = settings;
    }

    pub fn reverb_settings(&self) -> ReverbSettings {
        self.reverb
    }

    pub fn set_chorus_settings(&mut self, settings: ChorusSettings) {
        if self.disposed {
            return;
        }
        self.chorus = settings.clamped();
        self.context.graph().set_chorus(self.chorus);
    }

    pub fn chorus_settings(&self) -> ChorusSettings {
        self.chorus
    }

    pub fn set_compressor_settings(&mut self, settings: CompressorSettings) {
        if self.disposed {
            return;
        }
        self.compressor = settings.clamped();
        self.context.graph().set_compressor(self.compressor);
    }

    pub fn compressor_settings(&self) -> CompressorSettings {
        self.compressor
    }

    /// Regenerates the waveshaping curve when the amount changes
    pub fn set_distortion_settings(&mut self, settings: DistortionSettings) {
        if self.disposed {
            return;
        }
        let settings = settings.clamped();
        if settings.amount != self.distortion.amount {
            let curve = distortion_curve(settings.amount);
            self.context
                .graph()
                .set_distortion_curve(settings.amount, curve);
        }
        if settings.oversample_mode != self.distortion.oversample_mode {
            self.context
                .graph()
                .set_distortion_oversample(settings.oversample_mode);
        }
        self.distortion = settings;
    }

    pub fn set_distortion_amount(&mut self, amount: f32) {
        self.set_distortion_settings(DistortionSettings {
            amount,
            ..self.distortion
        });
    }

    pub fn distortion_settings(&self) -> DistortionSettings {
        self.distortion
    }

    pub fn distortion_amount(&self) -> f32 {
        self.distortion.amount
    }

    // ===== Transport =====

    pub fn play(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(source) = self.context.graph().source_mut() {
            source.play();
        }
    }

    pub fn pause(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(source) = self.context.graph().source_mut() {
            source.pause();
        }
    }

    /// Pause and rewind to the start
    pub fn stop(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(source) = self.context.graph().source_mut() {
            source.stop();
        }
    }

    pub fn is_playing(&self) -> bool {
        !self.disposed
            && self
                .context
                .graph()
                .source()
                .is_some_and(SourceNode::is_playing)
    }

    /// The source ran out of samples
    pub fn has_ended(&self) -> bool {
        !self.disposed
            && self
                .context
                .graph()
                .source()
                .is_some_and(SourceNode::has_ended)
    }

    /// Position in seconds; 0 when nothing is loaded
    pub fn current_time(&self) -> f64 {
        if self.disposed {
            return 0.0;
        }
        self.context
            .graph()
            .source()
            .map_or(0.0, |s| s.position_frames() as f64 / f64::from(self.sample_rate()))
    }

    /// Declared duration in seconds; 0 when unknown or nothing is loaded
    pub fn duration(&self) -> f64 {
        self.current.and_then(|info| info.duration).unwrap_or(0.0)
    }

    /// Seek; only bounded by the decoded buffer
    pub fn set_current_time(&mut self, seconds: f64) {
        if self.disposed || !seconds.is_finite() {
            return;
        }
        let frame = (seconds.max(0.0) * f64::from(self.sample_rate())).round() as usize;
        if let Some(source) = self.context.graph().source_mut() {
            source.seek(frame);
        }
    }

    // ===== Analysis =====

    /// Byte-normalised magnitude per frequency bin
    ///
    /// Empty before the first successful load and after disposal.
    pub fn frequency_data(&self) -> Vec<u8> {
        if self.disposed || !self.loaded_once {
            return Vec::new();
        }
        let snapshot = self.context.graph().analysis_snapshot();
        self.spectrum
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .frequency_bytes(&snapshot)
    }

    /// Byte-normalised waveform, 128 is silence
    pub fn time_domain_data(&self) -> Vec<u8> {
        if self.disposed || !self.loaded_once {
            return Vec::new();
        }
        let snapshot = self.context.graph().analysis_snapshot();
        SpectrumAnalyzer::time_domain_bytes(&snapshot)
    }

    // ===== Clock =====

    /// Advance a manual clock by at least `frames`
    pub fn render(&mut self, frames: usize) -> Result<usize> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        self.context.render(frames)
    }

    /// Advance a manual clock by `seconds` of audio
    pub fn render_seconds(&mut self, seconds: f64) -> Result<usize> {
        let frames = (seconds.max(0.0) * f64::from(self.sample_rate())).ceil() as usize;
        self.render(frames)
    }

    pub fn is_running(&self) -> bool {
        !self.disposed && self.context.is_running()
    }

    pub fn clock(&self) -> RenderClock {
        self.context.config().clock
    }

    /// Stop playback, drop every node and close the context; idempotent
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(mut source) = self.context.graph().replace_source(None) {
            source.stop();
        }
        self.context.close();
        self.current = None;
        self.disposed = true;
        tracing::debug!("Signal graph engine disposed");
    }
}

impl Drop for SignalGraphEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}
