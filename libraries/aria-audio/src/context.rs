//! Render context: drives the graph on a clock and hands blocks to a sink
//!
//! Two clocks are supported. `Realtime` spawns a render thread paced to
//! wall-clock time; `Manual` renders only when the owner asks, which is how
//! tests and offline bouncing drive the graph.

use crate::error::{EngineError, Result};
use crate::graph::SignalGraph;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Who advances the render clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderClock {
    #[default]
    Realtime,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    pub sample_rate: u32,
    pub block_frames: usize,
    pub clock: RenderClock,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_frames: 512,
            clock: RenderClock::Realtime,
        }
    }
}

impl ContextConfig {
    pub fn manual(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            clock: RenderClock::Manual,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !(8000..=384_000).contains(&self.sample_rate) {
            return Err(EngineError::fatal(format!(
                "unsupported sample rate {}",
                self.sample_rate
            )));
        }
        if self.block_frames == 0 || self.block_frames > 16384 {
            return Err(EngineError::fatal(format!(
                "unsupported block size {}",
                self.block_frames
            )));
        }
        Ok(())
    }
}

/// Destination for rendered interleaved stereo blocks
pub trait AudioSink: Send {
    fn write(&mut self, block: &[f32], sample_rate: u32) -> Result<()>;

    /// Flush and close; called once when the context shuts down
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn write(&mut self, _block: &[f32], _sample_rate: u32) -> Result<()> {
        Ok(())
    }
}

/// Collects output in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    samples: Arc<Mutex<Vec<f32>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<f32> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AudioSink for MemorySink {
    fn write(&mut self, block: &[f32], _sample_rate: u32) -> Result<()> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(block);
        Ok(())
    }
}

/// Writes 16-bit stereo WAV
pub struct WavFileSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
}

impl WavFileSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        Ok(Self {
            writer: Some(hound::WavWriter::create(path, spec)?),
        })
    }
}

impl AudioSink for WavFileSink {
    fn write(&mut self, block: &[f32], _sample_rate: u32) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| EngineError::Sink("WAV file already finalized".into()))?;
        for &sample in block {
            writer.write_sample((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}

enum Driver {
    Realtime {
        stop: Sender<()>,
        thread: JoinHandle<()>,
    },
    Manual {
        sink: Box<dyn AudioSink>,
        block: Vec<f32>,
    },
    Closed,
}

/// Owns the shared graph and whatever drives it
pub struct RenderContext {
    config: ContextConfig,
    graph: Arc<Mutex<SignalGraph>>,
    alive: Arc<AtomicBool>,
    driver: Driver,
}

impl RenderContext {
    pub fn new(config: ContextConfig, graph: SignalGraph, sink: Box<dyn AudioSink>) -> Result<Self> {
        config.validate()?;
        let graph = Arc::new(Mutex::new(graph));
        let alive = Arc::new(AtomicBool::new(true));

        let driver = match config.clock {
            RenderClock::Manual => Driver::Manual {
                sink,
                block: vec![0.0; config.block_frames * 2],
            },
            RenderClock::Realtime => {
                let (stop, stop_rx) = bounded::<()>(1);
                let graph = Arc::clone(&graph);
                let alive = Arc::clone(&alive);
                let thread = std::thread::Builder::new()
                    .name("aria-render".into())
                    .spawn(move || render_loop(config, &graph, sink, &stop_rx, &alive))
                    .map_err(|e| EngineError::fatal(format!("failed to spawn render thread: {e}")))?;
                Driver::Realtime { stop, thread }
            }
        };

        tracing::debug!(
            sample_rate = config.sample_rate,
            block_frames = config.block_frames,
            clock = ?config.clock,
            "Render context started"
        );

        Ok(Self {
            config,
            graph,
            alive,
            driver,
        })
    }

    pub fn config(&self) -> ContextConfig {
        self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Lock the graph for a short control-side update
    pub fn graph(&self) -> MutexGuard<'_, SignalGraph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// False once the render thread died or the context was closed
    pub fn is_running(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !matches!(self.driver, Driver::Closed)
    }

    /// Render at least `frames` frames (rounded up to whole blocks)
    ///
    /// Only valid on a manual clock. Returns the number of frames rendered.
    pub fn render(&mut self, frames: usize) -> Result<usize> {
        let (sink, block) = match &mut self.driver {
            Driver::Manual { sink, block } => (sink, block),
            Driver::Realtime { .. } => return Err(EngineError::NotManual),
            Driver::Closed => return Err(EngineError::Disposed),
        };

        let block_frames = self.config.block_frames;
        let blocks = frames.div_ceil(block_frames);
        for _ in 0..blocks {
            self.graph
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .render(block);
            sink.write(block, self.config.sample_rate)?;
        }
        Ok(blocks * block_frames)
    }

    /// Stop rendering and release the sink; safe to call repeatedly
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.driver, Driver::Closed) {
            Driver::Realtime { stop, thread } => {
                let _ = stop.try_send(());
                drop(stop);
                if thread.join().is_err() {
                    tracing::error!("Render thread panicked");
                }
            }
            Driver::Manual { mut sink, .. } => {
                if let Err(e) = sink.finish() {
                    tracing::warn!("Failed to finish audio sink: {}", e);
                }
            }
            Driver::Closed => return,
        }
        self.alive.store(false, Ordering::Release);
        tracing::debug!("Render context closed");
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.close();
    }
}

fn render_loop(
    config: ContextConfig,
    graph: &Mutex<SignalGraph>,
    mut sink: Box<dyn AudioSink>,
    stop: &crossbeam_channel::Receiver<()>,
    alive: &AtomicBool,
) {
    let period =
        Duration::from_secs_f64(config.block_frames as f64 / f64::from(config.sample_rate));
    let mut block = vec![0.0; config.block_frames * 2];
    let mut deadline = Instant::now();

    loop {
        graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .render(&mut block);

        if let Err(e) = sink.write(&block, config.sample_rate) {
            tracing::error!("Audio sink failed, stopping render thread: {}", e);
            alive.store(false, Ordering::Release);
            break;
        }

        deadline += period;
        let wait = deadline.saturating_duration_since(Instant::now());
        match stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Err(e) = sink.finish() {
        tracing::warn!("Failed to finish audio sink: {}", e);
    }
}
