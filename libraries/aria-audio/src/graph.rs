//! The linear signal graph
//!
//! `source → gain → equalizer → compressor → distortion → chorus → reverb →
//! analysis tap → output`
//!
//! All stages live for the lifetime of the graph. Replacing the source only
//! swaps the head and clears the stages' history.

use crate::analysis::AnalysisTap;
use crate::nodes::{
    AudioNode, Chorus, Compressor, Distortion, Equalizer, GainNode, ImpulseResponse, Reverb,
};
use aria_core::{ChorusSettings, CompressorSettings, OversampleMode, ReverbSettings, BAND_COUNT};
use std::sync::Arc;

/// Decoded interleaved stereo audio at the graph's sample rate, with transport
pub struct SourceNode {
    samples: Arc<[f32]>,
    position: usize,
    playing: bool,
    ended: bool,
}

impl SourceNode {
    pub fn new(samples: Arc<[f32]>) -> Self {
        Self {
            samples,
            position: 0,
            playing: false,
            ended: false,
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn position_frames(&self) -> usize {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Starting an ended source rewinds it first
    pub fn play(&mut self) {
        if self.ended {
            self.position = 0;
            self.ended = false;
        }
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.position = 0;
        self.ended = false;
    }

    pub fn seek(&mut self, frame: usize) {
        self.position = frame.min(self.frames());
        self.ended = false;
    }

    /// Write the next frames into `out`; silence when paused or past the end
    fn fill(&mut self, out: &mut [f32]) {
        if !self.playing {
            return;
        }
        let wanted = out.len() / 2;
        let available = self.frames() - self.position;
        let count = wanted.min(available);
        let start = self.position * 2;
        out[..count * 2].copy_from_slice(&self.samples[start..start + count * 2]);
        self.position += count;
        if self.position >= self.frames() {
            self.playing = false;
            self.ended = true;
        }
    }
}

/// The processing chain and its (optional) source
pub struct SignalGraph {
    sample_rate: u32,
    source: Option<SourceNode>,
    gain: GainNode,
    equalizer: Equalizer,
    compressor: Compressor,
    distortion: Distortion,
    chorus: Chorus,
    reverb: Reverb,
    analyser: AnalysisTap,
}

impl SignalGraph {
    pub fn new(sample_rate: u32, volume: f32) -> Self {
        Self {
            sample_rate,
            source: None,
            gain: GainNode::new(volume),
            equalizer: Equalizer::new(),
            compressor: Compressor::new(CompressorSettings::default()),
            distortion: Distortion::new(),
            chorus: Chorus::new(ChorusSettings::default()),
            reverb: Reverb::new(sample_rate, ReverbSettings::default()),
            analyser: AnalysisTap::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn chain_mut(&mut self) -> [&mut dyn AudioNode; 7] {
        [
            &mut self.gain,
            &mut self.equalizer,
            &mut self.compressor,
            &mut self.distortion,
            &mut self.chorus,
            &mut self.reverb,
            &mut self.analyser,
        ]
    }

    /// Render one block of interleaved stereo output
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if let Some(source) = self.source.as_mut() {
            source.fill(out);
        }
        let sample_rate = self.sample_rate;
        for node in self.chain_mut() {
            if node.is_active() {
                node.process(out, sample_rate);
            }
        }
    }

    /// Swap in a new head; the previous source is dropped
    pub fn replace_source(&mut self, source: Option<SourceNode>) -> Option<SourceNode> {
        for node in self.chain_mut() {
            node.reset();
        }
        std::mem::replace(&mut self.source, source)
    }

    pub fn source(&self) -> Option<&SourceNode> {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> Option<&mut SourceNode> {
        self.source.as_mut()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.gain.set_volume(volume);
    }

    pub fn set_equalizer_band(&mut self, index: usize, gain_db: f32) {
        self.equalizer.set_band(index, gain_db);
    }

    pub fn set_equalizer(&mut self, gains: &[f32; BAND_COUNT]) {
        self.equalizer.set_all(gains);
    }

    pub fn set_compressor(&mut self, settings: CompressorSettings) {
        self.compressor.set_settings(settings);
    }

    pub fn set_distortion_oversample(&mut self, mode: OversampleMode) {
        self.distortion.set_oversample(mode);
    }

    pub fn set_distortion_curve(&mut self, amount: f32, curve: Vec<f32>) {
        self.distortion.set_curve(amount, curve);
    }

    pub fn set_chorus(&mut self, settings: ChorusSettings) {
        self.chorus.set_settings(settings);
    }

    pub fn set_reverb_levels(&mut self, settings: ReverbSettings) {
        self.reverb.set_levels(settings);
    }

    pub fn set_reverb_impulse(&mut self, settings: ReverbSettings, impulse: ImpulseResponse) {
        self.reverb.set_impulse(settings, impulse);
    }

    pub fn reverb_impulse(&self) -> &ImpulseResponse {
        self.reverb.impulse()
    }

    pub fn analysis_snapshot(&self) -> Vec<f32> {
        self.analyser.snapshot()
    }
}
