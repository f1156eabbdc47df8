use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::TAU;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::drivers::PipelineError;

/// One multi-channel reading: a voltage per channel name, optionally timestamped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    pub timestamp: Option<f64>,
    pub values: BTreeMap<String, f64>,
}

impl SampleSet {
    pub fn new(timestamp: Option<f64>) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, channel: impl Into<String>, value: f64) -> Self {
        self.values.insert(channel.into(), value);
        self
    }

    pub fn insert(&mut self, channel: impl Into<String>, value: f64) {
        self.values.insert(channel.into(), value);
    }

    pub fn value(&self, channel: &str) -> Option<f64> {
        self.values.get(channel).copied()
    }

    pub fn num_channels(&self) -> usize {
        self.values.len()
    }
}

/// Pull interface over anything that yields sample-sets in arrival order.
/// `Ok(None)` means end-of-stream.
pub trait SampleSource {
    fn next_sample_set(&mut self) -> Result<Option<SampleSet>, PipelineError>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_sample_set(&mut self) -> Result<Option<SampleSet>, PipelineError> {
        (**self).next_sample_set()
    }
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<SampleSet>,
}

impl ManualSource {
    pub fn new(sets: impl IntoIterator<Item = SampleSet>) -> Self {
        Self {
            queue: sets.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl SampleSource for ManualSource {
    fn next_sample_set(&mut self) -> Result<Option<SampleSet>, PipelineError> {
        Ok(self.queue.pop_front())
    }
}

/// Amplitudes of the synthetic rhythms, in the source's voltage unit.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticRhythms {
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub noise: f64,
}

impl Default for SyntheticRhythms {
    fn default() -> Self {
        Self {
            theta: 1.0,
            alpha: 1.5,
            beta: 0.8,
            noise: 0.3,
        }
    }
}

/// Seeded generator of theta/alpha/beta sinusoids plus uniform noise.
pub struct SyntheticSource {
    channel_labels: Vec<String>,
    sample_rate_hz: f64,
    rhythms: SyntheticRhythms,
    remaining: usize,
    index: u64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(channel_labels: Vec<String>, sample_rate_hz: f64, count: usize, seed: u64) -> Self {
        Self {
            channel_labels,
            sample_rate_hz,
            rhythms: SyntheticRhythms::default(),
            remaining: count,
            index: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_rhythms(mut self, rhythms: SyntheticRhythms) -> Self {
        self.rhythms = rhythms;
        self
    }
}

impl SampleSource for SyntheticSource {
    fn next_sample_set(&mut self) -> Result<Option<SampleSet>, PipelineError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let t = self.index as f64 / self.sample_rate_hz;
        self.index += 1;
        let r = self.rhythms;
        let mut set = SampleSet::new(Some(t));
        for (idx, label) in self.channel_labels.iter().enumerate() {
            // small per-channel phase offset so channels are not identical
            let phase = idx as f64 * 0.35;
            let value = r.theta * (TAU * 6.0 * t + phase).sin()
                + r.alpha * (TAU * 10.0 * t + phase).sin()
                + r.beta * (TAU * 20.0 * t + phase).sin()
                + r.noise * self.rng.gen_range(-1.0..1.0);
            set.insert(label.clone(), value);
        }
        Ok(Some(set))
    }
}
