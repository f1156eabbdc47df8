use crate::drivers::{PipelineError, SampleSet};

/// Immutable copy of every channel window, taken once per sample-set.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowSnapshot {
    pub sample_rate_hz: f64,
    pub channel_labels: Vec<String>,
    pub samples: Vec<Vec<f64>>, // channels x window
    pub warm: bool,
}

/// Fixed-length sliding window for one channel.
///
/// Slots start at 0.0 and stay zero-filled until `capacity` samples have been
/// pushed; output computed during that warm-up is degraded and flagged through
/// [`ChannelBuffer::is_warm`].
#[derive(Clone, Debug)]
pub struct ChannelBuffer {
    samples: Vec<f64>,
    pushed: u64,
}

impl ChannelBuffer {
    pub fn new(capacity: usize) -> Result<Self, PipelineError> {
        if capacity < 2 {
            return Err(PipelineError::InvalidWindowSize(capacity));
        }
        Ok(Self {
            samples: vec![0.0; capacity],
            pushed: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Shift every sample one slot towards index 0 and write `sample` last.
    pub fn push(&mut self, sample: f64) {
        self.samples.copy_within(1.., 0);
        let last = self.samples.len() - 1;
        self.samples[last] = sample;
        self.pushed = self.pushed.saturating_add(1);
    }

    pub fn snapshot(&self) -> &[f64] {
        &self.samples
    }

    pub fn is_warm(&self) -> bool {
        self.pushed >= self.samples.len() as u64
    }
}

/// One [`ChannelBuffer`] per configured channel, in configuration order.
pub struct ChannelBank {
    channel_labels: Vec<String>,
    buffers: Vec<ChannelBuffer>,
    sample_rate_hz: f64,
}

impl ChannelBank {
    pub fn new(
        channel_labels: Vec<String>,
        sample_rate_hz: f64,
        window_size: usize,
    ) -> Result<Self, PipelineError> {
        if !(sample_rate_hz > 0.0 && sample_rate_hz.is_finite()) {
            return Err(PipelineError::InvalidSampleRate(sample_rate_hz));
        }
        if channel_labels.is_empty() {
            return Err(PipelineError::NoChannels);
        }
        let buffers = channel_labels
            .iter()
            .map(|_| ChannelBuffer::new(window_size))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            channel_labels,
            buffers,
            sample_rate_hz,
        })
    }

    pub fn is_warm(&self) -> bool {
        self.buffers.iter().all(ChannelBuffer::is_warm)
    }

    /// Push one sample per channel. The whole set is validated first, so a
    /// rejected set leaves every buffer untouched.
    pub fn push_sample_set(&mut self, set: &SampleSet) -> Result<(), PipelineError> {
        let values = self.validate(set)?;
        self.commit(values);
        Ok(())
    }

    /// One finite value per configured channel, in label order.
    pub fn validate(&self, set: &SampleSet) -> Result<Vec<f64>, PipelineError> {
        let mut values = Vec::with_capacity(self.channel_labels.len());
        for label in &self.channel_labels {
            let value = set
                .value(label)
                .ok_or_else(|| PipelineError::MissingChannel(label.clone()))?;
            if !value.is_finite() {
                return Err(PipelineError::NonFiniteSample {
                    channel: label.clone(),
                    value,
                });
            }
            values.push(value);
        }
        Ok(values)
    }

    /// The snapshot a push of `values` would produce, without pushing.
    pub fn preview(&self, values: &[f64]) -> WindowSnapshot {
        WindowSnapshot {
            sample_rate_hz: self.sample_rate_hz,
            channel_labels: self.channel_labels.clone(),
            samples: self
                .buffers
                .iter()
                .zip(values)
                .map(|(buffer, &value)| {
                    let mut window = buffer.snapshot()[1..].to_vec();
                    window.push(value);
                    window
                })
                .collect(),
            warm: self
                .buffers
                .iter()
                .all(|b| b.pushed + 1 >= b.capacity() as u64),
        }
    }

    /// Push values previously returned by [`ChannelBank::validate`].
    pub fn commit(&mut self, values: Vec<f64>) {
        for (buffer, value) in self.buffers.iter_mut().zip(values) {
            buffer.push(value);
        }
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            sample_rate_hz: self.sample_rate_hz,
            channel_labels: self.channel_labels.clone(),
            samples: self.buffers.iter().map(|b| b.snapshot().to_vec()).collect(),
            warm: self.is_warm(),
        }
    }
}
