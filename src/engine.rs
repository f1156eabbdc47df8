// src/engine.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::config::{InvalidInputPolicy, PipelineConfig};
use crate::drivers::{BandPowerPipeline, PipelineError, SampleSource};
use crate::types::ResultRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// Nothing pulled yet, buffers still zero-filled.
    Idle,
    Streaming,
    /// Source exhausted, stopped, or halted on an error. Terminal.
    Drained,
}

/// Cooperative stop flag, checked before every pull from the source.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pull loop over a [`SampleSource`]: one [`ResultRecord`] per accepted
/// sample-set, in arrival order.
pub struct StreamDriver<S> {
    source: S,
    pipeline: BandPowerPipeline,
    policy: InvalidInputPolicy,
    delay: Option<Duration>,
    state: DriverState,
    stop: StopSignal,
    emitted: u64,
    rejected: u64,
}

impl<S: SampleSource> StreamDriver<S> {
    /// Every configuration error surfaces here, before the first pull.
    pub fn new(source: S, config: PipelineConfig) -> Result<Self, PipelineError> {
        let policy = config.invalid_input;
        let delay = config.inter_sample_delay();
        let pipeline = BandPowerPipeline::new(config)?;
        info!(
            "driver ready: {} channels, {} bands, window {}",
            pipeline.config().channels.len(),
            pipeline.config().bands.len(),
            pipeline.config().window_size
        );
        Ok(Self {
            source,
            pipeline,
            policy,
            delay,
            state: DriverState::Idle,
            stop: StopSignal::new(),
            emitted: 0,
            rejected: 0,
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn pipeline(&self) -> &BandPowerPipeline {
        &self.pipeline
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Next record, `None` once drained. An `Err` is yielded for a source
    /// failure, or for invalid input under [`InvalidInputPolicy::Halt`]; the
    /// driver is drained afterwards.
    pub fn next_record(&mut self) -> Option<Result<ResultRecord, PipelineError>> {
        loop {
            if self.state == DriverState::Drained {
                return None;
            }
            if self.state == DriverState::Streaming {
                if let Some(delay) = self.delay {
                    thread::sleep(delay);
                }
            }
            if self.stop.is_stopped() {
                info!("stop requested after {} records", self.emitted);
                self.transition(DriverState::Drained);
                return None;
            }

            let set = match self.source.next_sample_set() {
                Ok(Some(set)) => set,
                Ok(None) => {
                    self.transition(DriverState::Drained);
                    return None;
                }
                Err(err) => {
                    warn!("source failed: {err}");
                    self.transition(DriverState::Drained);
                    return Some(Err(err));
                }
            };
            if self.state == DriverState::Idle {
                self.transition(DriverState::Streaming);
            }

            match self.pipeline.process(&set) {
                Ok(record) => {
                    self.emitted += 1;
                    return Some(Ok(record));
                }
                Err(err) if err.is_invalid_input() && self.policy == InvalidInputPolicy::Skip => {
                    self.rejected += 1;
                    warn!(
                        "skipping sample-set (timestamp {:?}): {err}",
                        set.timestamp
                    );
                }
                Err(err) => {
                    self.rejected += 1;
                    warn!("halting on sample-set (timestamp {:?}): {err}", set.timestamp);
                    self.transition(DriverState::Drained);
                    return Some(Err(err));
                }
            }
        }
    }

    /// Run to the end of the stream, stopping at the first halting error.
    pub fn drain(&mut self) -> Result<Vec<ResultRecord>, PipelineError> {
        self.by_ref().collect()
    }

    fn transition(&mut self, next: DriverState) {
        if self.state != next {
            info!(
                "driver {:?} -> {:?} (emitted {}, rejected {})",
                self.state, next, self.emitted, self.rejected
            );
            self.state = next;
        }
    }
}

impl<S: SampleSource> Iterator for StreamDriver<S> {
    type Item = Result<ResultRecord, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}
