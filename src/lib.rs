//! Streaming band-power analysis for multi-channel EEG.
//!
//! Sample-sets are pulled from a [`drivers::SampleSource`], pushed into one
//! sliding window per channel, band-pass filtered (zero-phase Butterworth),
//! reduced to mean-square power per band and channel, averaged across
//! channels, and turned into an alpha/theta ratio, a mental-state label and a
//! display colour. [`engine::StreamDriver`] runs the loop and yields one
//! [`types::ResultRecord`] per accepted sample-set.
pub mod config;
pub mod drivers;
pub mod engine;
pub mod recorder;
pub mod replay;
pub mod types;

pub use config::{InvalidInputPolicy, PipelineConfig};
pub use engine::{DriverState, StopSignal, StreamDriver};
pub use types::{Band, BandKind, Classification, MentalState, ResultRecord};
