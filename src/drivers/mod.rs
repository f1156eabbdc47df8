// src/drivers/mod.rs
// signal-path building blocks, one concern per file
pub mod buffer;
pub mod classify;
pub mod color;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod power;
pub mod source;
pub mod spectrum;
// flat re-exports for callers outside the drivers tree
pub use buffer::{ChannelBank, ChannelBuffer, WindowSnapshot};
pub use classify::{RatioClassifier, Thresholds};
pub use color::{mood_color, ColorCode};
pub use error::{ErrorKind, PipelineError};
pub use filter::{band_pass, BandFilter};
pub use pipeline::BandPowerPipeline;
pub use power::{combine, mean_square};
pub use source::{ManualSource, SampleSet, SampleSource, SyntheticRhythms, SyntheticSource};
pub use spectrum::{FrequencySpectrum, SpectrumBuilder};
