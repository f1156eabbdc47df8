// src/config.rs
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::drivers::classify::{Thresholds, DEFAULT_EPSILON};
use crate::drivers::filter::{padding_for_order, validate_band, BandFilter, DEFAULT_ORDER};
use crate::drivers::PipelineError;
use crate::types::{Band, BandKind};

/// What the driver does with a sample-set that fails validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidInputPolicy {
    /// Log and drop the sample-set, keep streaming.
    #[default]
    Skip,
    /// Surface the error and stop the stream.
    Halt,
}

/// Everything fixed at stream start. Nothing here changes once a driver is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sampling_rate_hz: f64,
    pub window_size: usize,
    pub channels: Vec<String>,
    pub bands: Vec<Band>,
    pub filter_order: usize,
    pub thresholds: Thresholds,
    pub epsilon: f64,
    pub invalid_input: InvalidInputPolicy,
    pub inter_sample_delay_ms: Option<u64>,
    pub parallel: bool,
    pub per_channel_detail: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::playback()
    }
}

fn muse_channels() -> Vec<String> {
    ["TP9", "AF7", "AF8", "TP10"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn standard_bands(kinds: &[BandKind]) -> Vec<Band> {
    kinds.iter().copied().map(Band::standard).collect()
}

impl PipelineConfig {
    /// One-second window, all four classic bands.
    pub fn playback() -> Self {
        Self {
            sampling_rate_hz: 256.0,
            window_size: 256,
            channels: muse_channels(),
            bands: standard_bands(&[
                BandKind::Delta,
                BandKind::Theta,
                BandKind::Alpha,
                BandKind::Beta,
            ]),
            filter_order: DEFAULT_ORDER,
            thresholds: Thresholds::default(),
            epsilon: DEFAULT_EPSILON,
            invalid_input: InvalidInputPolicy::Skip,
            inter_sample_delay_ms: None,
            parallel: false,
            per_channel_detail: false,
        }
    }

    /// Half-second window, theta/alpha/beta only, per-channel breakdown.
    pub fn detail_view() -> Self {
        Self {
            window_size: 128,
            bands: standard_bands(&[BandKind::Theta, BandKind::Alpha, BandKind::Beta]),
            per_channel_detail: true,
            ..Self::playback()
        }
    }

    /// Four-second window for slower summary plots.
    pub fn summary_view() -> Self {
        Self {
            window_size: 1024,
            ..Self::playback()
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "playback" => Some(Self::playback()),
            "detail" => Some(Self::detail_view()),
            "summary" => Some(Self::summary_view()),
            _ => None,
        }
    }

    /// Read a JSON config; missing fields fall back to the playback preset.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.sampling_rate_hz > 0.0 && self.sampling_rate_hz.is_finite()) {
            return Err(PipelineError::InvalidSampleRate(self.sampling_rate_hz));
        }
        if self.window_size < 2 {
            return Err(PipelineError::InvalidWindowSize(self.window_size));
        }
        if self.filter_order == 0 {
            return Err(PipelineError::InvalidFilterOrder);
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(PipelineError::InvalidEpsilon(self.epsilon));
        }
        if self.channels.is_empty() {
            return Err(PipelineError::NoChannels);
        }
        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.as_str()) {
                return Err(PipelineError::DuplicateChannel(channel.clone()));
            }
        }
        if self.bands.is_empty() {
            return Err(PipelineError::NoBands);
        }
        let mut kinds = HashSet::new();
        for band in &self.bands {
            if !kinds.insert(band.kind) {
                return Err(PipelineError::DuplicateBand(band.kind.name().to_string()));
            }
            validate_band(band, self.sampling_rate_hz)?;
        }
        let padding = padding_for_order(self.filter_order);
        if self.window_size <= padding {
            return Err(PipelineError::WindowTooShort {
                window: self.window_size,
                padding,
            });
        }
        Ok(())
    }

    pub fn build_filters(&self) -> Result<Vec<BandFilter>, PipelineError> {
        self.bands
            .iter()
            .map(|band| BandFilter::design(*band, self.sampling_rate_hz, self.filter_order))
            .collect()
    }

    pub fn has_band(&self, kind: BandKind) -> bool {
        self.bands.iter().any(|b| b.kind == kind)
    }

    pub fn inter_sample_delay(&self) -> Option<Duration> {
        self.inter_sample_delay_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}
