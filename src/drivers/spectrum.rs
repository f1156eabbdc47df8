use std::collections::BTreeMap;

use rustfft::{num_complex::Complex64, FftPlanner};

use crate::drivers::WindowSnapshot;

/// Magnitude spectrum for each channel.
#[derive(Clone, Debug)]
pub struct FrequencySpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<Vec<f64>>, // channel -> bins
    pub channel_labels: Vec<String>,
}

impl FrequencySpectrum {
    /// Frequency of the strongest non-DC bin for `channel`.
    pub fn peak_frequency(&self, channel: usize) -> Option<f64> {
        let mags = self.magnitudes.get(channel)?;
        mags.iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .and_then(|(bin, _)| self.frequencies_hz.get(bin).copied())
    }

    /// Peak frequency keyed by channel label, skipping channels with no bins.
    pub fn dominant_frequencies(&self) -> BTreeMap<String, f64> {
        self.channel_labels
            .iter()
            .enumerate()
            .filter_map(|(i, label)| Some((label.clone(), self.peak_frequency(i)?)))
            .collect()
    }
}

/// Helper that computes FFTs for a given size, for plot-style sinks.
pub struct SpectrumBuilder {
    fft_size: usize,
}

impl SpectrumBuilder {
    pub fn with_size(fft_size: usize) -> Self {
        Self {
            fft_size: fft_size.max(2),
        }
    }

    /// Uses the most recent `fft_size` samples of each window, zero-padding shorter ones.
    pub fn compute(&self, snapshot: &WindowSnapshot) -> FrequencySpectrum {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(self.fft_size);
        let bin_hz = snapshot.sample_rate_hz / self.fft_size as f64;
        let frequencies = (0..self.fft_size / 2).map(|k| k as f64 * bin_hz).collect();
        let magnitudes = snapshot
            .samples
            .iter()
            .map(|channel| {
                let skip = channel.len().saturating_sub(self.fft_size);
                let mut buffer: Vec<Complex64> = channel
                    .iter()
                    .skip(skip)
                    .map(|&v| Complex64::new(v, 0.0))
                    .collect();
                buffer.resize(self.fft_size, Complex64::new(0.0, 0.0));
                fft.process(&mut buffer);
                buffer
                    .iter()
                    .take(self.fft_size / 2)
                    .map(|c| c.norm() / self.fft_size as f64)
                    .collect()
            })
            .collect();
        FrequencySpectrum {
            sample_rate_hz: snapshot.sample_rate_hz,
            frequencies_hz: frequencies,
            magnitudes,
            channel_labels: snapshot.channel_labels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn finds_dominant_rhythm() {
        let fs = 256.0;
        let tone: Vec<f64> = (0..256)
            .map(|n| (2.0 * PI * 10.0 * n as f64 / fs).sin())
            .collect();
        let snapshot = WindowSnapshot {
            sample_rate_hz: fs,
            channel_labels: vec!["TP9".into(), "AF7".into()],
            samples: vec![tone, vec![0.0; 256]],
            warm: true,
        };
        let spectrum = SpectrumBuilder::with_size(256).compute(&snapshot);
        assert_eq!(spectrum.frequencies_hz.len(), 128);
        assert_eq!(spectrum.magnitudes.len(), 2);
        assert_eq!(spectrum.peak_frequency(0), Some(10.0));
        assert!(spectrum.magnitudes[1].iter().all(|&m| m == 0.0));
        assert_eq!(spectrum.peak_frequency(5), None);
    }

    #[test]
    fn dominant_frequencies_are_keyed_by_label() {
        let fs = 128.0;
        let alpha: Vec<f64> = (0..128).map(|n| (2.0 * PI * 10.0 * n as f64 / fs).sin()).collect();
        let theta: Vec<f64> = (0..128).map(|n| (2.0 * PI * 6.0 * n as f64 / fs).cos()).collect();
        let snapshot = WindowSnapshot {
            sample_rate_hz: fs,
            channel_labels: vec!["AF7".into(), "TP10".into()],
            samples: vec![alpha, theta],
            warm: true,
        };
        let peaks = SpectrumBuilder::with_size(128).compute(&snapshot).dominant_frequencies();
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks["AF7"], 10.0);
        assert_eq!(peaks["TP10"], 6.0);
    }
}
