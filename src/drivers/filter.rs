//! Zero-phase Butterworth band-pass filtering of fixed-length windows.
//!
//! Design follows the classic route: analog Butterworth prototype, low-pass to
//! band-pass transform, bilinear transform, then second-order sections. Each
//! window is filtered forward and backward with odd-extension padding and
//! steady-state initial conditions, so the output stays time-aligned with the
//! input and an all-zero window stays all-zero.
use std::f64::consts::PI;

use log::trace;
use rustfft::num_complex::Complex64;

use crate::drivers::PipelineError;
use crate::types::Band;

pub const DEFAULT_ORDER: usize = 2;

// 2 * fs for a design normalised to fs = 2 (cutoffs expressed as a fraction of Nyquist)
const DESIGN_FS2: f64 = 4.0;
const IMAG_TOL: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Section {
    b: [f64; 3],
    a: [f64; 3], // a[0] == 1
}

impl Section {
    fn with_poles(a1: f64, a2: f64) -> Self {
        // one zero at z = 1 and one at z = -1
        Self {
            b: [1.0, 0.0, -1.0],
            a: [1.0, a1, a2],
        }
    }

    fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (self.a[0] + self.a[1] + self.a[2])
    }

    /// State (transposed direct form II) for a unit step already at steady state.
    fn step_state(&self) -> [f64; 2] {
        let h = self.dc_gain();
        [
            self.b[1] + self.b[2] - (self.a[1] + self.a[2]) * h,
            self.b[2] - self.a[2] * h,
        ]
    }

    fn response(&self, z_inv: Complex64) -> Complex64 {
        let z_inv2 = z_inv * z_inv;
        (z_inv * self.b[1] + z_inv2 * self.b[2] + self.b[0])
            / (z_inv * self.a[1] + z_inv2 * self.a[2] + self.a[0])
    }
}

/// Band-pass filter for one band at one sampling rate. Designed once, applied
/// to any number of windows without carrying state between them.
#[derive(Clone, Debug)]
pub struct BandFilter {
    band: Band,
    sections: Vec<Section>,
    step_states: Vec<[f64; 2]>,
    padding: usize,
}

impl BandFilter {
    pub fn design(band: Band, sample_rate_hz: f64, order: usize) -> Result<Self, PipelineError> {
        validate_band(&band, sample_rate_hz)?;
        if order == 0 {
            return Err(PipelineError::InvalidFilterOrder);
        }
        let nyquist = sample_rate_hz / 2.0;
        let warped_low = prewarp(band.low_hz / nyquist);
        let warped_high = prewarp(band.high_hz / nyquist);
        let bandwidth = warped_high - warped_low;
        let center = (warped_low * warped_high).sqrt();

        let poles = band_pass_poles(order, bandwidth, center);
        let mut sections = pair_sections(&poles);

        // unity gain at the (warped) geometric centre of the band
        let omega = 2.0 * (center / DESIGN_FS2).atan();
        let z_inv = Complex64::from_polar(1.0, -omega);
        let response = sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(z_inv));
        let gain = 1.0 / response.norm();
        if let Some(first) = sections.first_mut() {
            for b in &mut first.b {
                *b *= gain;
            }
        }

        let mut scale = 1.0;
        let step_states = sections
            .iter()
            .map(|s| {
                let [z0, z1] = s.step_state();
                let state = [z0 * scale, z1 * scale];
                scale *= s.dc_gain();
                state
            })
            .collect();
        let padding = padding_for_order(order);
        trace!(
            "designed {} band-pass {:.2}-{:.2} Hz @ {} Hz: {} sections, gain {:.3e}",
            band.kind,
            band.low_hz,
            band.high_hz,
            sample_rate_hz,
            sections.len(),
            gain
        );
        Ok(Self {
            band,
            sections,
            step_states,
            padding,
        })
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn order(&self) -> usize {
        self.sections.len()
    }

    /// Samples of odd extension added on each side before filtering.
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Forward-backward filter `window`; the result has the same length.
    pub fn apply(&self, window: &[f64]) -> Result<Vec<f64>, PipelineError> {
        if window.len() <= self.padding {
            return Err(PipelineError::WindowTooShort {
                window: window.len(),
                padding: self.padding,
            });
        }
        let extended = odd_extend(window, self.padding);
        let mut forward = self.run(&extended);
        forward.reverse();
        let mut backward = self.run(&forward);
        backward.reverse();
        Ok(backward[self.padding..self.padding + window.len()].to_vec())
    }

    fn run(&self, signal: &[f64]) -> Vec<f64> {
        let x0 = signal.first().copied().unwrap_or(0.0);
        let mut state: Vec<[f64; 2]> = self
            .step_states
            .iter()
            .map(|[z0, z1]| [z0 * x0, z1 * x0])
            .collect();
        signal
            .iter()
            .map(|&x| {
                let mut value = x;
                for (section, z) in self.sections.iter().zip(state.iter_mut()) {
                    let y = section.b[0] * value + z[0];
                    z[0] = section.b[1] * value - section.a[1] * y + z[1];
                    z[1] = section.b[2] * value - section.a[2] * y;
                    value = y;
                }
                value
            })
            .collect()
    }
}

/// One-shot helper: design a default-order filter for `band` and apply it.
pub fn band_pass(
    window: &[f64],
    band: Band,
    sample_rate_hz: f64,
) -> Result<Vec<f64>, PipelineError> {
    BandFilter::design(band, sample_rate_hz, DEFAULT_ORDER)?.apply(window)
}

pub fn padding_for_order(order: usize) -> usize {
    3 * (2 * order + 1)
}

pub fn validate_band(band: &Band, sample_rate_hz: f64) -> Result<(), PipelineError> {
    if !(sample_rate_hz > 0.0 && sample_rate_hz.is_finite()) {
        return Err(PipelineError::InvalidSampleRate(sample_rate_hz));
    }
    let name = band.kind.name().to_string();
    if !(band.low_hz > 0.0) {
        return Err(PipelineError::BandBelowZero {
            band: name,
            low_hz: band.low_hz,
        });
    }
    let nyquist_hz = sample_rate_hz / 2.0;
    if !(band.high_hz < nyquist_hz) {
        return Err(PipelineError::BandAboveNyquist {
            band: name,
            high_hz: band.high_hz,
            nyquist_hz,
        });
    }
    if band.low_hz >= band.high_hz {
        return Err(PipelineError::BandInverted {
            band: name,
            low_hz: band.low_hz,
            high_hz: band.high_hz,
        });
    }
    Ok(())
}

fn prewarp(normalized: f64) -> f64 {
    DESIGN_FS2 * (PI * normalized / 2.0).tan()
}

fn band_pass_poles(order: usize, bandwidth: f64, center: f64) -> Vec<Complex64> {
    let n = order as f64;
    let mut poles = Vec::with_capacity(2 * order);
    for k in 0..order {
        let m = (2 * k + 1) as f64 - n;
        let prototype = -Complex64::from_polar(1.0, PI * m / (2.0 * n));
        let scaled = prototype * (bandwidth / 2.0);
        let offset = (scaled * scaled - center * center).sqrt();
        for analog in [scaled + offset, scaled - offset] {
            poles.push((analog + DESIGN_FS2) / (-analog + DESIGN_FS2));
        }
    }
    poles
}

fn pair_sections(poles: &[Complex64]) -> Vec<Section> {
    let mut sections = Vec::with_capacity(poles.len() / 2);
    let mut real = Vec::new();
    for p in poles {
        if p.im > IMAG_TOL {
            sections.push(Section::with_poles(-2.0 * p.re, p.norm_sqr()));
        } else if p.im.abs() <= IMAG_TOL {
            real.push(p.re);
        }
    }
    real.sort_by(f64::total_cmp);
    for pair in real.chunks(2) {
        let r1 = pair[0];
        let r2 = pair.get(1).copied().unwrap_or(0.0);
        sections.push(Section::with_poles(-(r1 + r2), r1 * r2));
    }
    sections
}

fn odd_extend(x: &[f64], n: usize) -> Vec<f64> {
    let len = x.len();
    let first = x[0];
    let last = x[len - 1];
    let mut ext = Vec::with_capacity(len + 2 * n);
    ext.extend((1..=n).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=n).map(|i| 2.0 * last - x[len - 1 - i]));
    ext
}
