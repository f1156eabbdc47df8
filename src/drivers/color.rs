use std::fmt;

use serde::{Serialize, Serializer};

use crate::drivers::classify::DEFAULT_EPSILON;
use crate::drivers::PipelineError;

/// 24-bit colour rendered as `0xRRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorCode {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl ColorCode {
    pub fn hex(&self) -> String {
        self.to_string()
    }

    pub fn as_u32(&self) -> u32 {
        (u32::from(self.red) << 16) | (u32::from(self.green) << 8) | u32::from(self.blue)
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl Serialize for ColorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Share of fast activity, `(alpha + beta) / (alpha + beta + theta + epsilon)`.
pub fn mood_value(theta: f64, alpha: f64, beta: f64, epsilon: f64) -> f64 {
    (alpha + beta) / (alpha + beta + theta + epsilon)
}

/// Map combined band powers onto a green (slow) to red (fast) gradient.
/// Delta is accepted for symmetry with the other bands but does not move the colour.
pub fn mood_color(delta: f64, theta: f64, alpha: f64, beta: f64) -> Result<ColorCode, PipelineError> {
    mood_color_with_epsilon(delta, theta, alpha, beta, DEFAULT_EPSILON)
}

pub fn mood_color_with_epsilon(
    delta: f64,
    theta: f64,
    alpha: f64,
    beta: f64,
    epsilon: f64,
) -> Result<ColorCode, PipelineError> {
    for (what, value) in [
        ("delta power", delta),
        ("theta power", theta),
        ("alpha power", alpha),
        ("beta power", beta),
    ] {
        if !value.is_finite() {
            return Err(PipelineError::NonFinitePower { what, value });
        }
    }
    let mood = mood_value(theta, alpha, beta, epsilon);
    if !mood.is_finite() {
        return Err(PipelineError::NonFinitePower {
            what: "mood value",
            value: mood,
        });
    }
    let normalized = mood.clamp(0.0, 1.0);
    Ok(ColorCode {
        red: (normalized * 255.0).round() as u8,
        green: ((1.0 - normalized) * 255.0).round() as u8,
        blue: 0,
    })
}
