use log::debug;
use serde::{Deserialize, Serialize};

use crate::drivers::PipelineError;
use crate::types::{Classification, MentalState};

pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Decision-table constants. The defaults are the contract values; a
/// configuration may override them for experiments.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Ratio strictly above this is `relaxed`.
    pub relaxed_ratio: f64,
    /// Ratio strictly below this is `drowsy` or `concentrating`.
    pub low_ratio: f64,
    /// Beta power strictly above this is `concentrating`.
    pub high_beta: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            relaxed_ratio: 1.0,
            low_ratio: 0.6,
            high_beta: 1.2,
        }
    }
}

/// `alpha / theta`, with theta replaced by `epsilon` when it is smaller.
/// The flag reports whether the substitution happened.
pub fn alpha_theta_ratio(alpha: f64, theta: f64, epsilon: f64) -> (f64, bool) {
    if theta < epsilon {
        (alpha / epsilon, true)
    } else {
        (alpha / theta, false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RatioClassifier {
    pub thresholds: Thresholds,
    pub epsilon: f64,
}

impl Default for RatioClassifier {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl RatioClassifier {
    pub fn new(thresholds: Thresholds, epsilon: f64) -> Self {
        Self {
            thresholds,
            epsilon,
        }
    }

    pub fn classify(
        &self,
        theta_power: f64,
        alpha_power: f64,
        beta_power: f64,
    ) -> Result<Classification, PipelineError> {
        for (what, value) in [
            ("theta power", theta_power),
            ("alpha power", alpha_power),
            ("beta power", beta_power),
        ] {
            if !value.is_finite() {
                return Err(PipelineError::NonFinitePower { what, value });
            }
        }
        let (ratio, clamped) = alpha_theta_ratio(alpha_power, theta_power, self.epsilon);
        if clamped {
            debug!(
                "theta power {theta_power:.3e} under epsilon {:.0e}; ratio denominator clamped",
                self.epsilon
            );
        }
        let t = self.thresholds;
        let beta_high = beta_power > t.high_beta;
        let beta_clause = if beta_high {
            format!("beta power {beta_power:.3} exceeds {:.2}", t.high_beta)
        } else {
            format!("beta power {beta_power:.3} is at most {:.2}", t.high_beta)
        };
        let (state, mut note) = if ratio > t.relaxed_ratio {
            (
                MentalState::Relaxed,
                format!(
                    "alpha/theta ratio {ratio:.3} is above {:.2}, indicating relaxation",
                    t.relaxed_ratio
                ),
            )
        } else if ratio < t.low_ratio {
            let state = if beta_high {
                MentalState::Concentrating
            } else {
                MentalState::Drowsy
            };
            let reading = if beta_high { "concentration" } else { "drowsiness" };
            (
                state,
                format!(
                    "alpha/theta ratio {ratio:.3} is below {:.2} and {beta_clause}, indicating {reading}",
                    t.low_ratio
                ),
            )
        } else {
            let state = if beta_high {
                MentalState::Concentrating
            } else {
                MentalState::Neutral
            };
            let reading = if beta_high {
                "concentration"
            } else {
                "a neutral state"
            };
            (
                state,
                format!(
                    "alpha/theta ratio {ratio:.3} lies within [{:.2}, {:.2}] and {beta_clause}, indicating {reading}",
                    t.low_ratio, t.relaxed_ratio
                ),
            )
        };
        if clamped {
            note.push_str(&format!(
                " (theta power {theta_power:.3e} below {:.0e}, denominator clamped)",
                self.epsilon
            ));
        }
        Ok(Classification {
            ratio,
            state,
            note,
            denominator_clamped: clamped,
        })
    }
}
