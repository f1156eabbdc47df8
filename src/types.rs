// src/types.rs
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::drivers::ColorCode;

// Frequency bands of interest
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandKind {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl BandKind {
    pub const ALL: [BandKind; 5] = [
        BandKind::Delta,
        BandKind::Theta,
        BandKind::Alpha,
        BandKind::Beta,
        BandKind::Gamma,
    ];

    /// Conventional edges in Hz, `[low, high)`.
    pub const fn default_edges(self) -> (f64, f64) {
        match self {
            BandKind::Delta => (0.5, 4.0),
            BandKind::Theta => (4.0, 8.0),
            BandKind::Alpha => (8.0, 13.0),
            BandKind::Beta => (13.0, 30.0),
            BandKind::Gamma => (30.0, 100.0),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            BandKind::Delta => "delta",
            BandKind::Theta => "theta",
            BandKind::Alpha => "alpha",
            BandKind::Beta => "beta",
            BandKind::Gamma => "gamma",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            BandKind::Delta => "Delta",
            BandKind::Theta => "Theta",
            BandKind::Alpha => "Alpha",
            BandKind::Beta => "Beta",
            BandKind::Gamma => "Gamma",
        }
    }
}

impl fmt::Display for BandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// A band together with the edges actually used for filtering
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub kind: BandKind,
    pub low_hz: f64,
    pub high_hz: f64,
}

impl Band {
    pub fn new(kind: BandKind, low_hz: f64, high_hz: f64) -> Self {
        Self {
            kind,
            low_hz,
            high_hz,
        }
    }

    pub fn standard(kind: BandKind) -> Self {
        let (low_hz, high_hz) = kind.default_edges();
        Self::new(kind, low_hz, high_hz)
    }
}

// Mental-state labels produced by the ratio classifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentalState {
    Relaxed,
    Concentrating,
    Drowsy,
    Neutral,
}

impl MentalState {
    pub const fn label(self) -> &'static str {
        match self {
            MentalState::Relaxed => "relaxed",
            MentalState::Concentrating => "concentrating",
            MentalState::Drowsy => "drowsy",
            MentalState::Neutral => "neutral",
        }
    }
}

impl fmt::Display for MentalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the alpha/theta decision table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Classification {
    pub ratio: f64,
    pub state: MentalState,
    /// Human-readable justification built from the actual inputs.
    pub note: String,
    /// True when theta power fell under epsilon and the denominator was substituted.
    pub denominator_clamped: bool,
}

/// Per-channel breakdown, only filled when detail output is enabled.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelPowers {
    pub channel: String,
    pub band_powers: BTreeMap<BandKind, f64>,
    pub alpha_theta_ratio: Option<f64>,
}

/// One record per processed sample-set. Immutable once emitted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRecord {
    pub sequence: u64,
    pub timestamp: Option<f64>,
    /// False while any channel window still contains zero-filled warm-up slots.
    pub warm: bool,
    pub band_powers: BTreeMap<BandKind, f64>,
    pub alpha_theta_ratio: Option<f64>,
    pub classification: Option<Classification>,
    pub color: Option<ColorCode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<ChannelPowers>,
}

impl ResultRecord {
    pub fn band_power(&self, kind: BandKind) -> Option<f64> {
        self.band_powers.get(&kind).copied()
    }

    pub fn state(&self) -> Option<MentalState> {
        self.classification.as_ref().map(|c| c.state)
    }
}
