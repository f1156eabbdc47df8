use thiserror::Error;

/// Coarse classification of a [`PipelineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid band edges, sample rate, window size or channel set. Raised at stream start.
    Configuration,
    /// A malformed sample-set or aggregation input. The offending sample-set is rejected.
    InvalidInput,
    /// The external source failed to deliver a sample-set.
    Source,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("sample rate must be greater than zero, got {0}")]
    InvalidSampleRate(f64),
    #[error("window size must be at least 2 samples, got {0}")]
    InvalidWindowSize(usize),
    #[error("filter order must be at least 1")]
    InvalidFilterOrder,
    #[error("{band} band lower edge must be above 0 Hz, got {low_hz}")]
    BandBelowZero { band: String, low_hz: f64 },
    #[error("{band} band upper edge {high_hz} Hz must stay below Nyquist ({nyquist_hz} Hz)")]
    BandAboveNyquist {
        band: String,
        high_hz: f64,
        nyquist_hz: f64,
    },
    #[error("{band} band edges are inverted: {low_hz} Hz >= {high_hz} Hz")]
    BandInverted {
        band: String,
        low_hz: f64,
        high_hz: f64,
    },
    #[error("window of {window} samples is too short for filter edge padding of {padding}")]
    WindowTooShort { window: usize, padding: usize },
    #[error("no channels configured")]
    NoChannels,
    #[error("channel {0} configured more than once")]
    DuplicateChannel(String),
    #[error("no frequency bands configured")]
    NoBands,
    #[error("{0} band configured more than once")]
    DuplicateBand(String),
    #[error("epsilon must be finite and greater than zero, got {0}")]
    InvalidEpsilon(f64),
    #[error("sample-set is missing channel {0}")]
    MissingChannel(String),
    #[error("channel {channel} carries a non-finite sample ({value})")]
    NonFiniteSample { channel: String, value: f64 },
    #[error("{what} is not finite ({value})")]
    NonFinitePower { what: &'static str, value: f64 },
    #[error("cannot combine an empty set of power values")]
    EmptyAggregate,
    #[error("sample source failed: {0}")]
    Source(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidSampleRate(_)
            | PipelineError::InvalidWindowSize(_)
            | PipelineError::InvalidFilterOrder
            | PipelineError::BandBelowZero { .. }
            | PipelineError::BandAboveNyquist { .. }
            | PipelineError::BandInverted { .. }
            | PipelineError::WindowTooShort { .. }
            | PipelineError::NoChannels
            | PipelineError::DuplicateChannel(_)
            | PipelineError::NoBands
            | PipelineError::DuplicateBand(_)
            | PipelineError::InvalidEpsilon(_) => ErrorKind::Configuration,
            PipelineError::MissingChannel(_)
            | PipelineError::NonFiniteSample { .. }
            | PipelineError::NonFinitePower { .. }
            | PipelineError::EmptyAggregate => ErrorKind::InvalidInput,
            PipelineError::Source(_) => ErrorKind::Source,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        self.kind() == ErrorKind::InvalidInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            PipelineError::BandAboveNyquist {
                band: "beta".into(),
                high_hz: 30.0,
                nyquist_hz: 25.0
            }
            .kind(),
            ErrorKind::Configuration
        );
        assert!(PipelineError::MissingChannel("AF7".into()).is_invalid_input());
        assert!(PipelineError::EmptyAggregate.is_invalid_input());
        assert_eq!(PipelineError::Source("eof".into()).kind(), ErrorKind::Source);
    }
}
