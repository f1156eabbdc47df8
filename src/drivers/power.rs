use crate::drivers::PipelineError;

/// Mean squared amplitude of a filtered window: a time-domain proxy for band power.
/// An empty or all-zero window yields 0.0.
pub fn mean_square(window: &[f64]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().map(|v| v * v).sum::<f64>() / window.len() as f64
}

/// Arithmetic mean of per-channel powers for one band.
///
/// Values are summed in ascending order so the result does not depend on the
/// order channels were supplied in, down to the last bit.
pub fn combine(values: &[f64]) -> Result<f64, PipelineError> {
    if values.is_empty() {
        return Err(PipelineError::EmptyAggregate);
    }
    if let Some(&bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(PipelineError::NonFinitePower {
            what: "channel power",
            value: bad,
        });
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted.iter().sum::<f64>() / sorted.len() as f64)
}
