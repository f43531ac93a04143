//! Faults raised by detector fitting.
//!
//! Only genuine failures live here. Not-ready scoring, degenerate spreads,
//! widened windows and short retrain buffers are ordinary return values.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    /// The ensemble was asked to fit on no samples.
    #[error("empty feature set: cannot fit an ensemble on zero samples")]
    EmptyFeatureSet,

    /// A sample violates the input contract.
    #[error("malformed sample at index {index}: {reason}")]
    MalformedSample { index: usize, reason: String },
}

impl From<DetectError> for ta_common::Error {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::EmptyFeatureSet => ta_common::Error::EmptyFeatureSet,
            DetectError::MalformedSample { index, reason } => ta_common::Error::MalformedInput {
                location: format!("sample {index}"),
                reason,
            },
        }
    }
}

/// Reject the first sample that breaks the intensity invariant.
pub fn validate_samples(samples: &[ta_common::Sample]) -> Result<(), DetectError> {
    for (index, sample) in samples.iter().enumerate() {
        sample
            .validate()
            .map_err(|reason| DetectError::MalformedSample { index, reason })?;
    }
    Ok(())
}
