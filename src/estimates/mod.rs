//! This module implements the adaptive kernel density estimator and the
//! Monte-Carlo information leakage estimate built on top of it.
pub mod bandwidth;
pub mod kde;
pub mod leakage;

pub use self::bandwidth::{hall_plugin, rule_of_thumb};
pub use self::kde::KernelDensityEstimator;
pub use self::leakage::{FeatureSelection, FingerprintModeler};

use thiserror::Error;

/// Errors returned when building or evaluating density models.
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("density estimation requires at least 2 samples, got {0}")]
    TooFewKernels(usize),

    #[error("samples must have at least one dimension")]
    NoDimensions,

    #[error("shape mismatch: expected length {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("kernel weights must be non-negative and sum to a positive value")]
    BadWeights,

    #[error("dataset contains no sites")]
    NoSites,

    #[error("unknown site: {0}")]
    UnknownSite(usize),

    #[error("unknown feature: {0}")]
    UnknownFeature(usize),

    #[error("no features selected")]
    EmptySelection,

    #[error("sample budget too small: no Monte-Carlo samples were allotted")]
    EmptyPool,
}

/// Shannon entropy, in bits, of a probability vector.
///
/// Zero entries are skipped; they contribute no information, and skipping
/// them keeps the sum finite.
pub fn shannon_entropy(probs: &[f64]) -> f64 {
    probs.iter()
         .filter(|&&p| p > 0.)
         .map(|&p| -p * p.log2())
         .sum()
}

/// Uniform prior probabilities over `k` classes.
pub fn uniform_priors(k: usize) -> Vec<f64> {
    vec![1. / (k as f64); k]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_of_uniform_priors() {
        // For k equiprobable classes the entropy is exactly log2(k).
        assert_eq!(shannon_entropy(&uniform_priors(2)), 1.0);
        assert_eq!(shannon_entropy(&uniform_priors(4)), 2.0);
        assert_eq!(shannon_entropy(&uniform_priors(8)), 3.0);
    }

    #[test]
    fn entropy_skips_zero_entries() {
        assert_eq!(shannon_entropy(&[0.5, 0.5, 0.]), 1.0);
        assert_eq!(shannon_entropy(&[1., 0., 0.]), 0.0);
        assert_eq!(shannon_entropy(&[]), 0.0);
    }
}
