//! Adaptive multivariate kernel density estimation.
//!
//! `KernelDensityEstimator` fits a product-Gaussian kernel mixture to a
//! weighted sample matrix, with one bandwidth per dimension selected
//! automatically (Hall plug-in, falling back to Rule-of-Thumb on
//! numerical failure). The fitted model supports drawing random samples,
//! evaluating the density at arbitrary points, and estimating
//! differential entropy.
use ndarray::prelude::*;
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;

use crate::estimates::bandwidth::{hall_plugin, rule_of_thumb};
use crate::estimates::EstimationError;

/// Bandwidth components that come out non-positive are replaced by this
/// constant to keep the kernels non-degenerate.
const MIN_BANDWIDTH: f64 = 0.001;

/// A fitted adaptive kernel density model.
///
/// Each training point is the center of one product-Gaussian kernel;
/// kernel weights sum to 1 and default to uniform.
pub struct KernelDensityEstimator {
    data: Array2<f64>,
    weights: Array1<f64>,
    bw: Array1<f64>,
}

impl KernelDensityEstimator {
    /// Fits a model with uniform kernel weights and automatic bandwidth.
    pub fn fit(data: Array2<f64>) -> Result<KernelDensityEstimator, EstimationError> {
        KernelDensityEstimator::new(data, None, None)
    }

    /// Fits a model with optional kernel weights and optional bandwidth.
    ///
    /// `weights`, if given, must have one non-negative entry per sample
    /// and a positive sum; they are normalized to sum to 1. If `bw` is
    /// not given, it is selected with the Hall plug-in method; if any
    /// component of the result is NaN or infinite, the Rule-of-Thumb
    /// method is used instead. Non-positive components of the final
    /// bandwidth are replaced by 0.001.
    ///
    /// At least 2 samples are required: neither bandwidth solver is
    /// defined for fewer.
    pub fn new(data: Array2<f64>, weights: Option<Array1<f64>>,
               bw: Option<Array1<f64>>)
            -> Result<KernelDensityEstimator, EstimationError> {
        let (n, d) = data.dim();
        if n < 2 {
            return Err(EstimationError::TooFewKernels(n));
        }
        if d == 0 {
            return Err(EstimationError::NoDimensions);
        }

        let weights = match weights {
            Some(w) => {
                if w.len() != n {
                    return Err(EstimationError::ShapeMismatch {
                        expected: n,
                        got: w.len(),
                    });
                }
                let total = w.sum();
                if w.iter().any(|&v| v < 0. || !v.is_finite()) || total <= 0. {
                    return Err(EstimationError::BadWeights);
                }
                w / total
            },
            None => Array1::from_elem(n, 1. / n as f64),
        };

        let bw = match bw {
            Some(bw) => {
                if bw.len() != d {
                    return Err(EstimationError::ShapeMismatch {
                        expected: d,
                        got: bw.len(),
                    });
                }
                bw
            },
            None => {
                let mut bw = hall_plugin(&data.view());
                if bw.iter().any(|v| !v.is_finite()) {
                    bw = rule_of_thumb(&data.view());
                }
                bw
            },
        };
        let bw = bw.mapv(|h| if h <= 0. { MIN_BANDWIDTH } else { h });

        Ok(KernelDensityEstimator { data, weights, bw })
    }

    /// Number of dimensions of the fitted model.
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// Number of kernels (training samples) in the fitted model.
    pub fn n_kernels(&self) -> usize {
        self.data.nrows()
    }

    /// The per-dimension bandwidth vector.
    pub fn bandwidth(&self) -> ArrayView1<f64> {
        self.bw.view()
    }

    /// Draws `n` random samples from the fitted density.
    ///
    /// Kernels are selected by walking the normalized cumulative kernel
    /// weights against `n` sorted uniform thresholds (inverse-CDF over
    /// the mixture); each selected kernel emits its center plus
    /// independent Gaussian noise scaled by the per-dimension bandwidth.
    ///
    /// The returned matrix is always exactly `n` rows by `dim()` columns.
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Array2<f64> {
        let (n_kernels, d) = self.data.dim();

        // Kernel weights represented as a normalized cumulative sum;
        // the final entry is 1.
        let mut cumw = Vec::with_capacity(n_kernels);
        let mut acc = 0.;
        for &w in self.weights.iter() {
            acc += w;
            cumw.push(acc);
        }
        for c in cumw.iter_mut() {
            *c /= acc;
        }

        // Sorted thresholds: one uniform draw per requested sample.
        let mut thresholds: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
        thresholds.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let mut points = Array2::zeros((n, d));
        let mut kernel = 0;
        for (i, &t) in thresholds.iter().enumerate() {
            // Advance to the first kernel whose cumulative weight
            // covers the threshold.
            while cumw[kernel] < t && kernel + 1 < n_kernels {
                kernel += 1;
            }
            for j in 0..d {
                let noise: f64 = rng.sample(StandardNormal);
                points[[i, j]] = self.data[[kernel, j]] + self.bw[j] * noise;
            }
        }

        // Internal consistency: a wrong shape here would silently corrupt
        // every downstream probability estimate.
        assert_eq!(points.nrows(), n);
        assert_eq!(points.ncols(), d);
        points
    }

    /// Evaluates the density estimate at each of the given points.
    ///
    /// The density is the weighted sum of product-Gaussian kernels,
    /// computed in log space with a max-shift for numerical stability.
    /// Values may underflow to exactly 0 far away from all kernels; this
    /// is a legitimate result, not an error.
    pub fn predict(&self, points: &ArrayView2<f64>) -> Array1<f64> {
        let (n_kernels, d) = self.data.dim();
        assert_eq!(points.ncols(), d,
                   "query points must match the fitted dimensionality");

        // log(1 / (h_1 ... h_d * (2*pi)^(d/2)))
        let log_norm = -self.bw.mapv(f64::ln).sum()
                       - 0.5 * d as f64 * (2. * PI).ln();

        let mut densities = Array1::zeros(points.nrows());
        let mut logs = vec![0.; n_kernels];
        for (m, point) in points.outer_iter().enumerate() {
            for (i, center) in self.data.outer_iter().enumerate() {
                let mut sq = 0.;
                for j in 0..d {
                    let u = (point[j] - center[j]) / self.bw[j];
                    sq += u * u;
                }
                logs[i] = self.weights[i].ln() + log_norm - 0.5 * sq;
            }
            let max = logs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            densities[m] = if max == f64::NEG_INFINITY {
                0.
            } else {
                let sum: f64 = logs.iter().map(|&l| (l - max).exp()).sum();
                max.exp() * sum
            };
        }
        densities
    }

    /// Differential entropy estimate (natural log).
    ///
    /// With `data` given, returns the negative mean log-density of those
    /// points under the model, or negative infinity if any of them has
    /// exactly zero density. Without `data`, evaluates the model's own
    /// kernel centers, weighted by the kernel weights; zero-density
    /// centers force negative infinity only when they carry nonzero
    /// weight, and contribute log(1) = 0 otherwise.
    pub fn entropy(&self, data: Option<&ArrayView2<f64>>) -> f64 {
        match data {
            Some(points) => {
                let probs = self.predict(points);
                if probs.iter().any(|&p| p == 0.) {
                    return f64::NEG_INFINITY;
                }
                -probs.mapv(f64::ln).mean().unwrap_or(0.)
            },
            None => {
                let probs = self.predict(&self.data.view());
                if probs.iter()
                        .zip(self.weights.iter())
                        .any(|(&p, &w)| p <= 0. && w != 0.) {
                    return f64::NEG_INFINITY;
                }
                -probs.iter()
                      .zip(self.weights.iter())
                      .filter(|(&p, _)| p > 0.)
                      .map(|(&p, &w)| p.ln() * w)
                      .sum::<f64>()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn toy_model() -> KernelDensityEstimator {
        let data = array![[0.], [1.], [2.]];
        KernelDensityEstimator::new(data, None, Some(array![1.])).unwrap()
    }

    #[test]
    fn fit_requires_two_samples() {
        assert!(KernelDensityEstimator::fit(array![[1.]]).is_err());
        assert!(KernelDensityEstimator::fit(array![[1.], [2.]]).is_ok());
    }

    #[test]
    fn fitted_bandwidth_is_strictly_positive() {
        // A constant column yields a zero rule-of-thumb bandwidth, which
        // must be substituted to keep the kernels non-degenerate.
        let data = array![[5., 1.], [5., 2.], [5., 3.], [5., 4.], [5., 5.]];
        let kde = KernelDensityEstimator::fit(data).unwrap();
        assert_eq!(kde.bandwidth()[0], MIN_BANDWIDTH);
        assert!(kde.bandwidth()[1] > 0.);
    }

    #[test]
    fn duplicate_points_fall_back_to_rule_of_thumb() {
        // The Hall plug-in degenerates on identical samples; the fit must
        // still succeed through the fallback chain.
        let data = array![[2.], [2.], [2.], [2.]];
        let kde = KernelDensityEstimator::fit(data).unwrap();
        assert_eq!(kde.bandwidth()[0], MIN_BANDWIDTH);
    }

    #[test]
    fn sample_returns_exact_shape() {
        let kde = toy_model();
        let mut rng = StdRng::seed_from_u64(7);
        for &n in &[0, 1, 7, 100] {
            let points = kde.sample(n, &mut rng);
            assert_eq!(points.nrows(), n);
            assert_eq!(points.ncols(), 1);
        }
    }

    #[test]
    fn sample_is_deterministic_under_fixed_seed() {
        let kde = toy_model();
        let a = kde.sample(20, &mut StdRng::seed_from_u64(99));
        let b = kde.sample(20, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn sample_respects_kernel_weights() {
        // All weight on the last kernel: every draw must come from it.
        let data = array![[0.], [0.], [100.]];
        let kde = KernelDensityEstimator::new(
            data, Some(array![0., 0., 1.]), Some(array![1.])).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let points = kde.sample(50, &mut rng);
        for p in points.outer_iter() {
            assert!(p[0] > 90.);
        }
    }

    #[test]
    fn predict_matches_direct_evaluation() {
        let kde = toy_model();
        // Uniform mixture of three unit-bandwidth Gaussians.
        let direct = |x: f64| -> f64 {
            [0., 1., 2.].iter()
                        .map(|c| (-0.5 * (x - c) * (x - c)).exp()
                                 / (2. * PI).sqrt())
                        .sum::<f64>() / 3.
        };
        let queries = array![[-1.], [0.], [0.5], [2.], [4.]];
        let probs = kde.predict(&queries.view());
        for (p, q) in probs.iter().zip(queries.column(0).iter()) {
            assert!(approx_eq!(f64, *p, direct(*q), epsilon = 1e-12));
        }
    }

    #[test]
    fn predict_underflows_to_zero_far_away() {
        let kde = toy_model();
        let probs = kde.predict(&array![[1e6]].view());
        assert_eq!(probs[0], 0.);
    }

    #[test]
    fn entropy_of_given_points() {
        let kde = toy_model();
        let points = array![[0.], [1.], [2.]];
        let probs = kde.predict(&points.view());
        let expected = -probs.mapv(f64::ln).mean().unwrap();
        assert!(approx_eq!(f64, kde.entropy(Some(&points.view())), expected,
                           epsilon = 1e-12));
    }

    #[test]
    fn entropy_is_negative_infinity_on_zero_density_points() {
        let kde = toy_model();
        let points = array![[0.], [1e6]];
        assert_eq!(kde.entropy(Some(&points.view())), f64::NEG_INFINITY);
    }

    #[test]
    fn entropy_of_training_points_is_weighted() {
        let kde = toy_model();
        let probs = kde.predict(&kde.data.view());
        let expected: f64 = -probs.iter().map(|p| p.ln() / 3.).sum::<f64>();
        assert!(approx_eq!(f64, kde.entropy(None), expected, epsilon = 1e-12));
    }
}
