//! Monte-Carlo estimation of the information leaked by trace features.
//!
//! `FingerprintModeler` fits one class-conditional density model per
//! (feature cluster, site) pair, draws a stratified Monte-Carlo sample
//! pool from the fitted models, and reduces the class-conditional
//! probabilities of the pooled samples to a single mutual-information
//! estimate: leakage = H(C) - H(C|F), in bits. Clusters are combined
//! under the assumption that they are statistically independent of each
//! other.
use log::{debug, error, warn};
use ndarray::prelude::*;
use rand::Rng;

use crate::dataset::TraceData;
use crate::estimates::{shannon_entropy, uniform_priors, EstimationError,
                       KernelDensityEstimator};
use crate::Site;

/// Default number of Monte-Carlo samples drawn per leakage estimate.
pub const DEFAULT_SAMPLE_BUDGET: usize = 5000;

/// Tolerated deviation of a normalized posterior vector's sum from 1.
const NORMALIZATION_TOLERANCE: f64 = 0.01;

/// The features to measure leakage for: a single feature, one cluster of
/// features modeled jointly, or several clusters combined under an
/// independence assumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSelection {
    Single(usize),
    Cluster(Vec<usize>),
    Clusters(Vec<Vec<usize>>),
}

impl FeatureSelection {
    /// Normalizes to the list-of-clusters form the estimator works on.
    fn into_clusters(self) -> Vec<Vec<usize>> {
        match self {
            FeatureSelection::Single(feature) => vec![vec![feature]],
            FeatureSelection::Cluster(cluster) => vec![cluster],
            FeatureSelection::Clusters(clusters) => clusters,
        }
    }
}

impl From<usize> for FeatureSelection {
    fn from(feature: usize) -> FeatureSelection {
        FeatureSelection::Single(feature)
    }
}

impl From<Vec<usize>> for FeatureSelection {
    fn from(cluster: Vec<usize>) -> FeatureSelection {
        FeatureSelection::Cluster(cluster)
    }
}

impl From<Vec<Vec<usize>>> for FeatureSelection {
    fn from(clusters: Vec<Vec<usize>>) -> FeatureSelection {
        FeatureSelection::Clusters(clusters)
    }
}

/// Estimates the information leakage of feature clusters over a dataset.
pub struct FingerprintModeler<'a> {
    data: &'a TraceData,
    sample_budget: usize,
}

impl<'a> FingerprintModeler<'a> {
    /// Creates a modeler with the default Monte-Carlo sample budget.
    pub fn new(data: &'a TraceData) -> FingerprintModeler<'a> {
        FingerprintModeler::with_budget(data, DEFAULT_SAMPLE_BUDGET)
    }

    /// Creates a modeler with the given Monte-Carlo sample budget.
    pub fn with_budget(data: &'a TraceData, sample_budget: usize)
            -> FingerprintModeler<'a> {
        FingerprintModeler { data, sample_budget }
    }

    /// Fits one density model over the selected features.
    ///
    /// With a `site`, the model is restricted to that site's instances
    /// (the class-conditional density p(f|c)); without, it covers all
    /// instances (the marginal density p(f)).
    pub fn make_kde(&self, features: &[usize], site: Option<Site>)
            -> Result<KernelDensityEstimator, EstimationError> {
        let x = self.data.select(features, site)?;
        KernelDensityEstimator::fit(x)
    }

    /// Draws the stratified Monte-Carlo pool for each cluster.
    ///
    /// Every site contributes `floor(budget * prior)` samples drawn from
    /// its own model (none when the allotment is zero), concatenated into
    /// one pooled matrix per cluster. The pool size is therefore at most
    /// `budget` due to flooring.
    fn draw_samples<R: Rng>(&self, models: &[Vec<KernelDensityEstimator>],
                            priors: &[f64], rng: &mut R)
            -> Vec<Array2<f64>> {
        let counts: Vec<usize> = priors.iter()
            .map(|p| (self.sample_budget as f64 * p) as usize)
            .collect();
        let total: usize = counts.iter().sum();

        models.iter()
              .map(|site_models| {
                  let d = site_models[0].dim();
                  let mut pool = Array2::zeros((total, d));
                  let mut row = 0;
                  for (model, &num) in site_models.iter().zip(&counts) {
                      if num == 0 {
                          continue;
                      }
                      let draws = model.sample(num, rng);
                      pool.slice_mut(s![row..row + num, ..]).assign(&draws);
                      row += num;
                  }
                  pool
              })
              .collect()
    }

    /// Estimates the information leakage, in bits, of the selected
    /// features.
    ///
    /// Any estimation failure (degenerate site data, invalid selection)
    /// is logged together with the offending clusters and reported as
    /// `None`, so that one broken feature does not abort a batch of
    /// measurements.
    pub fn information_leakage<S, R>(&self, selection: S, rng: &mut R)
            -> Option<f64>
    where S: Into<FeatureSelection>,
          R: Rng {
        let clusters = selection.into().into_clusters();
        match self.estimate(&clusters, rng) {
            Ok(leakage) => Some(leakage),
            Err(e) => {
                error!("estimation failed for clusters {:?}: {}", clusters, e);
                None
            },
        }
    }

    fn estimate<R: Rng>(&self, clusters: &[Vec<usize>], rng: &mut R)
            -> Result<f64, EstimationError> {
        debug!("measuring leakage for {:?}", clusters);
        if clusters.is_empty() {
            return Err(EstimationError::EmptySelection);
        }
        let sites = self.data.sites();
        let nsites = sites.len();
        if nsites == 0 {
            return Err(EstimationError::NoSites);
        }

        // One class-conditional density per (cluster, site) pair.
        let mut models = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let site_models = sites.iter()
                .map(|&site| self.make_kde(cluster, Some(site)))
                .collect::<Result<Vec<_>, _>>()?;
            models.push(site_models);
        }

        // H(C) under uniform site priors.
        let priors = uniform_priors(nsites);
        let class_entropy = shannon_entropy(&priors);

        // Stratified Monte-Carlo pool per cluster.
        let pools = self.draw_samples(&models, &priors, rng);
        let nsamples = pools[0].nrows();
        if nsamples == 0 {
            return Err(EstimationError::EmptyPool);
        }

        // Density of every pooled sample under every site's model,
        // indexed by (cluster, site, sample).
        let probs: Vec<Vec<Array1<f64>>> = models.iter()
            .zip(&pools)
            .map(|(site_models, pool)| {
                site_models.iter()
                           .map(|model| model.predict(&pool.view()))
                           .collect()
            })
            .collect();

        // Joint density per (site, sample): clusters are assumed
        // independent, so their densities multiply.
        let mut joint = Array2::from_elem((nsites, nsamples), 1.);
        for cluster_probs in &probs {
            for (site, site_probs) in cluster_probs.iter().enumerate() {
                for (m, &p) in site_probs.iter().enumerate() {
                    joint[[site, m]] *= p;
                }
            }
        }

        // Per-sample posterior over sites: weight by priors, normalize,
        // and accumulate the Shannon entropy of each sample.
        let mut entropy_sum = 0.;
        let mut posterior = vec![0.; nsites];
        for m in 0..nsamples {
            for site in 0..nsites {
                posterior[site] = joint[[site, m]] * priors[site];
            }
            let total: f64 = posterior.iter().sum();
            if total > 0. && total.is_finite() {
                for p in posterior.iter_mut() {
                    *p /= total;
                }
                let check: f64 = posterior.iter().sum();
                if (check - 1.).abs() > NORMALIZATION_TOLERANCE {
                    warn!("posterior probabilities sum to {}, not 1; \
                           the density estimates may be degenerate", check);
                }
                entropy_sum += shannon_entropy(&posterior);
            } else {
                // Every site's density underflowed to zero at this
                // sample; it carries no class information.
                warn!("posterior probabilities sum to {}, not 1; \
                       the density estimates may be degenerate", total);
            }
        }
        let cond_entropy = entropy_sum / nsamples as f64;

        // I(C;F) = H(C) - H(C|F)
        let leakage = class_entropy - cond_entropy;
        debug!("{} = {} - {}", leakage, class_entropy, cond_entropy);
        Ok(leakage)
    }
}
