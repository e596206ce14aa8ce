//! A wrapper to allow calling wfleak from Python.
//!
//! Wraps `FingerprintModeler::information_leakage()`.
use numpy::*;
use pyo3::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dataset::TraceData;
use crate::estimates::FingerprintModeler;

/// WFLEAK estimates the information that traffic-analysis features leak
/// about the identity of the website a network trace belongs to, in bits
/// of mutual information, via adaptive kernel density estimation and
/// Monte-Carlo integration.
#[pymodule(wfleak)]
fn pywfleak(_py: Python, m: &PyModule) -> PyResult<()> {
    /// information_leakage(x, y, clusters, n_samples, seed)
    /// --
    ///
    /// Estimate the combined leakage of the given feature clusters.
    ///
    /// Keyword arguments:
    /// x : trace feature matrix, one row per trace
    /// y : site label of each trace
    /// clusters : list of clusters, each a list of feature indices
    /// n_samples : number of Monte-Carlo samples
    /// seed : seed for the sampling RNG
    ///
    /// Returns the leakage in bits, or None if the estimation failed.
    #[pyfn(m, "information_leakage")]
    fn information_leakage_py(_py: Python,
                              x: &PyArray2<f64>, y: &PyArray1<usize>,
                              clusters: Vec<Vec<usize>>,
                              n_samples: usize, seed: u64)
            -> Option<f64> {
        let x = x.as_array().to_owned();
        let y = y.as_array().to_owned();

        let data = TraceData::new(x, y);
        let modeler = FingerprintModeler::with_budget(&data, n_samples);
        let mut rng = StdRng::seed_from_u64(seed);
        modeler.information_leakage(clusters, &mut rng)
    }
    Ok(())
}
