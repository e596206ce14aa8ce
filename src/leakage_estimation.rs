//! Batch leakage measurement routines.
//!
//! Given a loaded dataset, these functions drive the per-feature
//! ("individual") and per-cluster ("combined") leakage measurements.
//! Individual measurements are embarrassingly parallel and can be
//! dispatched over a thread pool; combined measurements always run
//! sequentially. Individual progress can be persisted to an append-only
//! plain-text checkpoint file, one leakage value per line, so that an
//! interrupted run resumes where it stopped.
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::dataset::TraceData;
use crate::estimates::FingerprintModeler;

/// Marker written to checkpoint and result files for failed estimates.
pub const MISSING: &str = "NA";

/// Features measured between two checkpoint flushes.
const CHECKPOINT_BATCH: usize = 64;

/// Measures the leakage of every feature, one at a time.
///
/// Each feature's estimate runs in isolation with its own
/// deterministically derived RNG, so results do not depend on whether
/// the measurements run serially or on the rayon thread pool, nor on the
/// number of worker threads.
///
/// If `checkpoint` is given, finished values are appended to it and any
/// values already present are reused instead of being recomputed.
pub fn run_individual_measure(data: &TraceData, sample_budget: usize,
                              seed: u64, parallel: bool,
                              checkpoint: Option<&Path>)
        -> Vec<Option<f64>> {
    let nfeatures = data.nfeatures();

    // Resume from a previous run, if any.
    let mut results = match checkpoint {
        Some(path) if path.exists() => {
            let file = std::fs::File::open(path)
                .expect("could not open checkpoint file");
            let past = parse_checkpoint(BufReader::new(file));
            info!("loaded {} finished features from checkpoint", past.len());
            past
        },
        _ => Vec::new(),
    };
    results.truncate(nfeatures);

    let mut checkpoint_file = checkpoint.map(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("could not open checkpoint file")
    });

    info!("begin individual leakage measurements");
    let progress_step = (nfeatures / 20).max(1);
    let remaining: Vec<usize> = (results.len()..nfeatures).collect();

    for batch in remaining.chunks(CHECKPOINT_BATCH) {
        let batch_results: Vec<Option<f64>> = if parallel {
            batch.par_iter()
                 .map(|&f| measure_one(data, sample_budget, seed, f))
                 .collect()
        } else {
            batch.iter()
                 .map(|&f| measure_one(data, sample_budget, seed, f))
                 .collect()
        };

        for (&feature, leakage) in batch.iter().zip(&batch_results) {
            if feature % progress_step == 0 {
                info!("progress: {}/{}", feature, nfeatures);
            }
            if let Some(file) = checkpoint_file.as_mut() {
                match leakage {
                    Some(l) => writeln!(file, "{}", l),
                    None => writeln!(file, "{}", MISSING),
                }.expect("could not write to checkpoint file");
            }
        }
        if let Some(file) = checkpoint_file.as_mut() {
            file.flush().expect("could not flush checkpoint file");
        }
        results.extend(batch_results);
    }

    info!("individual leakage measurements done");
    results
}

/// Measures the combined leakage of the given feature clusters.
///
/// Clusters share pruning history and are not independent workloads, so
/// this is always a single sequential estimate.
pub fn run_combined_measure(data: &TraceData, clusters: Vec<Vec<usize>>,
                            sample_budget: usize, seed: u64)
        -> Option<f64> {
    info!("begin combined leakage measurement over {} clusters",
          clusters.len());
    let modeler = FingerprintModeler::with_budget(data, sample_budget);
    let mut rng = StdRng::seed_from_u64(seed);
    modeler.information_leakage(clusters, &mut rng)
}

/// One isolated single-feature measurement.
fn measure_one(data: &TraceData, sample_budget: usize, seed: u64,
               feature: usize) -> Option<f64> {
    let modeler = FingerprintModeler::with_budget(data, sample_budget);
    let mut rng = StdRng::seed_from_u64(feature_seed(seed, feature));
    modeler.information_leakage(feature, &mut rng)
}

/// Derives an independent per-feature seed from the base seed.
fn feature_seed(seed: u64, feature: usize) -> u64 {
    seed ^ (feature as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Parses a checkpoint: one leakage value per line, `NA` for features
/// whose estimation failed.
fn parse_checkpoint<R: BufRead>(reader: R) -> Vec<Option<f64>> {
    reader.lines()
          .map(|line| line.expect("could not read checkpoint file"))
          .filter(|line| !line.trim().is_empty())
          .map(|line| {
              let line = line.trim();
              if line == MISSING {
                  None
              } else {
                  Some(line.parse::<f64>()
                           .expect("malformed checkpoint line"))
              }
          })
          .collect()
}
