//! WFLEAK estimates how much information traffic-analysis features leak
//! about the identity of the website a network trace belongs to, in bits
//! of mutual information.
//!
//! # Getting started
//!
//! WFLEAK takes as input CSV data containing one trace per row:
//!
//!     0, 0.1, 2.43, 1.1
//!     1, 0.0, 1.22, 1.1
//!     1, 1.0, 1.02, 0.1
//!     ...
//!
//! where the first column identifies the site, and the remaining ones
//! form the trace's feature vector.
//!
//! It measures the leakage of each feature individually (in parallel,
//! with optional checkpointing), and optionally the combined leakage of
//! a set of feature clusters supplied in a separate file, one cluster of
//! comma-separated feature indices per line. Clusters are combined under
//! the assumption that they are statistically independent of each other.
//!
//! The general syntax is:
//!
//!     wfleak [options] <data>
//!
//! Estimates are Monte-Carlo based; `--n-samples` trades accuracy for
//! runtime, and `--seed` makes runs reproducible.
use docopt::Docopt;
use itertools::Itertools;
use log::info;
use serde::Deserialize;
use std::path::Path;

mod utils;

use crate::utils::{load_clusters, load_data, write_individual};
use wfleak::dataset::TraceData;
use wfleak::leakage_estimation::{run_combined_measure,
                                 run_individual_measure, MISSING};

const USAGE: &str = "
Estimate website-fingerprinting information leakage.

Usage: wfleak [options] <data>
       wfleak (--help | --version)

Options:
    --n-samples=<n>       Number of Monte-Carlo samples per estimate
                          [default: 5000].
    --n-procs=<p>         Worker threads for individual measurements;
                          0 uses all available cores [default: 0].
    --seed=<s>            Base seed for the sampling RNG. A random seed
                          is drawn (and logged) if not given.
    --individual=<file>   Write per-feature leakages to this CSV file.
    --clusters=<file>     Measure the combined leakage of the clusters
                          in this file (one cluster per line, with
                          comma-separated feature indices).
    --checkpoint=<file>   Append individual measurements to this file,
                          and resume from it on restart.
    -h, --help            Show help.
    --version             Show the version.
";

#[derive(Deserialize)]
struct Args {
    flag_n_samples: usize,
    flag_n_procs: usize,
    flag_seed: Option<u64>,
    flag_individual: Option<String>,
    flag_clusters: Option<String>,
    flag_checkpoint: Option<String>,
    arg_data: String,
}

fn main() {
    env_logger::init();

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| {
            d.version(Some(env!("CARGO_PKG_VERSION").into())).deserialize()
        })
        .unwrap_or_else(|e| e.exit());

    let (x, y) = load_data(&args.arg_data)
        .expect("[!] failed to load data");
    let data = TraceData::new(x, y);
    info!("loaded {} sites", data.nsites());
    info!("loaded {} instances with {} features", data.len(),
          data.nfeatures());

    // Size the worker pool; individual measurements are embarrassingly
    // parallel across features.
    if args.flag_n_procs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.flag_n_procs)
            .build_global()
            .expect("[!] failed to build the worker pool");
    }
    let parallel = args.flag_n_procs != 1;

    let seed = args.flag_seed.unwrap_or_else(rand::random);
    info!("base seed: {}", seed);

    // Per-feature measurements.
    let leakages = run_individual_measure(
        &data, args.flag_n_samples, seed, parallel,
        args.flag_checkpoint.as_deref().map(Path::new));

    let failed = leakages.iter().filter(|l| l.is_none()).count();
    println!("Measured {} features ({} failed)", leakages.len(), failed);

    println!("Top leaking features:");
    let ranked = leakages.iter()
        .enumerate()
        .filter_map(|(feature, leakage)| leakage.map(|l| (feature, l)))
        .sorted_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    for (feature, leakage) in ranked.take(10) {
        println!("  {}: {} bits", feature, leakage);
    }

    if let Some(fname) = &args.flag_individual {
        write_individual(fname, &leakages)
            .expect("[!] failed to write individual leakages");
        info!("individual leakages written to {}", fname);
    }

    // Combined measurement over externally supplied clusters.
    if let Some(fname) = &args.flag_clusters {
        let clusters = load_clusters(fname)
            .expect("[!] failed to load clusters");
        info!("loaded {} clusters", clusters.len());

        match run_combined_measure(&data, clusters, args.flag_n_samples,
                                   seed) {
            Some(leakage) =>
                println!("Combined leakage estimate: {} bits", leakage),
            None =>
                println!("Combined leakage estimate: {}", MISSING),
        }
    }
}
