#[macro_use]
extern crate bencher;

use bencher::Bencher;
use ndarray::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use wfleak::dataset::TraceData;
use wfleak::estimates::{hall_plugin, rule_of_thumb, FingerprintModeler,
                        KernelDensityEstimator};

/// Synthetic two-site dataset with one informative feature.
///
/// This only serves for benchmark purposes; the magnitudes are in the
/// range of typical website-fingerprinting features.
fn synthetic_data(n_per_site: usize) -> TraceData {
    let mut rng = StdRng::seed_from_u64(0);
    let n = 2 * n_per_site;
    let mut x = Array2::zeros((n, 1));
    let mut y = Array1::zeros(n);

    for site in 0..2 {
        for i in 0..n_per_site {
            let row = site * n_per_site + i;
            let noise: f64 = rng.sample(StandardNormal);
            x[[row, 0]] = (site as f64) * 10. + noise;
            y[row] = site;
        }
    }
    TraceData::new(x, y)
}

fn bench_rule_of_thumb(b: &mut Bencher) {
    let data = synthetic_data(250);
    let x = data.select(&[0], None).unwrap();
    b.iter(|| rule_of_thumb(&x.view()));
}

fn bench_hall_plugin(b: &mut Bencher) {
    let data = synthetic_data(250);
    let x = data.select(&[0], None).unwrap();
    b.iter(|| hall_plugin(&x.view()));
}

fn bench_kde_fit(b: &mut Bencher) {
    let data = synthetic_data(250);
    let x = data.select(&[0], Some(0)).unwrap();
    b.iter(|| KernelDensityEstimator::fit(x.clone()).unwrap());
}

fn bench_information_leakage(b: &mut Bencher) {
    let data = synthetic_data(250);
    let modeler = FingerprintModeler::with_budget(&data, 1000);
    b.iter(|| {
        let mut rng = StdRng::seed_from_u64(1);
        modeler.information_leakage(0, &mut rng).unwrap()
    });
}

benchmark_group!(benches, bench_rule_of_thumb, bench_hall_plugin,
                 bench_kde_fit, bench_information_leakage);
benchmark_main!(benches);
