//! Utility routines for loading datasets and writing result files.
use csv::ReaderBuilder;
use ndarray::prelude::*;
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};

use wfleak::leakage_estimation::MISSING;

/// Loads a CSV data file.
///
/// The file format should be, for each row:
///     site, x1, x2, ...
/// where x1, x2, ... are features forming a feature vector.
pub fn load_data(fname: &str)
        -> Result<(Array2<f64>, Array1<usize>), Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
                                   .has_headers(false)
                                   .from_path(fname)?;

    let mut inputs: Vec<f64> = Vec::new();
    let mut targets: Vec<usize> = Vec::new();
    let mut ncols: Option<usize> = None;

    for result in reader.records() {
        let record = result?;

        for x in record.iter().skip(1) {
            inputs.push(x.trim().parse::<f64>()?);
        }
        targets.push(record[0].trim().parse::<usize>()?);

        if let Some(x) = ncols {
            if x != record.len() - 1 {
                return Err(format!("row {} has {} features, expected {}",
                                   targets.len(), record.len() - 1, x).into());
            }
        } else {
            ncols = Some(record.len() - 1);
        }
    }

    let d = ncols.ok_or("empty data file")?;
    let n = inputs.len() / d;
    let inputs_a = Array::from_vec(inputs).into_shape((n, d))?;

    Ok((inputs_a, Array::from_vec(targets)))
}

/// Loads a cluster file: one cluster per line, comma-separated feature
/// indices. Empty lines are skipped.
pub fn load_clusters(fname: &str) -> Result<Vec<Vec<usize>>, Box<dyn Error>> {
    let file = File::open(fname)?;
    let mut clusters = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        clusters.push(parse_cluster_line(&line)?);
    }
    Ok(clusters)
}

/// Parses one comma-separated cluster line.
fn parse_cluster_line(line: &str) -> Result<Vec<usize>, Box<dyn Error>> {
    line.split(',')
        .map(|v| v.trim().parse::<usize>().map_err(|e| e.into()))
        .collect()
}

/// Writes per-feature leakages as CSV: feature number, leakage in bits
/// (or a missing-value marker for failed estimates).
pub fn write_individual(fname: &str, leakages: &[Option<f64>])
        -> Result<(), Box<dyn Error>> {
    let mut file = File::create(fname)?;
    writeln!(file, "feature, leakage")?;
    for (feature, leakage) in leakages.iter().enumerate() {
        match leakage {
            Some(l) => writeln!(file, "{}, {}", feature, l)?,
            None => writeln!(file, "{}, {}", feature, MISSING)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_lines_parse() {
        assert_eq!(parse_cluster_line("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_cluster_line(" 4 , 0 ").unwrap(), vec![4, 0]);
        assert!(parse_cluster_line("1,x").is_err());
    }
}
