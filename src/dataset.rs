//! In-memory container for website trace features.
//!
//! `TraceData` owns the full feature matrix and the per-instance site
//! labels, remapped to zero-based consecutive identifiers. The density
//! estimators never see the whole matrix: they request column
//! restrictions via `select`, optionally limited to one site's rows.
use ndarray::prelude::*;
use std::collections::HashMap;

use crate::estimates::EstimationError;
use crate::Site;

/// A loaded dataset of trace feature vectors with site labels.
pub struct TraceData {
    x: Array2<f64>,
    sites: Vec<Site>,
    site_rows: Vec<Vec<usize>>,
}

impl TraceData {
    /// Builds a dataset from a feature matrix (one row per trace) and
    /// the corresponding site labels.
    ///
    /// Labels are remapped to zero-based consecutive site identifiers,
    /// in order of first appearance.
    pub fn new(x: Array2<f64>, y: Array1<usize>) -> TraceData {
        assert_eq!(x.nrows(), y.len(),
                   "feature matrix and label vector must have equal length");

        let y = labels_to_ids(&y.view());
        let nsites = y.iter().max().map_or(0, |&s| s + 1);

        let mut site_rows = vec![Vec::new(); nsites];
        for (row, &site) in y.iter().enumerate() {
            site_rows[site].push(row);
        }

        TraceData {
            x,
            sites: (0..nsites).collect(),
            site_rows,
        }
    }

    /// Number of instances (traces).
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of features per instance.
    pub fn nfeatures(&self) -> usize {
        self.x.ncols()
    }

    /// The site identifiers, zero-based and consecutive.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn nsites(&self) -> usize {
        self.sites.len()
    }

    /// Number of instances belonging to `site`.
    pub fn site_count(&self, site: Site) -> usize {
        self.site_rows.get(site).map_or(0, Vec::len)
    }

    /// Returns the selected feature columns as an instances-by-features
    /// matrix, optionally restricted to the instances of one site.
    pub fn select(&self, features: &[usize], site: Option<Site>)
            -> Result<Array2<f64>, EstimationError> {
        if features.is_empty() {
            return Err(EstimationError::EmptySelection);
        }
        for &f in features {
            if f >= self.nfeatures() {
                return Err(EstimationError::UnknownFeature(f));
            }
        }

        let rows: Vec<usize> = match site {
            Some(site) => {
                if site >= self.nsites() {
                    return Err(EstimationError::UnknownSite(site));
                }
                self.site_rows[site].clone()
            },
            None => (0..self.len()).collect(),
        };

        let mut out = Array2::zeros((rows.len(), features.len()));
        for (i, &row) in rows.iter().enumerate() {
            for (j, &f) in features.iter().enumerate() {
                out[[i, j]] = self.x[[row, f]];
            }
        }
        Ok(out)
    }
}

/// Remaps arbitrary labels to zero-based consecutive ids, in order of
/// first appearance.
fn labels_to_ids(labels: &ArrayView1<usize>) -> Array1<Site> {
    let mut mapping: HashMap<usize, Site> = HashMap::new();
    let mut next_id = 0;

    let ids = labels.iter()
        .map(|&y| {
            *mapping.entry(y).or_insert_with(|| {
                next_id += 1;
                next_id - 1
            })
        })
        .collect::<Vec<_>>();

    Array1::from_vec(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> TraceData {
        // Labels 7 and 3 are remapped to 0 and 1.
        let x = array![[1., 10.],
                       [2., 20.],
                       [3., 30.],
                       [4., 40.]];
        let y = array![7, 3, 7, 3];
        TraceData::new(x, y)
    }

    #[test]
    fn labels_are_remapped_in_appearance_order() {
        let ids = labels_to_ids(&array![9, 4, 9, 0, 4].view());
        assert_eq!(ids, array![0, 1, 0, 2, 1]);
    }

    #[test]
    fn sites_are_zero_based() {
        let data = toy_data();
        assert_eq!(data.sites(), &[0, 1]);
        assert_eq!(data.nsites(), 2);
        assert_eq!(data.site_count(0), 2);
        assert_eq!(data.site_count(1), 2);
        assert_eq!(data.len(), 4);
        assert_eq!(data.nfeatures(), 2);
    }

    #[test]
    fn select_restricts_columns() {
        let data = toy_data();
        let x = data.select(&[1], None).unwrap();
        assert_eq!(x, array![[10.], [20.], [30.], [40.]]);

        let x = data.select(&[1, 0], None).unwrap();
        assert_eq!(x, array![[10., 1.], [20., 2.], [30., 3.], [40., 4.]]);
    }

    #[test]
    fn select_restricts_rows_to_site() {
        let data = toy_data();
        // Site 0 holds the rows originally labelled 7.
        let x = data.select(&[0], Some(0)).unwrap();
        assert_eq!(x, array![[1.], [3.]]);

        let x = data.select(&[0], Some(1)).unwrap();
        assert_eq!(x, array![[2.], [4.]]);
    }

    #[test]
    fn select_rejects_bad_input() {
        let data = toy_data();
        assert!(data.select(&[], None).is_err());
        assert!(data.select(&[2], None).is_err());
        assert!(data.select(&[0], Some(5)).is_err());
    }
}
