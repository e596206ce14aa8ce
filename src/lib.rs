//! WFLEAK is a tool for estimating the information a set of traffic-analysis
//! features leaks about the identity of the website a network trace belongs
//! to. It treats the website ("site") as a secret and the observable trace
//! features as the system's outputs, and it measures how much the features
//! "leak" about the site, in bits of mutual information.
//!
//! Leakage is estimated without training a classifier: an adaptive kernel
//! density estimator (AKDE) models the class-conditional distribution of each
//! feature (or feature cluster) per site, and the conditional entropy of the
//! site given the features is then evaluated via Monte-Carlo integration over
//! samples drawn from the fitted models. The reported leakage for a feature
//! set F is the mutual information I(C;F) = H(C) - H(C|F).
//!
//! # Getting started
//!
//! WFLEAK is thought to be mainly used via the binary it provides, `wfleak`.
//! For usage instructions, refer to the help screen: `wfleak -h`.
//!
//! For the library documentation, please refer to the appropriate links
//! within this page.
//!
//! # References
//!
//! [1] 2018, "Measuring Information Leakage in Website Fingerprinting
//!     Attacks and Defenses". _Shuai Li, Huajun Guo, Nicholas Hopper_.
//!
//! [2] 1992, "Smoothed cross-validation". _Peter Hall, J. S. Marron,
//!     Byeong U. Park_.
pub mod dataset;
pub mod estimates;
pub mod leakage_estimation;

#[cfg(feature = "python-module")]
mod python_module;

/// Numeric identifier of a website (the class label of a trace).
pub type Site = usize;
