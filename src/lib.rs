//! Train and evaluate kernel max-margin machines.
//!
//! The crate solves the box-constrained dual problems of the classic
//! support vector formulations — C- and ν-classification, ε- and
//! ν-regression, and one-class novelty detection — with a sequential
//! minimal optimization decomposition method: second-order working set
//! selection, an LRU cache of kernel rows, and a shrinking heuristic.
//! Multi-class problems are handled by one-against-one voting over
//! independently solved class pairs.
//!
//! Training data is borrowed, never copied: models keep views into the
//! caller-owned samples, which therefore must stay unchanged between
//! fitting and prediction.
#![warn(missing_docs)]

pub mod kernel;
pub mod model;
pub mod problem;
pub mod smo;

mod error;
mod fit;
mod multiclass;
mod status;

pub use crate::error::{Result, SvmError};
pub use crate::fit::{
    fit_classification, fit_classification_precomputed, fit_one_class, fit_one_class_precomputed,
    fit_regression, fit_regression_precomputed, FailurePolicy, Svc, SvmParams, Svr,
};
pub use crate::model::{ClassificationModel, OneClassModel, RegressionModel};
pub use crate::smo::CancelCheck;
pub use crate::status::{Status, StatusCode};
