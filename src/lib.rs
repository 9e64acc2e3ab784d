//! Adaptest - statistical comparison of IoT vulnerability testing strategies
//!
//! Given repeated experiments in which a fixed static suite, a model-guided
//! (automl) suite and a random-selection control test the same network, this
//! library decides whether the adaptive strategy finds significantly more
//! vulnerabilities, how large the effect is, and how robust the conclusion is.
//!
//! The engine is a pure batch computation: [`analysis::analyze`] takes a
//! [`dataset::Dataset`] snapshot and an [`analysis::AnalysisConfig`] and
//! returns an [`analysis::AnalysisReport`]. It never fails; blocks that
//! cannot be computed are reported as warnings.

pub mod analysis;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod observation;
pub mod sanitize;
