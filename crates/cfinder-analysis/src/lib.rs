//! # cfinder-analysis
//!
//! Constraint inference for Django applications.
//! Provides source scanning, Python parsing, the model registry, the
//! pattern catalog and matcher, constraint resolution, declared schema
//! loading, comparison, history-issue evaluation and the run pipeline.

pub mod catalog;
pub mod comparator;
pub mod constraints;
pub mod history;
pub mod matcher;
pub mod parsers;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod schema;

pub use pipeline::{AnalysisEngine, RunReport};
