//! Program Representation Builder: tree-sitter parsing normalized into a
//! uniform, location-annotated tree.

pub mod cache;
pub mod error_tolerant;
pub mod languages;
pub mod manager;
pub mod traits;
pub mod types;

pub use manager::ParserManager;
pub use traits::ParseLimits;
pub use types::{NodeKind, RepresentationNode, RepresentationTree, SourceLocation};
