//! Model Registry: data-model classes, their tables and their columns.

pub mod extract;
pub mod registry;
pub mod types;

pub use extract::extract_classes;
pub use registry::ModelRegistry;
pub use types::{
    DeclaredClass, DeleteBehavior, FieldDefinition, FieldLocation, Lookup, MetaConstraint,
    ModelDefinition, RelationKind, RelationTarget, ThroughTable,
};
