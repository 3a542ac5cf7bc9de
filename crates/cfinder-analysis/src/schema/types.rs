//! Declared-schema types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cfinder_core::config::SchemaSourceKind;

use crate::constraints::{ConstraintIdentity, DeleteBehavior, IgnoreFilter};

/// A constraint declared in the application's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConstraint {
    #[serde(flatten)]
    pub identity: ConstraintIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_behavior: Option<DeleteBehavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    /// File or model the declaration came from.
    pub origin: String,
}

impl SchemaConstraint {
    pub fn new(identity: ConstraintIdentity, origin: impl Into<String>) -> Self {
        Self {
            identity,
            delete_behavior: None,
            predicate: None,
            origin: origin.into(),
        }
    }

    pub fn with_delete_behavior(mut self, behavior: Option<DeleteBehavior>) -> Self {
        self.delete_behavior = behavior;
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }
}

/// The declared constraints of one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredSchema {
    pub source: SchemaSourceKind,
    /// Sorted by identity; one entry per identity.
    pub constraints: Vec<SchemaConstraint>,
}

impl DeclaredSchema {
    /// Drop ignored tables and columns and collapse equal identities,
    /// keeping the first declaration.
    pub fn new(source: SchemaSourceKind, constraints: Vec<SchemaConstraint>, filter: &IgnoreFilter) -> Self {
        let mut unique: BTreeMap<ConstraintIdentity, SchemaConstraint> = BTreeMap::new();
        for constraint in constraints {
            let identity = &constraint.identity;
            if identity.columns.is_empty()
                || filter.ignores_table(&identity.table)
                || identity.reference.as_ref().is_some_and(|r| filter.ignores_table(&r.table))
                || identity.columns.iter().any(|c| filter.ignores_column(c))
            {
                continue;
            }
            unique.entry(identity.clone()).or_insert(constraint);
        }
        Self {
            source,
            constraints: unique.into_values().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}
