//! Resolver output types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use cfinder_core::errors::Diagnostic;

use crate::constraints::{Confidence, ConstraintIdentity, DeleteBehavior};
use crate::matcher::Finding;

const PREDICATE_JOIN: &str = " AND ";

/// A constraint inferred from code, with every Finding that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintCandidate {
    #[serde(flatten)]
    pub identity: ConstraintIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_behavior: Option<DeleteBehavior>,
    /// `column OP literal` for CHECK candidates. Distinct predicates from
    /// merged Findings are joined with ` AND ` in sorted order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    pub confidence: Confidence,
    /// Sorted, duplicate-free.
    pub provenance: Vec<Finding>,
}

impl ConstraintCandidate {
    pub fn pattern_ids(&self) -> BTreeSet<&str> {
        self.provenance.iter().map(|f| f.pattern_id.as_str()).collect()
    }

    pub fn files(&self) -> BTreeSet<&str> {
        self.provenance.iter().map(|f| f.file.as_str()).collect()
    }

    pub fn is_test_only(&self) -> bool {
        !self.provenance.is_empty() && self.provenance.iter().all(|f| f.is_test)
    }

    pub(crate) fn absorb(&mut self, finding: Finding, confidence: Confidence, predicate: Option<String>) {
        if confidence == Confidence::Exact {
            self.confidence = Confidence::Exact;
        }
        if let Some(predicate) = predicate {
            self.predicate = Some(match self.predicate.take() {
                Some(current) => {
                    let mut terms: BTreeSet<&str> = current.split(PREDICATE_JOIN).collect();
                    terms.insert(&predicate);
                    terms.into_iter().collect::<Vec<_>>().join(PREDICATE_JOIN)
                }
                None => predicate,
            });
        }
        if let Err(at) = self.provenance.binary_search(&finding) {
            self.provenance.insert(at, finding);
        }
    }
}

/// Why a candidate was set aside before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The column set is, or contains, the table's primary key.
    PrimaryKey,
    TooManyColumns { count: usize, max: usize },
    IgnoredTable { table: String },
    IgnoredColumn { column: String },
    /// Every Finding came from a test file.
    TestOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedCandidate {
    pub candidate: ConstraintCandidate,
    #[serde(flatten)]
    pub reason: ExclusionReason,
}

/// A candidate contradicted by nullable evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefutedCandidate {
    pub candidate: ConstraintCandidate,
    pub refuted_by: Vec<Finding>,
}

/// Everything the resolver produced for one application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resolution {
    /// Sorted by identity.
    pub candidates: Vec<ConstraintCandidate>,
    pub refuted: Vec<RefutedCandidate>,
    pub excluded: Vec<ExcludedCandidate>,
    pub diagnostics: Vec<Diagnostic>,
}
