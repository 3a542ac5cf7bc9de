//! Classification output types.

use serde::{Deserialize, Serialize};

use crate::constraints::{ConstraintIdentity, ConstraintKind};
use crate::resolver::ConstraintCandidate;
use crate::schema::SchemaConstraint;

/// Whether a candidate is already declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Missing,
    Existing,
}

/// Outcome of comparing one candidate with one schema constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Match,
    /// Equal in every component except the delete behaviour.
    DeleteBehaviorConflict,
    NoMatch,
}

/// Precision view entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedCandidate {
    pub candidate: ConstraintCandidate,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<SchemaConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_behavior_conflict: Option<SchemaConstraint>,
}

/// Coverage view entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageEntry {
    pub constraint: SchemaConstraint,
    pub covered: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub covered_by: Vec<ConstraintIdentity>,
}

/// Counts for one constraint kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindMetrics {
    pub kind: ConstraintKind,
    pub candidates: usize,
    pub existing: usize,
    pub missing: usize,
    pub schema: usize,
    pub covered: usize,
    /// Percentage of schema constraints covered; absent with no schema
    /// constraints of this kind.
    pub coverage: Option<f64>,
}

impl KindMetrics {
    pub fn empty(kind: ConstraintKind) -> Self {
        Self {
            kind,
            candidates: 0,
            existing: 0,
            missing: 0,
            schema: 0,
            covered: 0,
            coverage: None,
        }
    }

    /// Add another application's counts and recompute coverage.
    pub fn absorb(&mut self, other: &KindMetrics) {
        self.candidates += other.candidates;
        self.existing += other.existing;
        self.missing += other.missing;
        self.schema += other.schema;
        self.covered += other.covered;
        self.coverage = percentage(self.covered, self.schema);
    }
}

pub(crate) fn percentage(part: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| part as f64 * 100.0 / total as f64)
}

/// Both views plus metrics for one application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub classified: Vec<ClassifiedCandidate>,
    pub coverage: Vec<CoverageEntry>,
    pub metrics: Vec<KindMetrics>,
}
