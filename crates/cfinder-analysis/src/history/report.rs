//! History-mode output.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use cfinder_core::errors::Diagnostic;

use crate::comparator::types::percentage;
use crate::constraints::{ConstraintIdentity, ConstraintKind};
use crate::pipeline::CatalogInfo;

/// Outcome for one issue of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueOutcome {
    pub id: String,
    pub app: String,
    pub kind: ConstraintKind,
    pub expected: ConstraintIdentity,
    pub matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<ConstraintIdentity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pattern_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindRecall {
    pub kind: ConstraintKind,
    pub total: usize,
    pub matched: usize,
    pub recall: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallSummary {
    pub total: usize,
    pub matched: usize,
    pub recall: Option<f64>,
    pub per_kind: Vec<KindRecall>,
}

impl RecallSummary {
    pub fn from_outcomes(outcomes: &[IssueOutcome]) -> Self {
        let per_kind = ConstraintKind::ALL
            .iter()
            .map(|&kind| {
                let of_kind = outcomes.iter().filter(|o| o.kind == kind);
                let total = of_kind.clone().count();
                let matched = of_kind.filter(|o| o.matched).count();
                KindRecall {
                    kind,
                    total,
                    matched,
                    recall: percentage(matched, total),
                }
            })
            .collect();
        let matched = outcomes.iter().filter(|o| o.matched).count();
        Self {
            total: outcomes.len(),
            matched,
            recall: percentage(matched, outcomes.len()),
            per_kind,
        }
    }
}

/// Complete output of `cfinder history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryReport {
    pub version: String,
    pub manifest: PathBuf,
    pub catalog: CatalogInfo,
    /// Sorted by issue id.
    pub issues: Vec<IssueOutcome>,
    pub summary: RecallSummary,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed_ms: u64,
}
