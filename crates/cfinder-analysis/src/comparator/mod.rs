//! Comparator: classifies candidates against the declared schema.
//!
//! The precision view gives every candidate exactly one status; the
//! coverage view gives every schema constraint exactly one outcome.

pub mod types;

use cfinder_core::config::CompareConfig;

use crate::constraints::{ConstraintIdentity, ConstraintKind, DeleteBehavior};
use crate::resolver::ConstraintCandidate;
use crate::schema::{DeclaredSchema, SchemaConstraint};

pub use types::{
    ClassifiedCandidate, Comparison, CoverageEntry, KindMetrics, MatchOutcome, Status,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    implied_unique: bool,
}

impl Comparator {
    pub fn new(implied_unique: bool) -> Self {
        Self { implied_unique }
    }

    pub fn from_config(config: &CompareConfig) -> Self {
        Self::new(config.effective_implied_unique())
    }

    /// Compare one inferred constraint with one declared constraint.
    pub fn outcome(
        &self,
        identity: &ConstraintIdentity,
        delete_behavior: Option<DeleteBehavior>,
        declared: &SchemaConstraint,
    ) -> MatchOutcome {
        let other = &declared.identity;
        if identity.table != other.table {
            return MatchOutcome::NoMatch;
        }
        match identity.kind {
            ConstraintKind::Unique => {
                let matched = other.kind == ConstraintKind::Unique
                    && (other.columns == identity.columns
                        || (self.implied_unique && other.columns.is_subset(&identity.columns)));
                if matched {
                    MatchOutcome::Match
                } else {
                    MatchOutcome::NoMatch
                }
            }
            ConstraintKind::NotNull | ConstraintKind::Check => {
                if other.kind == identity.kind && other.columns == identity.columns {
                    MatchOutcome::Match
                } else {
                    MatchOutcome::NoMatch
                }
            }
            ConstraintKind::ForeignKey | ConstraintKind::CascadeDelete => {
                if other.kind != ConstraintKind::ForeignKey
                    || other.columns != identity.columns
                    || other.reference != identity.reference
                {
                    return MatchOutcome::NoMatch;
                }
                let wanted = match identity.kind {
                    ConstraintKind::CascadeDelete => Some(DeleteBehavior::Cascade),
                    _ => delete_behavior,
                };
                match (wanted, declared.delete_behavior) {
                    (Some(a), Some(b)) if a != b => MatchOutcome::DeleteBehaviorConflict,
                    _ => MatchOutcome::Match,
                }
            }
        }
    }

    pub fn compare(&self, candidates: &[ConstraintCandidate], schema: &DeclaredSchema) -> Comparison {
        let mut covered_by: Vec<Vec<ConstraintIdentity>> = vec![Vec::new(); schema.constraints.len()];
        let mut classified = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let mut matched: Option<&SchemaConstraint> = None;
            let mut conflict: Option<&SchemaConstraint> = None;
            for (i, declared) in schema.constraints.iter().enumerate() {
                match self.outcome(&candidate.identity, candidate.delete_behavior, declared) {
                    MatchOutcome::Match => {
                        matched.get_or_insert(declared);
                        covered_by[i].push(candidate.identity.clone());
                    }
                    MatchOutcome::DeleteBehaviorConflict => {
                        conflict.get_or_insert(declared);
                    }
                    MatchOutcome::NoMatch => {}
                }
            }
            let status = if matched.is_some() {
                Status::Existing
            } else {
                Status::Missing
            };
            classified.push(ClassifiedCandidate {
                candidate: candidate.clone(),
                status,
                matched: matched.cloned(),
                delete_behavior_conflict: if matched.is_none() { conflict.cloned() } else { None },
            });
        }

        let coverage: Vec<CoverageEntry> = schema
            .constraints
            .iter()
            .zip(covered_by)
            .map(|(constraint, covered_by)| CoverageEntry {
                constraint: constraint.clone(),
                covered: !covered_by.is_empty(),
                covered_by,
            })
            .collect();

        let metrics = metrics(&classified, &coverage);
        Comparison {
            classified,
            coverage,
            metrics,
        }
    }
}

/// Per-kind metrics. Schema constraints count under their own kind.
pub fn metrics(classified: &[ClassifiedCandidate], coverage: &[CoverageEntry]) -> Vec<KindMetrics> {
    ConstraintKind::ALL
        .iter()
        .map(|&kind| {
            let mut m = KindMetrics::empty(kind);
            for c in classified.iter().filter(|c| c.candidate.identity.kind == kind) {
                m.candidates += 1;
                match c.status {
                    Status::Existing => m.existing += 1,
                    Status::Missing => m.missing += 1,
                }
            }
            for e in coverage.iter().filter(|e| e.constraint.identity.kind == kind) {
                m.schema += 1;
                if e.covered {
                    m.covered += 1;
                }
            }
            m.coverage = types::percentage(m.covered, m.schema);
            m
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfinder_core::config::SchemaSourceKind;

    use crate::constraints::{ColumnRef, ColumnSet, Confidence};

    fn identity(kind: ConstraintKind, columns: &[&str], reference: Option<ColumnRef>) -> ConstraintIdentity {
        ConstraintIdentity::new(kind, "shop_item", ColumnSet::new(columns.iter().copied()), reference)
    }

    fn candidate(identity: ConstraintIdentity) -> ConstraintCandidate {
        ConstraintCandidate {
            identity,
            delete_behavior: None,
            predicate: None,
            confidence: Confidence::Exact,
            provenance: Vec::new(),
        }
    }

    fn schema(constraints: Vec<SchemaConstraint>) -> DeclaredSchema {
        DeclaredSchema {
            source: SchemaSourceKind::Sql,
            constraints,
        }
    }

    #[test]
    fn implied_unique_accepts_declared_subsets() {
        let declared = SchemaConstraint::new(identity(ConstraintKind::Unique, &["sku"], None), "x");
        let wide = identity(ConstraintKind::Unique, &["sku", "shop_id"], None);
        assert_eq!(Comparator::new(false).outcome(&wide, None, &declared), MatchOutcome::NoMatch);
        assert_eq!(Comparator::new(true).outcome(&wide, None, &declared), MatchOutcome::Match);
    }

    #[test]
    fn cascade_requires_cascading_foreign_key() {
        let reference = Some(ColumnRef::new("shop_shop", "id"));
        let cascade = identity(ConstraintKind::CascadeDelete, &["shop_id"], reference.clone());
        let fk = |behavior| {
            SchemaConstraint::new(identity(ConstraintKind::ForeignKey, &["shop_id"], reference.clone()), "x")
                .with_delete_behavior(behavior)
        };
        let comparator = Comparator::default();
        assert_eq!(comparator.outcome(&cascade, Some(DeleteBehavior::Cascade), &fk(Some(DeleteBehavior::Cascade))), MatchOutcome::Match);
        assert_eq!(comparator.outcome(&cascade, Some(DeleteBehavior::Cascade), &fk(None)), MatchOutcome::Match);
        assert_eq!(
            comparator.outcome(&cascade, Some(DeleteBehavior::Cascade), &fk(Some(DeleteBehavior::Restrict))),
            MatchOutcome::DeleteBehaviorConflict
        );
    }

    #[test]
    fn foreign_key_direction_matters() {
        let declared = SchemaConstraint::new(
            identity(ConstraintKind::ForeignKey, &["shop_id"], Some(ColumnRef::new("shop_shop", "id"))),
            "x",
        );
        let reversed = identity(ConstraintKind::ForeignKey, &["shop_id"], Some(ColumnRef::new("shop_other", "id")));
        assert_eq!(Comparator::default().outcome(&reversed, None, &declared), MatchOutcome::NoMatch);
    }

    #[test]
    fn views_are_total() {
        let declared = vec![
            SchemaConstraint::new(identity(ConstraintKind::Unique, &["sku"], None), "x"),
            SchemaConstraint::new(identity(ConstraintKind::NotNull, &["price"], None), "x"),
        ];
        let candidates = vec![
            candidate(identity(ConstraintKind::Unique, &["sku"], None)),
            candidate(identity(ConstraintKind::NotNull, &["name"], None)),
        ];
        let comparison = Comparator::default().compare(&candidates, &schema(declared));
        assert_eq!(comparison.classified.len(), 2);
        assert_eq!(comparison.coverage.len(), 2);
        assert_eq!(comparison.classified[0].status, Status::Existing);
        assert_eq!(comparison.classified[1].status, Status::Missing);
        assert!(comparison.coverage[0].covered);
        assert!(!comparison.coverage[1].covered);

        let unique = &comparison.metrics[0];
        assert_eq!(unique.kind, ConstraintKind::Unique);
        assert_eq!(unique.coverage, Some(100.0));
        let check = comparison.metrics.iter().find(|m| m.kind == ConstraintKind::Check).unwrap();
        assert_eq!(check.coverage, None);
    }
}
