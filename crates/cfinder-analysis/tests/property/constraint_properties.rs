use cfinder_analysis::comparator::{Comparator, Status};
use cfinder_analysis::constraints::{ColumnSet, Confidence, ConstraintIdentity, ConstraintKind, IgnoreFilter};
use cfinder_analysis::resolver::ConstraintCandidate;
use cfinder_analysis::schema::{DeclaredSchema, SchemaConstraint};
use cfinder_core::config::SchemaSourceKind;
use proptest::prelude::*;

const COLUMNS: [&str; 5] = ["sku", "Region", "name", "PRICE", "email"];
const TABLES: [&str; 2] = ["shop_product", "shop_order"];

fn kind() -> impl Strategy<Value = ConstraintKind> {
    prop_oneof![
        Just(ConstraintKind::Unique),
        Just(ConstraintKind::NotNull),
        Just(ConstraintKind::Check),
    ]
}

fn identity() -> impl Strategy<Value = ConstraintIdentity> {
    (
        kind(),
        0..TABLES.len(),
        prop::collection::vec(0..COLUMNS.len(), 1..4),
    )
        .prop_map(|(kind, table, columns)| {
            let columns = ColumnSet::new(columns.into_iter().map(|i| COLUMNS[i]));
            ConstraintIdentity::new(kind, TABLES[table], columns, None)
        })
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

proptest! {
    #[test]
    fn column_sets_ignore_order_case_and_repeats(picks in prop::collection::vec(0..COLUMNS.len(), 0..8)) {
        let forward: Vec<&str> = picks.iter().map(|&i| COLUMNS[i]).collect();
        let mut reversed: Vec<String> = forward.iter().map(|c| c.to_ascii_uppercase()).collect();
        reversed.reverse();
        let a = ColumnSet::new(&forward);
        let b = ColumnSet::new(&reversed);
        prop_assert_eq!(&a, &b);

        let again = ColumnSet::new(a.iter());
        prop_assert_eq!(&again, &a);

        let names: Vec<&str> = a.iter().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(names, sorted);
    }

    #[test]
    fn every_candidate_is_classified_exactly_once(
        candidates in prop::collection::vec(identity(), 0..12),
        declared in prop::collection::vec(identity(), 0..12),
    ) {
        let candidates: Vec<ConstraintCandidate> = candidates.into_iter().map(candidate).collect();
        let constraints = declared.into_iter().map(|i| SchemaConstraint::new(i, "schema.sql")).collect();
        let schema = DeclaredSchema::new(SchemaSourceKind::Sql, constraints, &IgnoreFilter::default());
        let comparison = Comparator::default().compare(&candidates, &schema);

        prop_assert_eq!(comparison.classified.len(), candidates.len());
        prop_assert_eq!(comparison.coverage.len(), schema.len());
        for classified in &comparison.classified {
            prop_assert_eq!(classified.status == Status::Existing, classified.matched.is_some());
        }
        for entry in &comparison.coverage {
            prop_assert_eq!(entry.covered, !entry.covered_by.is_empty());
        }

        let existing: usize = comparison.metrics.iter().map(|m| m.existing).sum();
        let missing: usize = comparison.metrics.iter().map(|m| m.missing).sum();
        prop_assert_eq!(existing + missing, candidates.len());
    }

    #[test]
    fn comparison_is_deterministic(candidates in prop::collection::vec(identity(), 0..8)) {
        let candidates: Vec<ConstraintCandidate> = candidates.into_iter().map(candidate).collect();
        let constraints = candidates
            .iter()
            .take(3)
            .map(|c| SchemaConstraint::new(c.identity.clone(), "schema.sql"))
            .collect();
        let schema = DeclaredSchema::new(SchemaSourceKind::Sql, constraints, &IgnoreFilter::default());
        let first = Comparator::default().compare(&candidates, &schema);
        let second = Comparator::default().compare(&candidates, &schema);
        prop_assert_eq!(first, second);
    }
}
