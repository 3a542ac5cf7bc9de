//! Tests for classifying resolved candidates against a declared schema.

use std::path::Path;

use cfinder_analysis::comparator::{Comparator, MatchOutcome, Status};
use cfinder_analysis::constraints::{
    ColumnRef, ColumnSet, Confidence, ConstraintIdentity, ConstraintKind, DeleteBehavior, IgnoreFilter,
};
use cfinder_analysis::resolver::ConstraintCandidate;
use cfinder_analysis::schema::sql::parse_ddl;
use cfinder_analysis::schema::{DeclaredSchema, SchemaConstraint};
use cfinder_core::config::{SchemaSourceKind, SqlDialectKind};

const DDL: &str = "
CREATE TABLE shop_customer (id integer PRIMARY KEY, email text NOT NULL);
CREATE TABLE shop_product (
    id integer PRIMARY KEY,
    sku text NOT NULL,
    region text NOT NULL,
    UNIQUE (sku, region)
);
CREATE TABLE shop_order (
    id integer PRIMARY KEY,
    customer_id integer NOT NULL REFERENCES shop_customer (id) ON DELETE RESTRICT,
    product_id integer REFERENCES shop_product (id)
);
";

fn schema() -> DeclaredSchema {
    let constraints = parse_ddl(DDL, Path::new("schema.sql"), SqlDialectKind::Postgres).unwrap();
    DeclaredSchema::new(SchemaSourceKind::Sql, constraints, &IgnoreFilter::default())
}

fn candidate(kind: ConstraintKind, table: &str, columns: &[&str], reference: Option<ColumnRef>) -> ConstraintCandidate {
    ConstraintCandidate {
        identity: ConstraintIdentity::new(kind, table, ColumnSet::new(columns.iter().copied()), reference),
        delete_behavior: (kind == ConstraintKind::CascadeDelete).then_some(DeleteBehavior::Cascade),
        predicate: None,
        confidence: Confidence::Exact,
        provenance: Vec::new(),
    }
}

#[test]
fn declared_composite_unique_is_existing_and_covered() {
    let schema = schema();
    let candidates = vec![candidate(ConstraintKind::Unique, "shop_product", &["region", "sku"], None)];
    let comparison = Comparator::default().compare(&candidates, &schema);

    assert_eq!(comparison.classified[0].status, Status::Existing);
    let matched = comparison.classified[0].matched.as_ref().unwrap();
    assert_eq!(matched.identity.columns, ColumnSet::new(["sku", "region"]));

    let covered: Vec<&SchemaConstraint> = comparison
        .coverage
        .iter()
        .filter(|e| e.covered)
        .map(|e| &e.constraint)
        .collect();
    assert_eq!(covered, vec![matched]);
}

#[test]
fn undeclared_unique_is_missing() {
    let candidates = vec![candidate(ConstraintKind::Unique, "shop_customer", &["email"], None)];
    let comparison = Comparator::default().compare(&candidates, &schema());
    assert_eq!(comparison.classified[0].status, Status::Missing);
    assert!(comparison.classified[0].matched.is_none());
}

#[test]
fn unreferenced_not_null_yields_coverage_only() {
    let schema = schema();
    let comparison = Comparator::default().compare(&[], &schema);
    assert!(comparison.classified.is_empty());
    assert_eq!(comparison.coverage.len(), schema.len());
    let email = comparison
        .coverage
        .iter()
        .find(|e| e.constraint.identity == ConstraintIdentity::new(
            ConstraintKind::NotNull,
            "shop_customer",
            ColumnSet::single("email"),
            None,
        ))
        .unwrap();
    assert!(!email.covered);
    assert!(email.covered_by.is_empty());
}

#[test]
fn cascade_against_restricting_key_is_a_conflict() {
    let reference = Some(ColumnRef::new("shop_customer", "id"));
    let cascade = candidate(ConstraintKind::CascadeDelete, "shop_order", &["customer_id"], reference.clone());
    let comparison = Comparator::default().compare(std::slice::from_ref(&cascade), &schema());

    let classified = &comparison.classified[0];
    assert_eq!(classified.status, Status::Missing);
    let conflict = classified.delete_behavior_conflict.as_ref().unwrap();
    assert_eq!(conflict.delete_behavior, Some(DeleteBehavior::Restrict));

    let fk = candidate(ConstraintKind::ForeignKey, "shop_order", &["customer_id"], reference);
    let comparison = Comparator::default().compare(&[fk], &schema());
    assert_eq!(comparison.classified[0].status, Status::Existing);
}

#[test]
fn cascade_matches_key_without_declared_behavior() {
    let cascade = candidate(
        ConstraintKind::CascadeDelete,
        "shop_order",
        &["product_id"],
        Some(ColumnRef::new("shop_product", "id")),
    );
    let schema = schema();
    let declared = schema
        .constraints
        .iter()
        .find(|c| c.identity.kind == ConstraintKind::ForeignKey && c.identity.columns.contains("product_id"))
        .unwrap();
    assert_eq!(
        Comparator::default().outcome(&cascade.identity, cascade.delete_behavior, declared),
        MatchOutcome::Match
    );
}

#[test]
fn implied_unique_is_opt_in() {
    let wide = vec![candidate(ConstraintKind::Unique, "shop_product", &["region", "sku", "id"], None)];
    let strict = Comparator::new(false).compare(&wide, &schema());
    assert_eq!(strict.classified[0].status, Status::Missing);

    let implied = Comparator::new(true).compare(&wide, &schema());
    assert_eq!(implied.classified[0].status, Status::Existing);
}

#[test]
fn every_candidate_and_constraint_is_classified_once() {
    let schema = schema();
    let candidates = vec![
        candidate(ConstraintKind::Unique, "shop_product", &["region", "sku"], None),
        candidate(ConstraintKind::NotNull, "shop_product", &["sku"], None),
        candidate(ConstraintKind::NotNull, "shop_order", &["product_id"], None),
        candidate(ConstraintKind::Check, "shop_product", &["sku"], None),
    ];
    let comparison = Comparator::default().compare(&candidates, &schema);
    assert_eq!(comparison.classified.len(), candidates.len());
    assert_eq!(comparison.coverage.len(), schema.len());

    let missing = comparison.classified.iter().filter(|c| c.status == Status::Missing).count();
    let existing = comparison.classified.iter().filter(|c| c.status == Status::Existing).count();
    assert_eq!((existing, missing), (2, 2));

    let totals: usize = comparison.metrics.iter().map(|m| m.candidates).sum();
    assert_eq!(totals, candidates.len());
    let schema_total: usize = comparison.metrics.iter().map(|m| m.schema).sum();
    assert_eq!(schema_total, schema.len());

    let not_null = comparison
        .metrics
        .iter()
        .find(|m| m.kind == ConstraintKind::NotNull)
        .unwrap();
    assert_eq!(not_null.existing, 1);
    assert_eq!(not_null.missing, 1);
    assert!(not_null.coverage.is_some());
}
