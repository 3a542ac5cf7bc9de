//! Tests for resolving Findings into constraint candidates.

use std::path::Path;

use cfinder_analysis::constraints::{
    ColumnRef, ColumnSet, Confidence, ConstraintIdentity, ConstraintKind, DeleteBehavior, Effect,
    IgnoreFilter,
};
use cfinder_analysis::matcher::{Bindings, Finding, ModelRef, RefOrigin};
use cfinder_analysis::parsers::{ParserManager, SourceLocation};
use cfinder_analysis::registry::{extract_classes, ModelRegistry};
use cfinder_analysis::resolver::{ConstraintResolver, ExclusionReason, Resolution};
use cfinder_core::config::AnalysisConfig;

const MODELS: &str = r#"
from django.db import models

class Customer(models.Model):
    email = models.EmailField()
    name = models.CharField(max_length=50)

class Tag(models.Model):
    label = models.CharField(max_length=20)

class Product(models.Model):
    sku = models.CharField(max_length=20)
    region = models.CharField(max_length=10)
    price = models.DecimalField(max_digits=8, decimal_places=2)
    description = models.TextField(null=True)
    tags = models.ManyToManyField(Tag)

class Order(models.Model):
    customer = models.ForeignKey(Customer, on_delete=models.CASCADE)
    product = models.ForeignKey(Product, on_delete=models.PROTECT)
    quantity = models.IntegerField()
"#;

fn registry() -> ModelRegistry {
    let tree = ParserManager::new()
        .parse(MODELS.as_bytes(), Path::new("shop/models.py"))
        .unwrap();
    let classes = extract_classes(&tree.root, "shop/models.py", "shop");
    ModelRegistry::build("shop", classes, &AnalysisConfig::default().effective_model_bases())
}

fn finding(pattern: &str, kind: ConstraintKind, bindings: Bindings) -> Finding {
    Finding {
        app: "shop".to_string(),
        file: "shop/views.py".to_string(),
        location: SourceLocation::new(10, 5),
        pattern_id: pattern.to_string(),
        kind,
        effect: Effect::Infer,
        confidence: Confidence::Exact,
        bindings,
        is_test: false,
    }
}

fn unique(model: &str, columns: &[&str]) -> Finding {
    finding(
        "unique.check_then_act",
        ConstraintKind::Unique,
        Bindings {
            model: Some(ModelRef::class(model)),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        },
    )
}

fn field_finding(pattern: &str, kind: ConstraintKind, model: ModelRef, field: &str) -> Finding {
    finding(
        pattern,
        kind,
        Bindings {
            model: Some(model),
            field: Some(field.to_string()),
            ..Default::default()
        },
    )
}

fn resolve_with(filter: &IgnoreFilter, findings: &[Finding]) -> Resolution {
    let registry = registry();
    ConstraintResolver::new(&registry, filter, 3).resolve_all(findings)
}

fn resolve(findings: &[Finding]) -> Resolution {
    resolve_with(&IgnoreFilter::default(), findings)
}

#[test]
fn composite_unique_resolves_to_sorted_columns() {
    let resolution = resolve(&[unique("Product", &["sku", "region"])]);
    assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);
    assert_eq!(resolution.candidates.len(), 1);
    assert_eq!(
        resolution.candidates[0].identity,
        ConstraintIdentity::new(
            ConstraintKind::Unique,
            "shop_product",
            ColumnSet::new(["region", "sku"]),
            None
        )
    );
}

#[test]
fn equal_identities_merge_provenance() {
    let mut second = unique("Product", &["region", "sku"]);
    second.pattern_id = "unique.lookup_get".to_string();
    second.file = "shop/api.py".to_string();
    let first = unique("Product", &["sku", "region"]);

    let resolution = resolve(&[first.clone(), second, first]);
    assert_eq!(resolution.candidates.len(), 1);
    let candidate = &resolution.candidates[0];
    assert_eq!(candidate.provenance.len(), 2);
    assert_eq!(
        candidate.pattern_ids().into_iter().collect::<Vec<_>>(),
        vec!["unique.check_then_act", "unique.lookup_get"]
    );
    assert_eq!(
        candidate.files().into_iter().collect::<Vec<_>>(),
        vec!["shop/api.py", "shop/views.py"]
    );
}

#[test]
fn unknown_field_yields_only_a_diagnostic() {
    let resolution = resolve(&[unique("Product", &["sku", "colour"])]);
    assert!(resolution.candidates.is_empty());
    assert!(resolution.excluded.is_empty());
    assert_eq!(resolution.diagnostics.len(), 1);
    let diagnostic = &resolution.diagnostics[0];
    assert_eq!(diagnostic.code, "RESOLUTION_FAILED");
    assert!(diagnostic.message.contains("colour"));
}

#[test]
fn unknown_model_yields_a_diagnostic() {
    let resolution = resolve(&[unique("Invoice", &["number"])]);
    assert!(resolution.candidates.is_empty());
    assert_eq!(resolution.diagnostics.len(), 1);
}

#[test]
fn primary_key_candidates_are_excluded() {
    let resolution = resolve(&[
        unique("Product", &["id", "sku"]),
        field_finding("not_null.operand", ConstraintKind::NotNull, ModelRef::class("Product"), "pk"),
    ]);
    assert!(resolution.candidates.is_empty());
    assert_eq!(resolution.excluded.len(), 2);
    assert!(resolution
        .excluded
        .iter()
        .all(|e| e.reason == ExclusionReason::PrimaryKey));
}

#[test]
fn wide_unique_sets_are_excluded() {
    let resolution = resolve(&[unique("Product", &["sku", "region", "price", "description"])]);
    assert!(resolution.candidates.is_empty());
    assert_eq!(
        resolution.excluded[0].reason,
        ExclusionReason::TooManyColumns { count: 4, max: 3 }
    );
}

#[test]
fn test_only_candidates_are_excluded() {
    let mut from_test = unique("Product", &["sku"]);
    from_test.is_test = true;
    let resolution = resolve(&[from_test]);
    assert!(resolution.candidates.is_empty());
    assert_eq!(resolution.excluded[0].reason, ExclusionReason::TestOnly);
}

#[test]
fn ignored_columns_are_excluded() {
    let filter = IgnoreFilter::new(&[], &["region".to_string()]);
    let resolution = resolve_with(&filter, &[unique("Product", &["sku", "region"])]);
    assert!(resolution.candidates.is_empty());
    assert_eq!(
        resolution.excluded[0].reason,
        ExclusionReason::IgnoredColumn {
            column: "region".to_string()
        }
    );
}

#[test]
fn nullable_evidence_refutes_not_null() {
    let inferred = field_finding(
        "not_null.dereference",
        ConstraintKind::NotNull,
        ModelRef::class("Product"),
        "description",
    );
    let mut refuting = field_finding(
        "not_null.none_assignment",
        ConstraintKind::NotNull,
        ModelRef::class("Product"),
        "description",
    );
    refuting.effect = Effect::Refute;
    refuting.is_test = true;

    let resolution = resolve(&[inferred, refuting.clone()]);
    assert!(resolution.candidates.is_empty());
    assert_eq!(resolution.refuted.len(), 1);
    assert_eq!(resolution.refuted[0].refuted_by, vec![refuting]);
}

#[test]
fn refutation_alone_produces_nothing() {
    let mut refuting = field_finding(
        "not_null.none_assignment",
        ConstraintKind::NotNull,
        ModelRef::class("Product"),
        "price",
    );
    refuting.effect = Effect::Refute;
    let resolution = resolve(&[refuting]);
    assert!(resolution.candidates.is_empty());
    assert!(resolution.refuted.is_empty());
}

#[test]
fn many_to_many_add_targets_the_join_table() {
    let resolution = resolve(&[field_finding(
        "unique.m2m_add",
        ConstraintKind::Unique,
        ModelRef::class("Product"),
        "tags",
    )]);
    assert_eq!(
        resolution.candidates[0].identity,
        ConstraintIdentity::new(
            ConstraintKind::Unique,
            "shop_product_tags",
            ColumnSet::new(["product_id", "tag_id"]),
            None
        )
    );
}

#[test]
fn relationship_paths_are_followed() {
    let model = ModelRef::class("Order").push("customer");
    let resolution = resolve(&[field_finding(
        "not_null.dereference",
        ConstraintKind::NotNull,
        model,
        "email",
    )]);
    assert_eq!(resolution.candidates[0].identity.table, "shop_customer");
    assert_eq!(resolution.candidates[0].identity.columns, ColumnSet::single("email"));
}

#[test]
fn guessed_parent_lowers_confidence() {
    let resolution = resolve(&[finding(
        "fk.keyword_key",
        ConstraintKind::ForeignKey,
        Bindings {
            model: Some(ModelRef::class("Order")),
            field: Some("customer_id".to_string()),
            ref_model: Some(ModelRef {
                origin: RefOrigin::Guess,
                name: "customer".to_string(),
                path: Vec::new(),
            }),
            ref_field: Some("id".to_string()),
            ..Default::default()
        },
    )]);
    let candidate = &resolution.candidates[0];
    assert_eq!(
        candidate.identity,
        ConstraintIdentity::new(
            ConstraintKind::ForeignKey,
            "shop_order",
            ColumnSet::single("customer_id"),
            Some(ColumnRef::new("shop_customer", "id"))
        )
    );
    assert_eq!(candidate.confidence, Confidence::Heuristic);
}

#[test]
fn cascade_cleanup_resolves_through_the_relation() {
    let resolution = resolve(&[field_finding(
        "cascade.cleanup_before_delete",
        ConstraintKind::CascadeDelete,
        ModelRef::class("Order"),
        "customer",
    )]);
    let candidate = &resolution.candidates[0];
    assert_eq!(candidate.identity.kind, ConstraintKind::CascadeDelete);
    assert_eq!(candidate.identity.columns, ColumnSet::single("customer_id"));
    assert_eq!(candidate.identity.reference, Some(ColumnRef::new("shop_customer", "id")));
    assert_eq!(candidate.delete_behavior, Some(DeleteBehavior::Cascade));
}

#[test]
fn check_predicates_carry_the_column() {
    let mut check = field_finding("check.range_guard", ConstraintKind::Check, ModelRef::class("Product"), "price");
    check.bindings.predicate = Some(">= 0".to_string());
    let resolution = resolve(&[check]);
    assert_eq!(resolution.candidates[0].predicate.as_deref(), Some("price >= 0"));
}

#[test]
fn merged_check_keeps_every_distinct_predicate() {
    let bound = |predicate: &str, line: u32| {
        let mut check = field_finding("check.range_guard", ConstraintKind::Check, ModelRef::class("Product"), "price");
        check.bindings.predicate = Some(predicate.to_string());
        check.location = SourceLocation::new(line, 5);
        check
    };
    let resolution = resolve(&[bound("<= 1000", 10), bound(">= 0", 20), bound(">= 0", 30)]);
    assert_eq!(resolution.candidates.len(), 1);
    let candidate = &resolution.candidates[0];
    assert_eq!(candidate.provenance.len(), 3);
    assert_eq!(candidate.predicate.as_deref(), Some("price <= 1000 AND price >= 0"));
}

#[test]
fn candidates_are_sorted_by_identity() {
    let resolution = resolve(&[
        unique("Product", &["sku"]),
        unique("Customer", &["email"]),
        field_finding("not_null.operand", ConstraintKind::NotNull, ModelRef::class("Order"), "quantity"),
    ]);
    let identities: Vec<&ConstraintIdentity> = resolution.candidates.iter().map(|c| &c.identity).collect();
    let mut sorted = identities.clone();
    sorted.sort();
    assert_eq!(identities, sorted);
    assert_eq!(identities.len(), 3);
}
