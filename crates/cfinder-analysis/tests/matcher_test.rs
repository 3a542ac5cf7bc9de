//! Tests for catalog pattern matching over parsed Python files.

use cfinder_analysis::catalog::PatternCatalog;
use cfinder_analysis::constraints::{ConstraintKind, Effect};
use cfinder_analysis::matcher::{Finding, ModelRef, PatternMatcher, RefOrigin};
use cfinder_analysis::parsers::ParserManager;
use cfinder_analysis::scanner::SourceUnit;
use cfinder_core::config::AnalysisConfig;
use cfinder_core::errors::MatchError;

fn unit(text: &str) -> SourceUnit {
    SourceUnit::from_text("shop", "shop/views.py", text)
}

fn run(unit: &SourceUnit, config: &AnalysisConfig) -> Result<Vec<Finding>, MatchError> {
    let catalog = PatternCatalog::load(None).unwrap();
    let matcher = PatternMatcher::new(catalog, config);
    let tree = ParserManager::new().parse_unit(unit).unwrap();
    matcher.match_tree(&tree, unit)
}

fn findings(text: &str) -> Vec<Finding> {
    run(&unit(text), &AnalysisConfig::default()).unwrap()
}

fn by_pattern<'a>(findings: &'a [Finding], id: &str) -> Vec<&'a Finding> {
    findings.iter().filter(|f| f.pattern_id == id).collect()
}

const CHECK_THEN_ACT: &str = r#"
class ProductService:
    def register(self, sku, region):
        if Product.objects.filter(sku=sku, region=region).exists():
            raise ValueError("duplicate")
        product = Product.objects.create(sku=sku, region=region)
        product.stock += 1
        return product
"#;

#[test]
fn existence_check_before_insert_infers_unique() {
    let all = findings(CHECK_THEN_ACT);
    let hits = by_pattern(&all, "unique.check_then_act");
    assert_eq!(hits.len(), 1, "{all:#?}");

    let finding = hits[0];
    assert_eq!(finding.kind, ConstraintKind::Unique);
    assert_eq!(finding.effect, Effect::Infer);
    assert_eq!(finding.app, "shop");
    assert_eq!(finding.file, "shop/views.py");
    assert_eq!(finding.location.line, 4);
    assert_eq!(finding.bindings.model, Some(ModelRef::class("Product")));
    assert_eq!(finding.bindings.columns, vec!["region".to_string(), "sku".to_string()]);
}

#[test]
fn created_instance_is_traced_to_its_model() {
    let all = findings(CHECK_THEN_ACT);
    let hits = by_pattern(&all, "not_null.operand");
    assert_eq!(hits.len(), 1, "{all:#?}");
    let model = hits[0].bindings.model.as_ref().unwrap();
    assert_eq!(model.name, "Product");
    assert_eq!(model.origin, RefOrigin::Traced);
    assert_eq!(hits[0].bindings.field.as_deref(), Some("stock"));
}

#[test]
fn queryset_variable_flows_into_existence_check() {
    let all = findings(
        r#"
def register(sku):
    existing = Product.objects.filter(sku=sku)
    if existing.exists():
        raise ValueError("duplicate")
"#,
    );
    let hits = by_pattern(&all, "unique.check_then_act_flow");
    assert_eq!(hits.len(), 1, "{all:#?}");
    assert_eq!(hits[0].bindings.model, Some(ModelRef::class("Product")));
    assert_eq!(hits[0].bindings.columns, vec!["sku".to_string()]);
    assert_eq!(hits[0].bindings.flow.as_deref(), Some("existing"));
    // The anchor is the first slot.
    assert_eq!(hits[0].location.line, 3);
    assert!(by_pattern(&all, "unique.check_then_act").is_empty());
}

const SPREAD_OUT: &str = r#"
def register(sku):
    existing = Product.objects.filter(sku=sku)
    audit(sku)
    audit(sku)
    audit(sku)
    if existing.exists():
        raise ValueError("duplicate")
"#;

#[test]
fn window_bounds_multi_statement_patterns() {
    let wide = run(&unit(SPREAD_OUT), &AnalysisConfig::default()).unwrap();
    assert_eq!(by_pattern(&wide, "unique.check_then_act_flow").len(), 1);

    let narrow = AnalysisConfig {
        window: Some(3),
        ..Default::default()
    };
    let narrow = run(&unit(SPREAD_OUT), &narrow).unwrap();
    assert!(by_pattern(&narrow, "unique.check_then_act_flow").is_empty());
}

#[test]
fn test_files_only_see_patterns_marked_for_tests() {
    let text = r#"
def test_register(sku):
    if Product.objects.filter(sku=sku).exists():
        raise ValueError("duplicate")
    Product.objects.create(sku=sku, description=None)
"#;
    let mut test_unit = unit(text);
    test_unit.is_test = true;
    let all = run(&test_unit, &AnalysisConfig::default()).unwrap();

    assert!(by_pattern(&all, "unique.check_then_act").is_empty());
    let refuting = by_pattern(&all, "not_null.none_assignment");
    assert_eq!(refuting.len(), 1, "{all:#?}");
    assert_eq!(refuting[0].effect, Effect::Refute);
    assert_eq!(refuting[0].bindings.field.as_deref(), Some("description"));
    assert!(refuting[0].is_test);
}

#[test]
fn none_check_in_function_suppresses_operand() {
    let all = findings(
        r#"
class Order(models.Model):
    def total(self):
        if self.discount is None:
            return self.price
        return self.price - self.discount
"#,
    );
    let fields: Vec<&str> = by_pattern(&all, "not_null.operand")
        .iter()
        .filter_map(|f| f.bindings.field.as_deref())
        .collect();
    assert_eq!(fields, vec!["price"]);
    let model = by_pattern(&all, "not_null.operand")[0].bindings.model.clone().unwrap();
    assert_eq!(model.origin, RefOrigin::Enclosing);
    assert_eq!(model.name, "Order");
}

#[test]
fn raising_bound_check_infers_check_predicate() {
    let all = findings(
        r#"
class Product(models.Model):
    def clean(self):
        if self.price < 0:
            raise ValidationError("negative price")
"#,
    );
    let checks = by_pattern(&all, "check.range_guard");
    assert_eq!(checks.len(), 1, "{all:#?}");
    assert_eq!(checks[0].kind, ConstraintKind::Check);
    assert_eq!(checks[0].bindings.field.as_deref(), Some("price"));
    assert_eq!(checks[0].bindings.predicate.as_deref(), Some(">= 0"));
}

#[test]
fn key_keyword_infers_foreign_key() {
    let all = findings(
        r#"
def place(customer):
    Order.objects.create(customer_id=customer.id)
"#,
    );
    let fks = by_pattern(&all, "fk.keyword_key");
    assert_eq!(fks.len(), 1, "{all:#?}");
    let b = &fks[0].bindings;
    assert_eq!(b.model, Some(ModelRef::class("Order")));
    assert_eq!(b.field.as_deref(), Some("customer_id"));
    assert_eq!(b.ref_field.as_deref(), Some("id"));
    let parent = b.ref_model.as_ref().unwrap();
    assert_eq!(parent.origin, RefOrigin::Guess);
    assert_eq!(parent.name, "customer");
}

#[test]
fn manual_cleanup_before_parent_delete_infers_cascade() {
    let all = findings(
        r#"
def remove(parent):
    Child.objects.filter(parent=parent).delete()
    parent.delete()
"#,
    );
    let hits = by_pattern(&all, "cascade.cleanup_before_delete");
    assert_eq!(hits.len(), 1, "{all:#?}");
    assert_eq!(hits[0].kind, ConstraintKind::CascadeDelete);
    assert_eq!(hits[0].bindings.model, Some(ModelRef::class("Child")));
    assert_eq!(hits[0].bindings.field.as_deref(), Some("parent"));
}

#[test]
fn cleanup_of_a_different_parent_is_not_cascade() {
    let all = findings(
        r#"
def remove(parent, other):
    Child.objects.filter(parent=parent).delete()
    other.delete()
"#,
    );
    assert!(by_pattern(&all, "cascade.cleanup_before_delete").is_empty());
}

#[test]
fn matching_is_deterministic() {
    let first = findings(CHECK_THEN_ACT);
    let second = findings(CHECK_THEN_ACT);
    assert_eq!(first, second);
    let mut sorted = first.clone();
    sorted.sort();
    assert_eq!(first, sorted);
}

#[test]
fn exhausted_budget_aborts_the_file() {
    let config = AnalysisConfig {
        file_budget_ms: Some(0),
        ..Default::default()
    };
    match run(&unit(CHECK_THEN_ACT), &config) {
        Err(MatchError::BudgetExceeded { budget_ms, .. }) => assert_eq!(budget_ms, 0),
        other => panic!("expected BudgetExceeded, got {other:?}"),
    }
}
