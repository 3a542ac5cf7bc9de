//! Tests for pattern catalog loading and validation.

use cfinder_analysis::catalog::{PatternCatalog, Slot};
use cfinder_analysis::constraints::{ConstraintKind, Effect};
use cfinder_core::errors::{CatalogError, CfinderErrorCode};

const MINIMAL: &str = r#"
version = "0.1"
name = "mini"

[[patterns]]
id = "u.get"
kind = "UNIQUE"
bindings = ["model", "columns"]

[[patterns.slots]]
shape = "lookup_call"
methods = ["get"]
"#;

#[test]
fn builtin_catalog_loads() {
    let catalog = PatternCatalog::builtin().unwrap();
    assert_eq!(catalog.name(), "django");
    assert_eq!(catalog.version(), "1.0.0");
    assert_eq!(catalog.len(), 15);

    // Every kind is covered by at least one pattern.
    for kind in ConstraintKind::ALL {
        assert!(
            catalog.patterns().iter().any(|p| p.kind == kind),
            "no pattern for {kind}"
        );
    }
}

#[test]
fn builtin_has_one_refuting_pattern() {
    let catalog = PatternCatalog::builtin().unwrap();
    let refuting: Vec<&str> = catalog
        .patterns()
        .iter()
        .filter(|p| p.effect == Effect::Refute)
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(refuting, vec!["not_null.none_assignment"]);
    assert!(catalog.get("not_null.none_assignment").unwrap().include_tests);
}

#[test]
fn multi_statement_templates_compile_wildcards() {
    let catalog = PatternCatalog::builtin().unwrap();
    let cascade = catalog.get("cascade.cleanup_before_delete").unwrap();
    assert_eq!(cascade.template.len(), 3);
    assert!(matches!(cascade.template[1], Slot::Any { max: 6 }));
    assert!(cascade.unless.is_none());

    let operand = catalog.get("not_null.operand").unwrap();
    assert!(operand.unless.is_some());
}

#[test]
fn summaries_follow_catalog_order() {
    let catalog = PatternCatalog::builtin().unwrap();
    let summaries = catalog.summaries();
    assert_eq!(summaries.len(), catalog.len());
    assert_eq!(summaries[0].id, "unique.lookup_get");
    assert_eq!(summaries[0].slots, 1);
    assert!(summaries.iter().all(|s| s.description.is_some()));
}

#[test]
fn minimal_catalog_uses_defaults() {
    let catalog = PatternCatalog::from_toml(MINIMAL).unwrap();
    assert_eq!(catalog.name(), "mini");
    let pattern = catalog.get("u.get").unwrap();
    assert_eq!(pattern.effect, Effect::Infer);
    assert!(!pattern.include_tests);
}

#[test]
fn disabled_patterns_are_dropped() {
    let toml = MINIMAL.replace("bindings = [", "enabled = false\nbindings = [");
    let catalog = PatternCatalog::from_toml(&toml).unwrap();
    assert!(catalog.is_empty());
}

#[test]
fn missing_version_is_rejected() {
    let err = PatternCatalog::from_toml("name = \"x\"\n").unwrap_err();
    assert!(matches!(err, CatalogError::MissingVersion));
    assert_eq!(err.error_code(), "CATALOG_LOAD_ERROR");
}

#[test]
fn duplicate_pattern_id_is_rejected() {
    let toml = format!(
        "{MINIMAL}\n[[patterns]]\nid = \"u.get\"\nkind = \"UNIQUE\"\n\n[[patterns.slots]]\nshape = \"lookup_call\"\n"
    );
    match PatternCatalog::from_toml(&toml).unwrap_err() {
        CatalogError::DuplicatePattern(id) => assert_eq!(id, "u.get"),
        other => panic!("expected DuplicatePattern, got {other:?}"),
    }
}

#[test]
fn unknown_kind_is_rejected() {
    let toml = MINIMAL.replace("kind = \"UNIQUE\"", "kind = \"PRIMARY\"");
    match PatternCatalog::from_toml(&toml).unwrap_err() {
        CatalogError::UnknownKind { pattern, kind } => {
            assert_eq!(pattern, "u.get");
            assert_eq!(kind, "PRIMARY");
        }
        other => panic!("expected UnknownKind, got {other:?}"),
    }
}

#[test]
fn unknown_shape_is_rejected() {
    let toml = MINIMAL.replace("lookup_call", "telepathy");
    match PatternCatalog::from_toml(&toml).unwrap_err() {
        CatalogError::InvalidTemplate { message, .. } => assert!(message.contains("telepathy")),
        other => panic!("expected InvalidTemplate, got {other:?}"),
    }
}

#[test]
fn binding_without_provider_is_rejected() {
    let toml = MINIMAL.replace("[\"model\", \"columns\"]", "[\"model\", \"predicate\"]");
    match PatternCatalog::from_toml(&toml).unwrap_err() {
        CatalogError::UnboundVariable { binding, .. } => assert_eq!(binding, "predicate"),
        other => panic!("expected UnboundVariable, got {other:?}"),
    }
}

#[test]
fn flow_consumer_needs_a_producer() {
    let toml = r#"
version = "1"

[[patterns]]
id = "bad.flow"
kind = "UNIQUE"

[[patterns.slots]]
shape = "flow_existence_guard"
"#;
    match PatternCatalog::from_toml(toml).unwrap_err() {
        CatalogError::UnboundVariable { binding, .. } => assert_eq!(binding, "flow"),
        other => panic!("expected UnboundVariable, got {other:?}"),
    }
}

#[test]
fn template_must_end_with_a_shape() {
    let toml = format!("{MINIMAL}\n[[patterns.slots]]\nany = 3\n");
    assert!(matches!(
        PatternCatalog::from_toml(&toml).unwrap_err(),
        CatalogError::InvalidTemplate { .. }
    ));
}

#[test]
fn bad_field_pattern_is_rejected() {
    let toml = format!("{MINIMAL}field_pattern = \"([\"\n");
    assert!(matches!(
        PatternCatalog::from_toml(&toml).unwrap_err(),
        CatalogError::InvalidRegex { .. }
    ));
}

#[test]
fn catalog_file_is_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, MINIMAL).unwrap();
    let catalog = PatternCatalog::load(Some(path.to_str().unwrap())).unwrap();
    assert_eq!(catalog.len(), 1);

    let missing = dir.path().join("absent.toml");
    assert!(matches!(
        PatternCatalog::load(Some(missing.to_str().unwrap())).unwrap_err(),
        CatalogError::Read { .. }
    ));
}
