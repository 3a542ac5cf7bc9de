//! Tests for declared-schema loading from SQL, JSON and models.

use std::path::{Path, PathBuf};

use cfinder_analysis::constraints::{
    ColumnRef, ColumnSet, ConstraintIdentity, ConstraintKind, DeleteBehavior, IgnoreFilter,
};
use cfinder_analysis::parsers::ParserManager;
use cfinder_analysis::registry::{extract_classes, ModelRegistry};
use cfinder_analysis::scanner::Application;
use cfinder_analysis::schema::{DeclaredSchema, SchemaLoad, SchemaLoader};
use cfinder_core::config::{AnalysisConfig, CompareConfig, SchemaConfig, SchemaSourceKind};
use cfinder_core::errors::{CfinderErrorCode, SchemaError};

fn loader(source: &str) -> SchemaLoader {
    loader_with(source, None, IgnoreFilter::default())
}

fn loader_with(source: &str, dir: Option<&str>, filter: IgnoreFilter) -> SchemaLoader {
    let config = SchemaConfig {
        source: Some(source.to_string()),
        dir: dir.map(str::to_string),
        ..Default::default()
    };
    SchemaLoader::new(&config, filter)
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, text).unwrap();
    path
}

fn loaded(load: SchemaLoad) -> DeclaredSchema {
    match load {
        SchemaLoad::Loaded(schema) => schema,
        SchemaLoad::FromModels => panic!("expected a file-based schema"),
    }
}

fn identity(kind: ConstraintKind, table: &str, columns: &[&str]) -> ConstraintIdentity {
    ConstraintIdentity::new(kind, table, ColumnSet::new(columns.iter().copied()), None)
}

fn contains(schema: &DeclaredSchema, identity: &ConstraintIdentity) -> bool {
    schema.constraints.iter().any(|c| &c.identity == identity)
}

#[test]
fn ddl_files_apply_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let create = write(
        dir.path(),
        "001_create.sql",
        "CREATE TABLE shop_order (id integer PRIMARY KEY, customer_id integer NOT NULL, code varchar(12));",
    );
    let alter = write(
        dir.path(),
        "002_alter.sql",
        "ALTER TABLE shop_order ADD CONSTRAINT order_code_uniq UNIQUE (customer_id, code);",
    );
    let app = Application::new("shop", dir.path());

    let schema = loaded(loader("sql").load(&app, &[alter, create]).unwrap());
    assert_eq!(schema.source, SchemaSourceKind::Sql);
    assert!(contains(&schema, &identity(ConstraintKind::Unique, "shop_order", &["code", "customer_id"])));
    assert!(contains(&schema, &identity(ConstraintKind::NotNull, "shop_order", &["customer_id"])));
    assert!(contains(&schema, &identity(ConstraintKind::Unique, "shop_order", &["id"])));
    assert!(!contains(&schema, &identity(ConstraintKind::NotNull, "shop_order", &["code"])));
}

#[test]
fn alter_table_columns_add_constraints() {
    let dir = tempfile::tempdir().unwrap();
    let create = write(
        dir.path(),
        "001_create.sql",
        "CREATE TABLE shop_order (id integer PRIMARY KEY, code varchar(12));",
    );
    let alter = write(
        dir.path(),
        "002_alter.sql",
        "ALTER TABLE shop_order ALTER COLUMN Code SET NOT NULL;\n\
         ALTER TABLE shop_order ADD COLUMN qty integer NOT NULL UNIQUE;\n\
         ALTER TABLE shop_order ADD CONSTRAINT qty_positive CHECK (qty >= 0);",
    );
    let app = Application::new("shop", dir.path());

    let schema = loaded(loader("sql").load(&app, &[create, alter]).unwrap());
    assert!(contains(&schema, &identity(ConstraintKind::NotNull, "shop_order", &["code"])));
    assert!(!contains(&schema, &identity(ConstraintKind::Unique, "shop_order", &["code"])));
    assert!(contains(&schema, &identity(ConstraintKind::NotNull, "shop_order", &["qty"])));
    assert!(contains(&schema, &identity(ConstraintKind::Unique, "shop_order", &["qty"])));

    let check = schema
        .constraints
        .iter()
        .find(|c| c.identity.kind == ConstraintKind::Check)
        .unwrap();
    assert_eq!(check.identity.columns, ColumnSet::single("qty"));
}

#[test]
fn schema_dir_limits_ddl_discovery() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = write(dir.path(), "legacy.sql", "CREATE TABLE shop_old (id integer PRIMARY KEY);");
    let current = write(dir.path(), "db/schema.sql", "CREATE TABLE shop_new (id integer PRIMARY KEY);");
    let app = Application::new("shop", dir.path());

    let schema = loaded(
        loader_with("sql", Some("db"), IgnoreFilter::default())
            .load(&app, &[legacy, current])
            .unwrap(),
    );
    assert!(schema.constraints.iter().all(|c| c.identity.table == "shop_new"));
    assert!(!schema.is_empty());
}

#[test]
fn unparsable_ddl_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let broken = write(dir.path(), "schema.sql", "CREATE TABLE (");
    let app = Application::new("shop", dir.path());
    let err = loader("sql").load(&app, &[broken]).unwrap_err();
    assert!(matches!(err, SchemaError::Sql { .. }));
    assert_eq!(err.error_code(), "SCHEMA_LOAD_ERROR");
}

#[test]
fn json_dump_collapses_duplicates_and_filters() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "cfinder_schema.json",
        r#"{
            "unique": [
                {"table": "shop_item", "columns": ["sku", "shop_id"]},
                {"table": "SHOP_ITEM", "columns": ["shop_id", "SKU"]},
                {"table": "django_session", "columns": ["session_key"]}
            ],
            "not_null": [{"table": "shop_item", "column": "lft"}],
            "foreign_keys": [
                {"table": "shop_item", "column": "shop_id", "ref_table": "shop_shop", "on_delete": "CASCADE"}
            ],
            "checks": [{"table": "shop_item", "columns": ["price"], "predicate": "price >= 0"}]
        }"#,
    );
    let app = Application::new("shop", dir.path());
    let filter = IgnoreFilter::from_config(&CompareConfig::default());
    let schema = loaded(loader_with("json", None, filter).load(&app, &[]).unwrap());

    assert_eq!(schema.source, SchemaSourceKind::Json);
    assert_eq!(schema.len(), 3);
    let fk = schema
        .constraints
        .iter()
        .find(|c| c.identity.kind == ConstraintKind::ForeignKey)
        .unwrap();
    assert_eq!(fk.identity.reference, Some(ColumnRef::new("shop_shop", "id")));
    assert_eq!(fk.delete_behavior, Some(DeleteBehavior::Cascade));
    let check = schema
        .constraints
        .iter()
        .find(|c| c.identity.kind == ConstraintKind::Check)
        .unwrap();
    assert_eq!(check.predicate.as_deref(), Some("price >= 0"));
}

#[test]
fn malformed_json_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cfinder_schema.json", "{\"unique\": [{\"table\": 3}]}");
    let app = Application::new("shop", dir.path());
    assert!(matches!(
        loader("json").load(&app, &[]).unwrap_err(),
        SchemaError::Json { .. }
    ));
}

#[test]
fn explicit_json_without_a_dump_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = Application::new("shop", dir.path());
    match loader("json").load(&app, &[]).unwrap_err() {
        SchemaError::NotFound { app } => assert_eq!(app, "shop"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

const MODELS: &str = r#"
from django.db import models

class Customer(models.Model):
    email = models.EmailField(unique=True)
    nickname = models.CharField(max_length=20, null=True)

class Tag(models.Model):
    label = models.CharField(max_length=20)

class Order(models.Model):
    customer = models.ForeignKey(Customer, on_delete=models.CASCADE)
    code = models.CharField(max_length=12)
    total = models.IntegerField()
    tags = models.ManyToManyField(Tag)

    class Meta:
        unique_together = ("customer", "code")
        constraints = [
            models.CheckConstraint(check=models.Q(total__gte=0), name="order_total_positive"),
        ]
"#;

#[test]
fn models_declare_their_own_schema() {
    let dir = tempfile::tempdir().unwrap();
    let app = Application::new("shop", dir.path());
    let load = loader("models").load(&app, &[]).unwrap();
    assert!(matches!(load, SchemaLoad::FromModels));

    let tree = ParserManager::new()
        .parse(MODELS.as_bytes(), Path::new("shop/models.py"))
        .unwrap();
    let classes = extract_classes(&tree.root, "shop/models.py", "shop");
    let registry = ModelRegistry::build("shop", classes, &AnalysisConfig::default().effective_model_bases());
    let schema = load.complete(&registry, &IgnoreFilter::default());

    assert_eq!(schema.source, SchemaSourceKind::Models);
    assert!(contains(&schema, &identity(ConstraintKind::Unique, "shop_customer", &["email"])));
    assert!(contains(&schema, &identity(ConstraintKind::NotNull, "shop_customer", &["email"])));
    assert!(!contains(&schema, &identity(ConstraintKind::NotNull, "shop_customer", &["nickname"])));
    assert!(contains(&schema, &identity(ConstraintKind::Unique, "shop_order", &["customer_id", "code"])));
    assert!(contains(&schema, &identity(ConstraintKind::Unique, "shop_order_tags", &["order_id", "tag_id"])));
    assert!(contains(&schema, &identity(ConstraintKind::Check, "shop_order", &["total"])));

    let fk = schema
        .constraints
        .iter()
        .find(|c| c.identity.kind == ConstraintKind::ForeignKey)
        .unwrap();
    assert_eq!(fk.identity.columns, ColumnSet::single("customer_id"));
    assert_eq!(fk.identity.reference, Some(ColumnRef::new("shop_customer", "id")));
    assert_eq!(fk.delete_behavior, Some(DeleteBehavior::Cascade));
}

#[test]
fn constraints_are_sorted_by_identity() {
    let dir = tempfile::tempdir().unwrap();
    let ddl = write(
        dir.path(),
        "schema.sql",
        "CREATE TABLE shop_b (id integer PRIMARY KEY, name text NOT NULL);\n\
         CREATE TABLE shop_a (id integer PRIMARY KEY, name text UNIQUE);",
    );
    let app = Application::new("shop", dir.path());
    let schema = loaded(loader("sql").load(&app, &[ddl]).unwrap());
    let identities: Vec<&ConstraintIdentity> = schema.constraints.iter().map(|c| &c.identity).collect();
    let mut sorted = identities.clone();
    sorted.sort();
    assert_eq!(identities, sorted);
}
