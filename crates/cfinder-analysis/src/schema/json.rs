//! JSON constraint dump schema source (`cfinder_schema.json`).
//!
//! ```json
//! {
//!   "unique": [{"table": "shop_item", "columns": ["shop_id", "sku"]}],
//!   "not_null": [{"table": "shop_item", "column": "sku"}],
//!   "foreign_keys": [{"table": "shop_item", "column": "shop_id",
//!                     "ref_table": "shop_shop", "ref_column": "id",
//!                     "on_delete": "CASCADE"}],
//!   "checks": [{"table": "shop_item", "columns": ["price"], "predicate": "price >= 0"}]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use cfinder_core::errors::SchemaError;

use crate::constraints::{ColumnRef, ColumnSet, ConstraintIdentity, ConstraintKind, DeleteBehavior};

use super::types::SchemaConstraint;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SchemaDump {
    unique: Vec<UniqueEntry>,
    not_null: Vec<NotNullEntry>,
    foreign_keys: Vec<ForeignKeyEntry>,
    checks: Vec<CheckEntry>,
}

#[derive(Debug, Deserialize)]
struct UniqueEntry {
    table: String,
    columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NotNullEntry {
    table: String,
    column: String,
}

#[derive(Debug, Deserialize)]
struct ForeignKeyEntry {
    table: String,
    column: String,
    ref_table: String,
    #[serde(default = "default_ref_column")]
    ref_column: String,
    #[serde(default)]
    on_delete: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckEntry {
    table: String,
    columns: Vec<String>,
    #[serde(default)]
    predicate: Option<String>,
}

fn default_ref_column() -> String {
    "id".to_string()
}

pub fn load_json_file(path: &Path) -> Result<Vec<SchemaConstraint>, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dump(&text, path)
}

pub fn parse_dump(text: &str, path: &Path) -> Result<Vec<SchemaConstraint>, SchemaError> {
    let dump: SchemaDump = serde_json::from_str(text).map_err(|e| SchemaError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let origin = path.display().to_string();
    let mut out = Vec::new();

    for entry in dump.unique {
        let identity = ConstraintIdentity::new(ConstraintKind::Unique, &entry.table, ColumnSet::new(entry.columns), None);
        out.push(SchemaConstraint::new(identity, &origin));
    }
    for entry in dump.not_null {
        let identity =
            ConstraintIdentity::new(ConstraintKind::NotNull, &entry.table, ColumnSet::single(&entry.column), None);
        out.push(SchemaConstraint::new(identity, &origin));
    }
    for entry in dump.foreign_keys {
        let on_delete = match entry.on_delete.as_deref() {
            Some(raw) => Some(DeleteBehavior::parse(raw).ok_or_else(|| SchemaError::Json {
                path: path.to_path_buf(),
                message: format!("unknown on_delete '{raw}' for {}.{}", entry.table, entry.column),
            })?),
            None => None,
        };
        let identity = ConstraintIdentity::new(
            ConstraintKind::ForeignKey,
            &entry.table,
            ColumnSet::single(&entry.column),
            Some(ColumnRef::new(&entry.ref_table, &entry.ref_column)),
        );
        out.push(SchemaConstraint::new(identity, &origin).with_delete_behavior(on_delete));
    }
    for entry in dump.checks {
        let identity = ConstraintIdentity::new(ConstraintKind::Check, &entry.table, ColumnSet::new(entry.columns), None);
        let mut constraint = SchemaConstraint::new(identity, &origin);
        constraint.predicate = entry.predicate;
        out.push(constraint);
    }
    Ok(out)
}
