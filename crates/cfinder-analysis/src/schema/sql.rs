//! SQL DDL schema source.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sqlparser::ast::{
    AlterColumnOperation, AlterTableOperation, ColumnDef, ColumnOption, Expr, ObjectName,
    ReferentialAction, Statement, TableConstraint,
};
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use cfinder_core::config::SqlDialectKind;
use cfinder_core::errors::SchemaError;
use cfinder_core::types::FxHashMap;

use crate::constraints::{ColumnRef, ColumnSet, ConstraintIdentity, ConstraintKind, DeleteBehavior};

use super::types::SchemaConstraint;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'[^']*'|"?([A-Za-z_][A-Za-z0-9_]*)"?"#).expect("identifier regex is valid")
});

const EXPR_KEYWORDS: &[&str] = &[
    "and", "or", "not", "null", "is", "in", "between", "like", "ilike", "true", "false", "case",
    "when", "then", "else", "end", "length", "char_length", "lower", "upper", "trim", "coalesce",
];

fn dialect_for(kind: SqlDialectKind) -> Box<dyn Dialect> {
    match kind {
        SqlDialectKind::Generic => Box::new(GenericDialect {}),
        SqlDialectKind::Postgres => Box::new(PostgreSqlDialect {}),
        SqlDialectKind::MySql => Box::new(MySqlDialect {}),
        SqlDialectKind::Sqlite => Box::new(SQLiteDialect {}),
    }
}

/// Read and parse DDL files in order. Later files may alter tables created
/// by earlier ones.
pub fn load_sql_files(files: &[PathBuf], dialect: SqlDialectKind) -> Result<Vec<SchemaConstraint>, SchemaError> {
    let mut collector = DdlCollector::default();
    for path in files {
        let sql = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.clone(),
            source,
        })?;
        collector.parse(&sql, path, dialect)?;
    }
    Ok(collector.finish())
}

/// Parse one DDL text.
pub fn parse_ddl(sql: &str, path: &Path, dialect: SqlDialectKind) -> Result<Vec<SchemaConstraint>, SchemaError> {
    let mut collector = DdlCollector::default();
    collector.parse(sql, path, dialect)?;
    Ok(collector.finish())
}

#[derive(Default)]
struct DdlCollector {
    /// Columns per table, for CHECK expressions and implicit FK targets.
    columns: FxHashMap<String, Vec<String>>,
    primary_keys: FxHashMap<String, String>,
    out: Vec<SchemaConstraint>,
}

impl DdlCollector {
    fn parse(&mut self, sql: &str, path: &Path, dialect: SqlDialectKind) -> Result<(), SchemaError> {
        let dialect = dialect_for(dialect);
        let statements = Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| SchemaError::Sql {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let origin = path.display().to_string();
        for statement in &statements {
            self.statement(statement, &origin);
        }
        tracing::debug!(path = %origin, statements = statements.len(), "parsed DDL");
        Ok(())
    }

    fn finish(self) -> Vec<SchemaConstraint> {
        self.out
    }

    fn statement(&mut self, statement: &Statement, origin: &str) {
        match statement {
            Statement::CreateTable(create) => {
                let table = object_name(&create.name);
                self.columns.insert(
                    table.clone(),
                    create.columns.iter().map(|c| c.name.value.to_ascii_lowercase()).collect(),
                );
                for column in &create.columns {
                    self.column(&table, column, origin);
                }
                for constraint in &create.constraints {
                    self.table_constraint(&table, constraint, origin);
                }
            }
            Statement::CreateIndex(index) => {
                if !index.unique || index.predicate.is_some() {
                    return;
                }
                let table = object_name(&index.table_name);
                let columns: Vec<String> = index.columns.iter().map(|c| expr_column(&c.expr)).collect();
                self.push(ConstraintKind::Unique, &table, ColumnSet::new(columns), None, origin);
            }
            Statement::AlterTable { name, operations, .. } => {
                let table = object_name(name);
                for operation in operations {
                    match operation {
                        AlterTableOperation::AddConstraint(constraint) => {
                            self.table_constraint(&table, constraint, origin)
                        }
                        AlterTableOperation::AddColumn { column_def, .. } => {
                            self.columns
                                .entry(table.clone())
                                .or_default()
                                .push(column_def.name.value.to_ascii_lowercase());
                            self.column(&table, column_def, origin);
                        }
                        AlterTableOperation::AlterColumn {
                            column_name,
                            op: AlterColumnOperation::SetNotNull,
                        } => self.push(
                            ConstraintKind::NotNull,
                            &table,
                            ColumnSet::single(&column_name.value),
                            None,
                            origin,
                        ),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn column(&mut self, table: &str, column: &ColumnDef, origin: &str) {
        let name = column.name.value.to_ascii_lowercase();
        for option in &column.options {
            match &option.option {
                ColumnOption::NotNull => {
                    self.push(ConstraintKind::NotNull, table, ColumnSet::single(&name), None, origin)
                }
                ColumnOption::Unique { is_primary, .. } => {
                    if *is_primary {
                        self.primary_keys.insert(table.to_string(), name.clone());
                        self.push(ConstraintKind::NotNull, table, ColumnSet::single(&name), None, origin);
                    }
                    self.push(ConstraintKind::Unique, table, ColumnSet::single(&name), None, origin);
                }
                ColumnOption::ForeignKey {
                    foreign_table,
                    referred_columns,
                    on_delete,
                    ..
                } => {
                    let referred: Vec<String> = referred_columns.iter().map(|c| c.value.clone()).collect();
                    self.foreign_key(table, &[name.clone()], foreign_table, &referred, on_delete.as_ref(), origin);
                }
                ColumnOption::Check(expr) => self.check(table, expr, origin),
                _ => {}
            }
        }
    }

    fn table_constraint(&mut self, table: &str, constraint: &TableConstraint, origin: &str) {
        match constraint {
            TableConstraint::PrimaryKey { columns, .. } => {
                let names: Vec<String> = columns.iter().map(|c| c.value.to_ascii_lowercase()).collect();
                if let [only] = names.as_slice() {
                    self.primary_keys.insert(table.to_string(), only.clone());
                }
                for name in &names {
                    self.push(ConstraintKind::NotNull, table, ColumnSet::single(name), None, origin);
                }
                self.push(ConstraintKind::Unique, table, ColumnSet::new(names), None, origin);
            }
            TableConstraint::Unique { columns, .. } => {
                let names = columns.iter().map(|c| c.value.as_str());
                self.push(ConstraintKind::Unique, table, ColumnSet::new(names), None, origin);
            }
            TableConstraint::ForeignKey {
                columns,
                foreign_table,
                referred_columns,
                on_delete,
                ..
            } => {
                let names: Vec<String> = columns.iter().map(|c| c.value.to_ascii_lowercase()).collect();
                let referred: Vec<String> = referred_columns.iter().map(|c| c.value.clone()).collect();
                self.foreign_key(table, &names, foreign_table, &referred, on_delete.as_ref(), origin);
            }
            TableConstraint::Check { expr, .. } => self.check(table, expr, origin),
            _ => {}
        }
    }

    fn foreign_key(
        &mut self,
        table: &str,
        columns: &[String],
        foreign_table: &ObjectName,
        referred: &[String],
        on_delete: Option<&ReferentialAction>,
        origin: &str,
    ) {
        let target = object_name(foreign_table);
        let behavior = on_delete.and_then(|a| DeleteBehavior::parse(&a.to_string()));
        for (i, column) in columns.iter().enumerate() {
            let target_column = referred
                .get(i)
                .map(|c| c.to_ascii_lowercase())
                .or_else(|| self.primary_keys.get(&target).cloned())
                .unwrap_or_else(|| "id".to_string());
            let identity = ConstraintIdentity::new(
                ConstraintKind::ForeignKey,
                table,
                ColumnSet::single(column),
                Some(ColumnRef::new(&target, &target_column)),
            );
            self.out
                .push(SchemaConstraint::new(identity, origin).with_delete_behavior(behavior));
        }
    }

    fn check(&mut self, table: &str, expr: &Expr, origin: &str) {
        let predicate = expr.to_string();
        let known = self.columns.get(table);
        let columns: Vec<String> = IDENTIFIER
            .captures_iter(&predicate)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_ascii_lowercase())
            .filter(|ident| !EXPR_KEYWORDS.contains(&ident.as_str()))
            .filter(|ident| known.map_or(true, |cols| cols.contains(ident)))
            .collect();
        let identity = ConstraintIdentity::new(ConstraintKind::Check, table, ColumnSet::new(columns), None);
        self.out
            .push(SchemaConstraint::new(identity, origin).with_predicate(predicate));
    }

    fn push(
        &mut self,
        kind: ConstraintKind,
        table: &str,
        columns: ColumnSet,
        reference: Option<ColumnRef>,
        origin: &str,
    ) {
        let identity = ConstraintIdentity::new(kind, table, columns, reference);
        self.out.push(SchemaConstraint::new(identity, origin));
    }
}

fn object_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.to_ascii_lowercase())
        .unwrap_or_default()
}

fn expr_column(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.to_ascii_lowercase(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|p| p.value.to_ascii_lowercase())
            .unwrap_or_default(),
        other => other.to_string().trim_matches('"').to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Vec<SchemaConstraint> {
        parse_ddl(sql, Path::new("schema.sql"), SqlDialectKind::Postgres).unwrap()
    }

    fn has(constraints: &[SchemaConstraint], kind: ConstraintKind, table: &str, columns: &[&str]) -> bool {
        let columns = ColumnSet::new(columns.iter().copied());
        constraints
            .iter()
            .any(|c| c.identity.kind == kind && c.identity.table == table && c.identity.columns == columns)
    }

    #[test]
    fn primary_key_yields_unique_and_not_null() {
        let out = parse("CREATE TABLE shop_order (id serial PRIMARY KEY, sku varchar(20) NOT NULL);");
        assert!(has(&out, ConstraintKind::Unique, "shop_order", &["id"]));
        assert!(has(&out, ConstraintKind::NotNull, "shop_order", &["id"]));
        assert!(has(&out, ConstraintKind::NotNull, "shop_order", &["sku"]));
        assert!(!has(&out, ConstraintKind::Unique, "shop_order", &["sku"]));
    }

    #[test]
    fn table_constraints_and_indexes() {
        let out = parse(
            "CREATE TABLE shop_item (id integer, shop_id integer, sku text, price integer, \
             CONSTRAINT pk PRIMARY KEY (id), UNIQUE (shop_id, sku), CHECK (price >= 0));\n\
             CREATE UNIQUE INDEX item_slug ON shop_item (sku);\n\
             CREATE UNIQUE INDEX partial ON shop_item (price) WHERE price > 0;",
        );
        assert!(has(&out, ConstraintKind::Unique, "shop_item", &["shop_id", "sku"]));
        assert!(has(&out, ConstraintKind::Unique, "shop_item", &["sku"]));
        assert!(has(&out, ConstraintKind::Check, "shop_item", &["price"]));
        assert!(!has(&out, ConstraintKind::Unique, "shop_item", &["price"]));
    }

    #[test]
    fn foreign_keys_record_direction_and_delete_behavior() {
        let out = parse(
            "CREATE TABLE shop_customer (id integer PRIMARY KEY);\n\
             CREATE TABLE shop_order (id integer PRIMARY KEY, customer_id integer);\n\
             ALTER TABLE shop_order ADD CONSTRAINT fk FOREIGN KEY (customer_id) \
             REFERENCES shop_customer (id) ON DELETE CASCADE;",
        );
        let fk = out
            .iter()
            .find(|c| c.identity.kind == ConstraintKind::ForeignKey)
            .unwrap();
        assert_eq!(fk.identity.table, "shop_order");
        assert_eq!(fk.identity.reference, Some(ColumnRef::new("shop_customer", "id")));
        assert_eq!(fk.delete_behavior, Some(DeleteBehavior::Cascade));
    }

    #[test]
    fn invalid_sql_is_a_schema_error() {
        let err = parse_ddl("CREATE TABLE (", Path::new("bad.sql"), SqlDialectKind::Generic).unwrap_err();
        assert!(matches!(err, SchemaError::Sql { .. }));
    }
}
