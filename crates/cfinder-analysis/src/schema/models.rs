//! Schema declared by the Django models themselves.

use crate::constraints::{ColumnRef, ColumnSet, ConstraintIdentity, ConstraintKind};
use crate::registry::{MetaConstraint, ModelDefinition, ModelRegistry, RelationKind};

use super::types::SchemaConstraint;

/// Constraints declared by field options and `Meta` of every concrete
/// model: `unique=True`, primary keys, `null=False` (the default),
/// relations with their `on_delete`, `unique_together`, and
/// `UniqueConstraint`/`CheckConstraint`.
pub fn schema_from_models(registry: &ModelRegistry) -> Vec<SchemaConstraint> {
    let mut out = Vec::new();
    for model in registry.models().iter().filter(|m| !m.is_abstract) {
        let origin = format!("{}:{}", model.file, model.qualified_name);
        fields(registry, model, &origin, &mut out);
        meta(registry, model, &origin, &mut out);
    }
    out
}

fn fields(registry: &ModelRegistry, model: &ModelDefinition, origin: &str, out: &mut Vec<SchemaConstraint>) {
    for field in &model.fields {
        if field.is_many_to_many() {
            // Auto-created join tables carry a unique pair.
            let explicit = field.relation.as_ref().is_some_and(|r| r.through.is_some());
            if !explicit {
                if let Some(through) = registry.through_table(model, field).found() {
                    let identity = ConstraintIdentity::new(
                        ConstraintKind::Unique,
                        &through.table,
                        ColumnSet::new([through.source_column, through.target_column]),
                        None,
                    );
                    out.push(SchemaConstraint::new(identity, origin));
                }
            }
            continue;
        }
        let Some(column) = field.column.as_deref() else {
            continue;
        };
        let single = ColumnSet::single(column);
        if field.unique || field.primary_key {
            let identity = ConstraintIdentity::new(ConstraintKind::Unique, &model.table, single.clone(), None);
            out.push(SchemaConstraint::new(identity, origin));
        }
        if !field.nullable || field.primary_key {
            let identity = ConstraintIdentity::new(ConstraintKind::NotNull, &model.table, single.clone(), None);
            out.push(SchemaConstraint::new(identity, origin));
        }
        if let Some(relation) = field.relation.as_ref().filter(|r| r.kind != RelationKind::ManyToMany) {
            if let Some((table, target_column)) = registry.referenced_column(model, relation).found() {
                let identity = ConstraintIdentity::new(
                    ConstraintKind::ForeignKey,
                    &model.table,
                    single,
                    Some(ColumnRef::new(&table, &target_column)),
                );
                out.push(SchemaConstraint::new(identity, origin).with_delete_behavior(relation.on_delete));
            }
        }
    }
}

fn meta(registry: &ModelRegistry, model: &ModelDefinition, origin: &str, out: &mut Vec<SchemaConstraint>) {
    let columns_of = |names: &[String]| -> Option<ColumnSet> {
        let columns: Option<Vec<String>> = names
            .iter()
            .map(|name| registry.lookup_field(model, name).found().and_then(|loc| loc.column))
            .collect();
        columns.map(ColumnSet::new)
    };
    for group in &model.unique_together {
        if let Some(columns) = columns_of(group) {
            let identity = ConstraintIdentity::new(ConstraintKind::Unique, &model.table, columns, None);
            out.push(SchemaConstraint::new(identity, origin));
        }
    }
    for constraint in &model.constraints {
        match constraint {
            MetaConstraint::Unique { fields, .. } => {
                if let Some(columns) = columns_of(fields) {
                    let identity = ConstraintIdentity::new(ConstraintKind::Unique, &model.table, columns, None);
                    out.push(SchemaConstraint::new(identity, origin));
                }
            }
            MetaConstraint::Check { fields, predicate, .. } => {
                if let Some(columns) = columns_of(fields) {
                    let identity = ConstraintIdentity::new(ConstraintKind::Check, &model.table, columns, None);
                    out.push(SchemaConstraint::new(identity, origin).with_predicate(predicate.clone()));
                }
            }
        }
    }
}
