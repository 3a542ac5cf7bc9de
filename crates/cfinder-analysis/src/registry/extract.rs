//! Per-file extraction of class declarations from a representation tree.
//!
//! Runs in the parallel file phase; inheritance is resolved later by the
//! registry once every file of the application has been seen.

use crate::parsers::types::{NodeKind, RepresentationNode};

use super::types::{
    DeclaredClass, DeleteBehavior, FieldDefinition, MetaConstraint, RelationKind, RelationTarget,
};

/// Field classes that declare no column of their own.
const VIRTUAL_FIELDS: &[&str] = &["GenericForeignKey", "GenericRelation"];

/// Extract every top-level class of a module.
pub fn extract_classes(root: &RepresentationNode, file: &str, app_label: &str) -> Vec<DeclaredClass> {
    root.children
        .iter()
        .filter(|stmt| stmt.kind == NodeKind::Class)
        .map(|class| extract_class(class, file, app_label))
        .collect()
}

fn extract_class(class: &RepresentationNode, file: &str, app_label: &str) -> DeclaredClass {
    let bases = class
        .child(0)
        .map(base_names)
        .unwrap_or_default();

    let mut declared = DeclaredClass {
        name: class.text().to_string(),
        app_label: app_label.to_string(),
        file: file.to_string(),
        line: class.location.line,
        bases,
        fields: Vec::new(),
        db_table: None,
        is_abstract: false,
        has_meta: false,
        unique_together: Vec::new(),
        constraints: Vec::new(),
    };

    let Some(body) = class.child(1) else {
        return declared;
    };
    for stmt in &body.children {
        match stmt.kind {
            NodeKind::Assign => {
                if let (Some(target), Some(value)) = (stmt.child(0), stmt.child(1)) {
                    if let Some(name) = target.ident() {
                        if let Some(field) = field_from_call(name, value) {
                            declared.fields.push(field);
                        }
                    }
                }
            }
            NodeKind::Class if stmt.text() == "Meta" => {
                declared.has_meta = true;
                read_meta(stmt, &mut declared);
            }
            _ => {}
        }
    }
    declared
}

/// Dotted names of the positional entries of a `Bases` node.
fn base_names(bases: &RepresentationNode) -> Vec<String> {
    bases
        .children
        .iter()
        .filter(|c| c.kind != NodeKind::Keyword)
        .filter_map(|c| c.dotted())
        .collect()
}

/// True when a callee names a model field class.
pub fn is_field_class(tail: &str) -> bool {
    !VIRTUAL_FIELDS.contains(&tail)
        && (tail.ends_with("Field") || tail == "ForeignKey" || tail == "OneToOneField")
}

fn field_from_call(name: &str, value: &RepresentationNode) -> Option<FieldDefinition> {
    if value.kind != NodeKind::Call {
        return None;
    }
    let field_type = value.callee()?.tail_name()?.to_string();
    if !is_field_class(&field_type) {
        return None;
    }

    let relation_kind = match field_type.as_str() {
        "ForeignKey" | "ParentalKey" | "TreeForeignKey" => Some(RelationKind::ForeignKey),
        "OneToOneField" => Some(RelationKind::OneToOne),
        "ManyToManyField" | "ParentalManyToManyField" | "TreeManyToManyField" => {
            Some(RelationKind::ManyToMany)
        }
        _ => None,
    };

    let mut positional = value.positional_args();
    let relation = relation_kind.and_then(|kind| {
        let target_node = value.keyword("to").or_else(|| positional.next())?;
        let target = reference_name(target_node)?;
        let on_delete = value
            .keyword("on_delete")
            .or_else(|| positional.next())
            .and_then(|n| n.dotted())
            .and_then(|d| DeleteBehavior::parse(&d));
        Some(RelationTarget {
            target,
            kind,
            on_delete,
            through: value.keyword("through").and_then(reference_name),
            to_field: value.keyword("to_field").and_then(string_value),
        })
    });

    let primary_key = is_true(value.keyword("primary_key"));
    let db_column = value.keyword("db_column").and_then(string_value);
    let is_relation = matches!(
        relation_kind,
        Some(RelationKind::ForeignKey | RelationKind::OneToOne)
    );
    let attname = if is_relation {
        format!("{name}_id")
    } else {
        name.to_string()
    };
    let column = if relation_kind == Some(RelationKind::ManyToMany) {
        None
    } else {
        Some(db_column.unwrap_or_else(|| attname.clone()))
    };

    Some(FieldDefinition {
        name: name.to_string(),
        attname,
        column,
        nullable: is_true(value.keyword("null")),
        unique: primary_key
            || is_true(value.keyword("unique"))
            || relation_kind == Some(RelationKind::OneToOne),
        primary_key,
        field_type,
        relation,
        line: value.location.line,
    })
}

fn read_meta(meta: &RepresentationNode, declared: &mut DeclaredClass) {
    let Some(body) = meta.child(1) else {
        return;
    };
    for stmt in &body.children {
        if stmt.kind != NodeKind::Assign {
            continue;
        }
        let (Some(target), Some(value)) = (stmt.child(0), stmt.child(1)) else {
            continue;
        };
        match target.ident() {
            Some("db_table") => declared.db_table = string_value(value),
            Some("abstract") => declared.is_abstract = value.kind == NodeKind::Bool && value.text() == "True",
            Some("app_label") => {
                if let Some(label) = string_value(value) {
                    declared.app_label = label;
                }
            }
            Some("unique_together") => declared.unique_together = unique_groups(value),
            Some("constraints") => {
                declared.constraints = value.children.iter().filter_map(meta_constraint).collect();
            }
            _ => {}
        }
    }
}

/// `(("a", "b"), ("c", "d"))` or the single-group shorthand `("a", "b")`.
fn unique_groups(value: &RepresentationNode) -> Vec<Vec<String>> {
    if value.kind != NodeKind::Collection {
        return Vec::new();
    }
    if value.children.iter().all(|c| c.kind == NodeKind::String) {
        let group: Vec<String> = value.children.iter().filter_map(string_value).collect();
        return if group.is_empty() { Vec::new() } else { vec![group] };
    }
    value
        .children
        .iter()
        .filter(|c| c.kind == NodeKind::Collection)
        .map(|c| c.children.iter().filter_map(string_value).collect())
        .collect()
}

fn meta_constraint(call: &RepresentationNode) -> Option<MetaConstraint> {
    let kind = call.callee()?.tail_name()?;
    let name = call.keyword("name").and_then(string_value);
    match kind {
        "UniqueConstraint" => {
            // Conditional unique constraints are partial indexes, not table-wide.
            if call.keyword("condition").is_some() {
                return None;
            }
            let fields = call
                .keyword("fields")
                .map(|f| f.children.iter().filter_map(string_value).collect())
                .unwrap_or_default();
            Some(MetaConstraint::Unique { name, fields })
        }
        "CheckConstraint" => {
            let q = call.keyword("check").or_else(|| call.keyword("condition"))?;
            let (fields, predicate) = render_q(q)?;
            Some(MetaConstraint::Check {
                name,
                fields,
                predicate,
            })
        }
        _ => None,
    }
}

/// Render `Q(price__gte=0)` (and `&`-joined Qs) as `price >= 0`.
pub fn render_q(q: &RepresentationNode) -> Option<(Vec<String>, String)> {
    match q.kind {
        NodeKind::Call if q.callee()?.tail_name()? == "Q" => {
            let mut fields = Vec::new();
            let mut parts = Vec::new();
            for (key, value) in q.keyword_args() {
                let (field, op) = split_lookup(key);
                let rendered = render_literal(value)?;
                fields.push(field.to_string());
                parts.push(format!("{field} {op} {rendered}"));
            }
            if parts.is_empty() {
                return None;
            }
            Some((fields, parts.join(" AND ")))
        }
        NodeKind::BinaryOp if q.text() == "&" => {
            let mut fields = Vec::new();
            let mut parts = Vec::new();
            for operand in &q.children {
                let (f, p) = render_q(operand)?;
                fields.extend(f);
                parts.push(p);
            }
            if parts.is_empty() {
                return None;
            }
            Some((fields, parts.join(" AND ")))
        }
        _ => None,
    }
}

fn split_lookup(key: &str) -> (&str, &'static str) {
    const OPS: &[(&str, &str)] = &[
        ("__gte", ">="),
        ("__gt", ">"),
        ("__lte", "<="),
        ("__lt", "<"),
        ("__exact", "="),
    ];
    for (suffix, op) in OPS {
        if let Some(field) = key.strip_suffix(suffix) {
            return (field, op);
        }
    }
    (key, "=")
}

fn render_literal(value: &RepresentationNode) -> Option<String> {
    match value.kind {
        NodeKind::Number | NodeKind::Bool => Some(value.text().to_string()),
        NodeKind::String => Some(format!("'{}'", value.text())),
        NodeKind::Unary if value.text() == "-" => {
            Some(format!("-{}", render_literal(value.child(0)?)?))
        }
        NodeKind::Call if value.callee()?.tail_name()? == "F" => {
            value.positional_args().next().and_then(string_value)
        }
        _ => None,
    }
}

/// Relation target text: identifier, dotted name, or string literal.
pub fn reference_name(node: &RepresentationNode) -> Option<String> {
    match node.kind {
        NodeKind::String => Some(node.text().to_string()),
        _ => node.dotted(),
    }
}

fn string_value(node: &RepresentationNode) -> Option<String> {
    (node.kind == NodeKind::String).then(|| node.text().to_string())
}

fn is_true(node: Option<&RepresentationNode>) -> bool {
    matches!(node, Some(n) if n.kind == NodeKind::Bool && n.text() == "True")
}
