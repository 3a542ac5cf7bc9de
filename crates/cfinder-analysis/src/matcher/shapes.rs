//! Built-in structural shapes.
//!
//! Each shape inspects one statement. Expression shapes search the
//! statement's subtree down to `max_depth` without entering nested blocks;
//! statement shapes look at the statement itself and, for guards, at the
//! direct statements of its branches.

use smallvec::SmallVec;

use crate::catalog::{ShapeKind, ShapeSpec};
use crate::parsers::types::{NodeKind, RepresentationNode, SourceLocation};

use super::receivers::{
    chain_columns, field_access, is_model_name, lookup_column, object_ref, queryset_ref,
    receiver_skipped,
};
use super::scope::Scope;
use super::types::{Bindings, ModelRef, RefOrigin};

/// One shape match: bindings and the anchor location.
pub type Hit = (Bindings, SourceLocation);
pub type Hits = SmallVec<[Hit; 2]>;

const ARITHMETIC_OPS: &[&str] = &["+", "-", "*", "/", "//", "%", "**"];
const ORDERING_OPS: &[&str] = &["<", "<=", ">", ">="];
const ERROR_LOG_METHODS: &[&str] = &["error", "exception", "critical", "warning"];
const CREATE_METHODS: &[&str] = &["create", "save", "bulk_create", "get_or_create"];

/// Match one shape against one statement. `flow` is the value bound by an
/// earlier slot, required by flow-consuming shapes.
pub fn match_shape(
    spec: &ShapeSpec,
    stmt: &RepresentationNode,
    scope: &Scope<'_>,
    max_depth: usize,
    flow: Option<&str>,
) -> Hits {
    let mut hits = Hits::new();
    match spec.kind {
        ShapeKind::LookupCall => each_node(stmt, max_depth, &mut |n| {
            hits.extend(lookup_call(spec, n, scope));
        }),
        ShapeKind::M2mMutation => each_node(stmt, max_depth, &mut |n| {
            hits.extend(m2m_mutation(spec, n, scope));
        }),
        ShapeKind::ExistenceGuard => hits.extend(existence_guard(spec, stmt, scope, None)),
        ShapeKind::FlowExistenceGuard => {
            if let Some(flow) = flow {
                hits.extend(existence_guard(spec, stmt, scope, Some(flow)));
            }
        }
        ShapeKind::QuerysetAssign => hits.extend(queryset_assign(spec, stmt, scope)),
        ShapeKind::AttrOperand => {
            if stmt.kind == NodeKind::AugAssign && ARITHMETIC_OPS.iter().any(|op| stmt.text().starts_with(op)) {
                if let Some(b) = stmt.child(0).and_then(|t| field_bindings(spec, t, scope)) {
                    hits.push((b, stmt.location));
                }
            }
            each_node(stmt, max_depth, &mut |n| attr_operand(spec, n, scope, &mut hits));
        }
        ShapeKind::FExpression => {
            hits.extend(f_expression_assign(stmt, scope));
            each_node(stmt, max_depth, &mut |n| {
                hits.extend(f_expression_update(spec, n, scope));
            });
        }
        ShapeKind::AttrDereference => each_node(stmt, max_depth, &mut |n| {
            hits.extend(attr_dereference(spec, n, scope));
        }),
        ShapeKind::NoneGuard => hits.extend(none_guard(spec, stmt, scope)),
        ShapeKind::NoneAssertion => {
            if stmt.kind == NodeKind::Assert {
                if let Some(cond) = stmt.child(0) {
                    for term in conjuncts(cond) {
                        if let Some((attr, false)) = none_comparison(term) {
                            if let Some(b) = field_bindings(spec, attr, scope) {
                                hits.push((b, stmt.location));
                            }
                        }
                    }
                }
            }
        }
        ShapeKind::NoneAssignment => {
            hits.extend(none_assign_stmt(spec, stmt, scope));
            each_node(stmt, max_depth, &mut |n| {
                none_keyword(spec, n, scope, &mut hits);
            });
        }
        ShapeKind::NoneCheck => each_node(stmt, max_depth, &mut |n| {
            none_check(spec, n, scope, &mut hits);
        }),
        ShapeKind::FkLookup => each_node(stmt, max_depth, &mut |n| {
            fk_lookup(spec, n, scope, &mut hits);
        }),
        ShapeKind::FkAssign => hits.extend(fk_assign(spec, stmt, scope)),
        ShapeKind::FkKeyword => each_node(stmt, max_depth, &mut |n| {
            fk_keyword(spec, n, scope, &mut hits);
        }),
        ShapeKind::RelatedDelete => related_delete(spec, stmt, scope, &mut hits),
        ShapeKind::InstanceDelete => {
            if let (Some(flow), Some(call)) = (flow, expr_stmt_call(stmt)) {
                let callee = call.callee();
                let is_delete = callee.is_some_and(|c| c.kind == NodeKind::Attribute && c.text() == "delete");
                let target = callee.and_then(|c| c.child(0)).and_then(|o| o.ident());
                if is_delete && target == Some(flow) {
                    let b = Bindings {
                        flow: Some(flow.to_string()),
                        ..Default::default()
                    };
                    hits.push((b, stmt.location));
                }
            }
        }
        ShapeKind::ValueGuard => hits.extend(value_guard(spec, stmt, scope)),
    }
    hits
}

/// Pre-order visit of a statement subtree, not entering nested blocks.
fn each_node<'n>(
    stmt: &'n RepresentationNode,
    max_depth: usize,
    visit: &mut dyn FnMut(&'n RepresentationNode),
) {
    fn go<'n>(
        node: &'n RepresentationNode,
        depth: usize,
        max_depth: usize,
        visit: &mut dyn FnMut(&'n RepresentationNode),
    ) {
        if depth > max_depth {
            return;
        }
        visit(node);
        for child in &node.children {
            if matches!(child.kind, NodeKind::Block | NodeKind::Handler) {
                continue;
            }
            // An elif is matched as a statement of its own.
            if node.kind == NodeKind::If && child.kind == NodeKind::If {
                continue;
            }
            go(child, depth + 1, max_depth, visit);
        }
    }
    go(stmt, 0, max_depth, visit);
}

fn field_bindings(spec: &ShapeSpec, expr: &RepresentationNode, scope: &Scope<'_>) -> Option<Bindings> {
    let (model, field, receiver) = field_access(expr, scope)?;
    if field.starts_with('_')
        || !spec.accepts_field(field)
        || receiver_skipped(&receiver, &spec.skip_receivers)
    {
        return None;
    }
    Some(Bindings {
        model: Some(model),
        field: Some(field.to_string()),
        receiver: Some(receiver),
        ..Default::default()
    })
}

fn expr_stmt_call(stmt: &RepresentationNode) -> Option<&RepresentationNode> {
    if stmt.kind != NodeKind::ExprStmt {
        return None;
    }
    stmt.child(0).filter(|c| c.kind == NodeKind::Call)
}

fn method_call<'n>(node: &'n RepresentationNode) -> Option<(&'n str, &'n RepresentationNode)> {
    let callee = node.callee()?;
    if callee.kind != NodeKind::Attribute {
        return None;
    }
    Some((callee.text(), callee.child(0)?))
}

fn is_f_call(node: &RepresentationNode) -> Option<&str> {
    let callee = node.callee()?;
    if callee.tail_name()? != "F" {
        return None;
    }
    let arg = node.positional_args().next()?;
    (arg.kind == NodeKind::String).then(|| arg.text())
}

// ------------------------------------------------------------------ UNIQUE

fn lookup_call(spec: &ShapeSpec, n: &RepresentationNode, scope: &Scope<'_>) -> Option<Hit> {
    if n.kind != NodeKind::Call {
        return None;
    }
    let callee = n.callee()?;
    let (model, columns) = match callee.kind {
        NodeKind::Attribute if spec.has_method(callee.text()) => {
            let model = queryset_ref(callee.child(0)?, scope)?;
            let mut methods = spec.methods.clone();
            methods.push("filter".to_string());
            (model, chain_columns(n, &methods, &spec.exclude)?)
        }
        NodeKind::Identifier if spec.has_function(callee.text()) => {
            let mut args = n.positional_args();
            let first = args.next()?;
            if args.next().is_some() {
                return None;
            }
            let model = match first.ident() {
                Some(name) if is_model_name(name) => ModelRef::class(name),
                _ => queryset_ref(first, scope)?,
            };
            let mut columns = Vec::new();
            for (key, _) in n.keyword_args() {
                if spec.excludes(key) {
                    continue;
                }
                let column = lookup_column(key)?;
                if column == "pk" || column == "id" {
                    return None;
                }
                columns.push(column.to_string());
            }
            if first.kind == NodeKind::Call {
                if let Some(extra) = chain_columns(first, &["filter".to_string()], &spec.exclude) {
                    columns.extend(extra);
                }
            }
            if columns.is_empty() {
                return None;
            }
            columns.sort();
            columns.dedup();
            (model, columns)
        }
        _ => return None,
    };
    Some((
        Bindings {
            model: Some(model),
            columns,
            ..Default::default()
        },
        n.location,
    ))
}

fn m2m_mutation(spec: &ShapeSpec, n: &RepresentationNode, scope: &Scope<'_>) -> Option<Hit> {
    let (method, object) = method_call(n)?;
    if !spec.has_method(method) || object.kind != NodeKind::Attribute {
        return None;
    }
    if n.positional_args().next().is_none() {
        return None;
    }
    let b = field_bindings(spec, object, scope)?;
    Some((b, n.location))
}

/// Existence test in a condition: `(subject chain, positive)`.
fn existence_test(cond: &RepresentationNode) -> Option<(&RepresentationNode, bool)> {
    match cond.kind {
        NodeKind::Not => existence_test(cond.child(0)?).map(|(s, p)| (s, !p)),
        NodeKind::BoolOp if cond.text() == "and" => cond
            .children
            .iter()
            .find_map(|c| existence_test(c).filter(|(_, positive)| *positive)),
        NodeKind::Call => {
            if let Some((method, object)) = method_call(cond) {
                return match method {
                    "exists" | "first" | "count" | "last" => Some((object, true)),
                    "filter" => Some((cond, true)),
                    _ => None,
                };
            }
            None
        }
        NodeKind::Compare => {
            let left = cond.child(0)?;
            let right = cond.child(1)?;
            let op = cond.text();
            if right.kind == NodeKind::None {
                let (method, object) = method_call(left)?;
                if method != "first" && method != "last" {
                    return None;
                }
                return match op {
                    "is not" | "!=" => Some((object, true)),
                    "is" | "==" => Some((object, false)),
                    _ => None,
                };
            }
            let subject = counted_subject(left)?;
            let n: i64 = (right.kind == NodeKind::Number)
                .then(|| right.text().parse().ok())
                .flatten()?;
            match (op, n) {
                (">", 0) | (">=", 1) | ("!=", 0) => Some((subject, true)),
                ("==", 0) | ("<", 1) | ("<=", 0) => Some((subject, false)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `qs.count()` or `len(qs)`.
fn counted_subject(expr: &RepresentationNode) -> Option<&RepresentationNode> {
    if expr.kind != NodeKind::Call {
        return None;
    }
    if let Some(("count", object)) = method_call(expr) {
        return Some(object);
    }
    let callee = expr.callee()?;
    if callee.ident() == Some("len") {
        return expr.positional_args().next();
    }
    None
}

/// Block statements that react to a duplicate: raise, return, continue,
/// or an error log.
fn reacts(block: Option<&RepresentationNode>) -> bool {
    block.is_some_and(|b| {
        b.children.iter().any(|s| match s.kind {
            NodeKind::Raise | NodeKind::Return => true,
            NodeKind::Other => s.text() == "continue_statement",
            NodeKind::ExprStmt => s
                .child(0)
                .and_then(method_call)
                .is_some_and(|(m, _)| ERROR_LOG_METHODS.contains(&m)),
            _ => false,
        })
    })
}

/// Block statements that insert a row.
fn creates(block: Option<&RepresentationNode>) -> bool {
    let mut found = false;
    if let Some(b) = block {
        for stmt in &b.children {
            each_node(stmt, usize::MAX, &mut |n| {
                if n.kind != NodeKind::Call {
                    return;
                }
                if let Some((m, _)) = method_call(n) {
                    if CREATE_METHODS.contains(&m) {
                        found = true;
                    }
                } else if n.callee().and_then(|c| c.ident()).is_some_and(is_model_name) {
                    found = true;
                }
            });
        }
    }
    found
}

fn chain_root_ident(expr: &RepresentationNode) -> Option<&str> {
    match expr.kind {
        NodeKind::Identifier => expr.value.as_deref(),
        NodeKind::Call => chain_root_ident(expr.callee()?.child(0)?),
        NodeKind::Attribute | NodeKind::Subscript => chain_root_ident(expr.child(0)?),
        _ => None,
    }
}

fn existence_guard(
    spec: &ShapeSpec,
    stmt: &RepresentationNode,
    scope: &Scope<'_>,
    flow: Option<&str>,
) -> Option<Hit> {
    if stmt.kind != NodeKind::If {
        return None;
    }
    let (subject, positive) = existence_test(stmt.child(0)?)?;
    let confirmed = if positive {
        reacts(stmt.child(1))
    } else {
        creates(stmt.child(1)) || reacts(stmt.child(2).filter(|e| e.kind == NodeKind::Block))
    };
    if !confirmed {
        return None;
    }
    let bindings = match flow {
        Some(flow) => {
            if chain_root_ident(subject) != Some(flow) {
                return None;
            }
            Bindings {
                columns: chain_columns(subject, &spec.methods, &spec.exclude).unwrap_or_default(),
                flow: Some(flow.to_string()),
                ..Default::default()
            }
        }
        None => {
            if subject.kind != NodeKind::Call {
                return None;
            }
            let model = queryset_ref(subject, scope)?;
            // Locals bound to a queryset are left to the flow variant.
            if model.origin == RefOrigin::Traced || model.origin == RefOrigin::Guess {
                return None;
            }
            Bindings {
                model: Some(model),
                columns: chain_columns(subject, &spec.methods, &spec.exclude)?,
                ..Default::default()
            }
        }
    };
    Some((bindings, stmt.location))
}

fn queryset_assign(spec: &ShapeSpec, stmt: &RepresentationNode, scope: &Scope<'_>) -> Option<Hit> {
    if stmt.kind != NodeKind::Assign {
        return None;
    }
    let target = stmt.child(0)?.ident()?;
    let value = stmt.child(1)?;
    let (method, _) = method_call(value)?;
    if !spec.has_method(method) {
        return None;
    }
    let model = queryset_ref(value, scope)?;
    let columns = chain_columns(value, &spec.methods, &spec.exclude)?;
    Some((
        Bindings {
            model: Some(model),
            columns,
            flow: Some(target.to_string()),
            ..Default::default()
        },
        stmt.location,
    ))
}

// ---------------------------------------------------------------- NOT NULL

fn attr_operand(spec: &ShapeSpec, n: &RepresentationNode, scope: &Scope<'_>, hits: &mut Hits) {
    let operands: SmallVec<[&RepresentationNode; 2]> = match n.kind {
        NodeKind::BinaryOp if ARITHMETIC_OPS.contains(&n.text()) => n.children.iter().collect(),
        NodeKind::Compare if ORDERING_OPS.contains(&n.text()) => n.children.iter().collect(),
        NodeKind::Call => match n.callee().and_then(|c| c.ident()) {
            Some(f) if spec.has_function(f) => n.positional_args().collect(),
            _ => return,
        },
        _ => return,
    };
    for operand in operands {
        if let Some(b) = field_bindings(spec, operand, scope) {
            hits.push((b, operand.location));
        }
    }
}

fn f_expression_update(spec: &ShapeSpec, n: &RepresentationNode, scope: &Scope<'_>) -> Hits {
    let mut hits = Hits::new();
    let Some((method, object)) = method_call(n) else {
        return hits;
    };
    if !spec.has_method(method) {
        return hits;
    }
    let Some(model) = queryset_ref(object, scope) else {
        return hits;
    };
    for (_, value) in n.keyword_args() {
        if let Some(field) = f_arithmetic(value) {
            let b = Bindings {
                model: Some(model.clone()),
                field: Some(field.to_string()),
                ..Default::default()
            };
            hits.push((b, value.location));
        }
    }
    hits
}

/// `x.f = F("f") + 1`
fn f_expression_assign(stmt: &RepresentationNode, scope: &Scope<'_>) -> Option<Hit> {
    if stmt.kind != NodeKind::Assign {
        return None;
    }
    let field = f_arithmetic(stmt.child(1)?)?;
    let (model, _, receiver) = field_access(stmt.child(0)?, scope)?;
    Some((
        Bindings {
            model: Some(model),
            field: Some(field.to_string()),
            receiver: Some(receiver),
            ..Default::default()
        },
        stmt.location,
    ))
}

fn f_arithmetic(value: &RepresentationNode) -> Option<&str> {
    if value.kind != NodeKind::BinaryOp || !ARITHMETIC_OPS.contains(&value.text()) {
        return None;
    }
    value
        .children
        .iter()
        .find_map(|c| if c.kind == NodeKind::Call { is_f_call(c) } else { f_arithmetic(c) })
        .and_then(lookup_column)
}

fn attr_dereference(spec: &ShapeSpec, n: &RepresentationNode, scope: &Scope<'_>) -> Option<Hit> {
    let (method, object) = method_call(n)?;
    if spec.excludes(method) || method.starts_with('_') || object.kind != NodeKind::Attribute {
        return None;
    }
    let b = field_bindings(spec, object, scope)?;
    Some((b, object.location))
}

/// `x.f is None` -> `(x.f, true)`, `x.f is not None` -> `(x.f, false)`.
fn none_comparison(cond: &RepresentationNode) -> Option<(&RepresentationNode, bool)> {
    if cond.kind != NodeKind::Compare {
        return None;
    }
    let (left, right) = (cond.child(0)?, cond.child(1)?);
    let attr = match (left.kind, right.kind) {
        (NodeKind::Attribute, NodeKind::None) => left,
        (NodeKind::None, NodeKind::Attribute) => right,
        _ => return None,
    };
    match cond.text() {
        "is" | "==" => Some((attr, true)),
        "is not" | "!=" => Some((attr, false)),
        _ => None,
    }
}

fn conjuncts(cond: &RepresentationNode) -> Vec<&RepresentationNode> {
    if cond.kind == NodeKind::BoolOp && cond.text() == "and" {
        cond.children.iter().flat_map(conjuncts).collect()
    } else {
        vec![cond]
    }
}

fn disjuncts(cond: &RepresentationNode) -> Vec<&RepresentationNode> {
    if cond.kind == NodeKind::BoolOp && cond.text() == "or" {
        cond.children.iter().flat_map(disjuncts).collect()
    } else {
        vec![cond]
    }
}

fn none_guard(spec: &ShapeSpec, stmt: &RepresentationNode, scope: &Scope<'_>) -> Hits {
    let mut hits = Hits::new();
    if stmt.kind != NodeKind::If {
        return hits;
    }
    if let Some(function) = scope.enclosing_function() {
        if spec.skip_functions.iter().any(|p| function.text().starts_with(p.as_str())) {
            return hits;
        }
    }
    let (Some(cond), Some(then)) = (stmt.child(0), stmt.child(1)) else {
        return hits;
    };
    for term in disjuncts(cond) {
        let Some((attr, true)) = none_comparison(term) else {
            continue;
        };
        let Some(b) = field_bindings(spec, attr, scope) else {
            continue;
        };
        let repaired = then.children.iter().any(|s| {
            s.kind == NodeKind::Assign
                && s.child(0).and_then(|t| t.dotted()) == attr.dotted()
                && s.child(1).is_some_and(|v| v.kind != NodeKind::None)
        });
        let logged = then.children.iter().any(|s| {
            s.child(0)
                .filter(|_| s.kind == NodeKind::ExprStmt)
                .and_then(method_call)
                .is_some_and(|(m, _)| spec.has_function(m))
        });
        let raised = then.children.iter().any(|s| s.kind == NodeKind::Raise);
        if repaired || logged || raised {
            hits.push((b, stmt.location));
        }
    }
    hits
}

fn none_assign_stmt(spec: &ShapeSpec, stmt: &RepresentationNode, scope: &Scope<'_>) -> Option<Hit> {
    if stmt.kind != NodeKind::Assign || stmt.child(1)?.kind != NodeKind::None {
        return None;
    }
    let b = field_bindings(spec, stmt.child(0)?, scope)?;
    Some((b, stmt.location))
}

/// `M(f=None)`, `M.objects.create(f=None)`, `.filter(f__isnull=True)`.
fn none_keyword(spec: &ShapeSpec, n: &RepresentationNode, scope: &Scope<'_>, hits: &mut Hits) {
    if n.kind != NodeKind::Call {
        return;
    }
    let Some(callee) = n.callee() else {
        return;
    };
    let model = match callee.kind {
        NodeKind::Identifier if is_model_name(callee.text()) => Some(ModelRef::class(callee.text())),
        NodeKind::Attribute if spec.has_method(callee.text()) => {
            callee.child(0).and_then(|o| queryset_ref(o, scope))
        }
        _ => None,
    };
    let Some(model) = model else {
        return;
    };
    for (key, value) in n.keyword_args() {
        let field = if value.kind == NodeKind::None {
            lookup_column(key)
        } else if value.kind == NodeKind::Bool && value.text() == "True" {
            key.strip_suffix("__isnull").filter(|f| !f.contains("__"))
        } else {
            None
        };
        if let Some(field) = field {
            let b = Bindings {
                model: Some(model.clone()),
                field: Some(field.to_string()),
                ..Default::default()
            };
            hits.push((b, value.location));
        }
    }
}

fn none_check(spec: &ShapeSpec, n: &RepresentationNode, scope: &Scope<'_>, hits: &mut Hits) {
    let mut push = |attr: &RepresentationNode| {
        if let Some(b) = field_bindings(spec, attr, scope) {
            hits.push((b, attr.location));
        }
    };
    match n.kind {
        NodeKind::Compare => {
            if let Some((attr, _)) = none_comparison(n) {
                push(attr);
            }
        }
        NodeKind::If | NodeKind::While | NodeKind::Assert => {
            if let Some(cond) = n.child(0) {
                for term in conjuncts(cond).into_iter().flat_map(disjuncts) {
                    if let Some(attr) = truthiness_subject(term) {
                        push(attr);
                    }
                }
            }
        }
        NodeKind::BoolOp => {
            for attr in n.children.iter().filter_map(truthiness_subject) {
                push(attr);
            }
        }
        NodeKind::Other if n.text() == "conditional_expression" => {
            if let Some(attr) = n.child(1).and_then(truthiness_subject) {
                push(attr);
            }
        }
        _ => {}
    }
}

fn truthiness_subject(term: &RepresentationNode) -> Option<&RepresentationNode> {
    match term.kind {
        NodeKind::Attribute => Some(term),
        NodeKind::Not => term.child(0).filter(|c| c.kind == NodeKind::Attribute),
        _ => None,
    }
}

// ------------------------------------------------------------- FOREIGN KEY

/// `other.id` / `other.pk` -> (`other`, `id`|`pk`).
fn key_access(expr: &RepresentationNode) -> Option<(&RepresentationNode, &str)> {
    if expr.kind != NodeKind::Attribute {
        return None;
    }
    let attr = expr.text();
    if attr != "id" && attr != "pk" {
        return None;
    }
    Some((expr.child(0)?, attr))
}

fn fk_lookup(spec: &ShapeSpec, n: &RepresentationNode, scope: &Scope<'_>, hits: &mut Hits) {
    if n.kind != NodeKind::Call {
        return;
    }
    let Some(callee) = n.callee() else {
        return;
    };
    let parent = match callee.kind {
        NodeKind::Attribute if spec.has_method(callee.text()) => {
            callee.child(0).and_then(|o| queryset_ref(o, scope))
        }
        NodeKind::Identifier if spec.has_function(callee.text()) => n
            .positional_args()
            .next()
            .and_then(|m| m.ident())
            .filter(|m| is_model_name(m))
            .map(ModelRef::class),
        _ => None,
    };
    let Some(parent) = parent else {
        return;
    };
    for (key, value) in n.keyword_args() {
        if key != "id" && key != "pk" {
            continue;
        }
        let Some(b) = field_bindings(spec, value, scope) else {
            continue;
        };
        if matches!(b.field.as_deref(), Some("id" | "pk")) {
            continue;
        }
        let b = Bindings {
            ref_model: Some(parent.clone()),
            ref_field: Some(key.to_string()),
            ..b
        };
        hits.push((b, n.location));
    }
}

fn fk_assign(spec: &ShapeSpec, stmt: &RepresentationNode, scope: &Scope<'_>) -> Option<Hit> {
    if stmt.kind != NodeKind::Assign {
        return None;
    }
    let (target, value) = (stmt.child(0)?, stmt.child(1)?);
    let (other, key) = key_access(value)?;
    let b = field_bindings(spec, target, scope)?;
    if matches!(b.field.as_deref(), Some("id" | "pk")) {
        return None;
    }
    let ref_model = object_ref(other, scope)?;
    Some((
        Bindings {
            ref_model: Some(ref_model),
            ref_field: Some(key.to_string()),
            ..b
        },
        stmt.location,
    ))
}

fn fk_keyword(spec: &ShapeSpec, n: &RepresentationNode, scope: &Scope<'_>, hits: &mut Hits) {
    if n.kind != NodeKind::Call {
        return;
    }
    let Some(callee) = n.callee() else {
        return;
    };
    let model = match callee.kind {
        NodeKind::Identifier if is_model_name(callee.text()) => Some(ModelRef::class(callee.text())),
        NodeKind::Attribute if spec.has_method(callee.text()) => {
            callee.child(0).and_then(|o| queryset_ref(o, scope))
        }
        _ => None,
    };
    let Some(model) = model else {
        return;
    };
    for (key, value) in n.keyword_args() {
        let Some((other, ref_key)) = key_access(value) else {
            continue;
        };
        let Some(field) = lookup_column(key).filter(|f| *f != "id" && *f != "pk") else {
            continue;
        };
        let Some(ref_model) = object_ref(other, scope) else {
            continue;
        };
        let b = Bindings {
            model: Some(model.clone()),
            field: Some(field.to_string()),
            ref_model: Some(ref_model),
            ref_field: Some(ref_key.to_string()),
            ..Default::default()
        };
        hits.push((b, value.location));
    }
}

// ---------------------------------------------------------- CASCADE DELETE

fn related_delete(spec: &ShapeSpec, stmt: &RepresentationNode, scope: &Scope<'_>, hits: &mut Hits) {
    let Some(call) = expr_stmt_call(stmt) else {
        return;
    };
    let Some(("delete", chain)) = method_call(call) else {
        return;
    };
    let Some(model) = queryset_ref(chain, scope) else {
        return;
    };
    let mut current = Some(chain);
    while let Some(node) = current.filter(|n| n.kind == NodeKind::Call) {
        let Some((method, object)) = method_call(node) else {
            break;
        };
        if spec.has_method(method) {
            for (key, value) in node.keyword_args() {
                let (Some(field), Some(var)) = (lookup_column(key), value.ident()) else {
                    continue;
                };
                let b = Bindings {
                    model: Some(model.clone()),
                    field: Some(field.to_string()),
                    flow: Some(var.to_string()),
                    ..Default::default()
                };
                hits.push((b, stmt.location));
            }
        }
        current = Some(object);
    }
}

// ------------------------------------------------------------------- CHECK

fn negate(op: &str) -> Option<&'static str> {
    Some(match op {
        "<" => ">=",
        "<=" => ">",
        ">" => "<=",
        ">=" => "<",
        _ => return None,
    })
}

fn ordering(op: &str) -> Option<&'static str> {
    ORDERING_OPS.iter().find(|o| **o == op).copied()
}

fn flip(op: &str) -> Option<&'static str> {
    Some(match op {
        "<" => ">",
        "<=" => ">=",
        ">" => "<",
        ">=" => "<=",
        _ => return None,
    })
}

fn literal(node: &RepresentationNode) -> Option<String> {
    match node.kind {
        NodeKind::Number => Some(node.text().to_string()),
        NodeKind::Unary if node.text() == "-" => {
            let inner = node.child(0)?;
            (inner.kind == NodeKind::Number).then(|| format!("-{}", inner.text()))
        }
        _ => None,
    }
}

/// `x.f OP literal` normalized so the field is on the left.
fn bound_comparison(cond: &RepresentationNode) -> Option<(&RepresentationNode, &'static str, String)> {
    if cond.kind != NodeKind::Compare {
        return None;
    }
    let (left, right) = (cond.child(0)?, cond.child(1)?);
    let op = cond.text();
    if left.kind == NodeKind::Attribute {
        return Some((left, ordering(op)?, literal(right)?));
    }
    if right.kind == NodeKind::Attribute {
        return Some((right, flip(op)?, literal(left)?));
    }
    None
}

fn value_guard(spec: &ShapeSpec, stmt: &RepresentationNode, scope: &Scope<'_>) -> Hits {
    let mut hits = Hits::new();
    match stmt.kind {
        NodeKind::If => {
            let (Some(cond), Some(then)) = (stmt.child(0), stmt.child(1)) else {
                return hits;
            };
            let raised = then.children.iter().any(|s| {
                s.kind == NodeKind::Raise
                    || (s.kind == NodeKind::ExprStmt
                        && s.child(0)
                            .and_then(method_call)
                            .is_some_and(|(m, _)| spec.has_function(m)))
            });
            if !raised {
                return hits;
            }
            for term in disjuncts(cond) {
                if let Some((attr, op, value)) = bound_comparison(term) {
                    if let (Some(b), Some(allowed)) = (field_bindings(spec, attr, scope), negate(op)) {
                        let b = Bindings {
                            predicate: Some(format!("{allowed} {value}")),
                            ..b
                        };
                        hits.push((b, stmt.location));
                    }
                }
            }
        }
        NodeKind::Assert => {
            if let Some(cond) = stmt.child(0) {
                for term in conjuncts(cond) {
                    if let Some((attr, op, value)) = bound_comparison(term) {
                        if let Some(b) = field_bindings(spec, attr, scope) {
                            let b = Bindings {
                                predicate: Some(format!("{op} {value}")),
                                ..b
                            };
                            hits.push((b, stmt.location));
                        }
                    }
                }
            }
        }
        _ => {}
    }
    hits
}
