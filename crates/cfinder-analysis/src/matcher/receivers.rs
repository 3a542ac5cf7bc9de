//! Syntactic tracing of receiver expressions to models.

use crate::parsers::types::{NodeKind, RepresentationNode};

use super::scope::{Definition, Scope};
use super::types::{ModelRef, RefOrigin};

/// Queryset methods that keep the chain a queryset of the same model.
const QUERYSET_METHODS: &[&str] = &[
    "all",
    "filter",
    "exclude",
    "order_by",
    "select_related",
    "prefetch_related",
    "distinct",
    "only",
    "defer",
    "using",
    "annotate",
    "select_for_update",
    "reverse",
    "none",
];

/// Methods returning one instance of the chain's model.
const INSTANCE_METHODS: &[&str] = &[
    "get",
    "create",
    "get_or_create",
    "update_or_create",
    "first",
    "last",
    "latest",
    "earliest",
];

/// Trace depth through aliases (`a = b`).
const MAX_ALIAS_DEPTH: usize = 4;

/// `Order`, `OrderItem`; not `ORDER_LIMIT` or `order`.
pub fn is_model_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && name.chars().any(|c| c.is_ascii_lowercase())
}

/// Model of a manager or queryset expression (`Order.objects.filter(..)`,
/// or a local bound to one).
pub fn queryset_ref(expr: &RepresentationNode, scope: &Scope<'_>) -> Option<ModelRef> {
    queryset_ref_at(expr, scope, 0)
}

fn queryset_ref_at(expr: &RepresentationNode, scope: &Scope<'_>, depth: usize) -> Option<ModelRef> {
    if depth > MAX_ALIAS_DEPTH {
        return None;
    }
    match expr.kind {
        // `Order.objects`, `cls.objects`
        NodeKind::Attribute => {
            let object = expr.child(0)?;
            let manager = expr.text();
            if manager.starts_with("__") {
                return None;
            }
            match object.ident() {
                Some(name) if is_model_name(name) => Some(ModelRef::class(name)),
                Some("cls") => scope
                    .enclosing_class()
                    .map(|c| ModelRef::class(c).with_origin(RefOrigin::Enclosing)),
                _ => None,
            }
        }
        NodeKind::Call => {
            let callee = expr.callee()?;
            if callee.kind != NodeKind::Attribute || !QUERYSET_METHODS.contains(&callee.text()) {
                return None;
            }
            queryset_ref_at(callee.child(0)?, scope, depth + 1)
        }
        NodeKind::Subscript => queryset_ref_at(expr.child(0)?, scope, depth + 1),
        NodeKind::Identifier => match scope.lookup(expr.text())? {
            Definition::Value(value) => queryset_ref_at(value, scope, depth + 1)
                .map(|m| m.with_origin(RefOrigin::Traced)),
            _ => None,
        },
        _ => None,
    }
}

/// Model of an expression that evaluates to one instance.
pub fn instance_ref(expr: &RepresentationNode, scope: &Scope<'_>) -> Option<ModelRef> {
    match expr.kind {
        NodeKind::Call => {
            let callee = expr.callee()?;
            match callee.kind {
                NodeKind::Identifier => {
                    let name = callee.text();
                    if name == "get_object_or_404" {
                        let model = expr.positional_args().next()?;
                        return model
                            .ident()
                            .filter(|n| is_model_name(n))
                            .map(ModelRef::class);
                    }
                    is_model_name(name).then(|| ModelRef::class(name))
                }
                NodeKind::Attribute if INSTANCE_METHODS.contains(&callee.text()) => {
                    queryset_ref(callee.child(0)?, scope)
                }
                _ => None,
            }
        }
        NodeKind::Subscript => {
            let index = expr.child(1)?;
            if index.kind == NodeKind::Number {
                queryset_ref(expr.child(0)?, scope)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Model reference of an instance-denoting expression: `self`, a traced
/// local, a constructor call, or a relationship path over one of them.
pub fn object_ref(expr: &RepresentationNode, scope: &Scope<'_>) -> Option<ModelRef> {
    object_ref_at(expr, scope, 0)
}

fn object_ref_at(expr: &RepresentationNode, scope: &Scope<'_>, depth: usize) -> Option<ModelRef> {
    if depth > MAX_ALIAS_DEPTH {
        return None;
    }
    match expr.kind {
        NodeKind::Identifier => {
            let name = expr.text();
            if name == "self" {
                return scope
                    .enclosing_class()
                    .map(|c| ModelRef::class(c).with_origin(RefOrigin::Enclosing));
            }
            if is_model_name(name) {
                return None;
            }
            let guess = ModelRef {
                origin: RefOrigin::Guess,
                name: name.to_string(),
                path: Vec::new(),
            };
            match scope.lookup(name) {
                Some(Definition::Value(value)) | Some(Definition::Unpacked(value)) => {
                    if let Some(model) = instance_ref(value, scope) {
                        return Some(model.with_origin(RefOrigin::Traced));
                    }
                    match value.kind {
                        NodeKind::Identifier | NodeKind::Attribute => {
                            object_ref_at(value, scope, depth + 1).or(Some(guess))
                        }
                        _ => Some(guess),
                    }
                }
                Some(Definition::Iterated(iterable)) => Some(
                    queryset_ref(iterable, scope)
                        .map(|m| m.with_origin(RefOrigin::Traced))
                        .unwrap_or(guess),
                ),
                Some(Definition::Parameter) | None => Some(guess),
            }
        }
        NodeKind::Attribute => {
            let attr = expr.text();
            let object = expr.child(0)?;
            object_ref_at(object, scope, depth + 1).map(|m| m.push(attr))
        }
        NodeKind::Call => instance_ref(expr, scope),
        _ => None,
    }
}

/// `x.f` split into receiver and field when `x` denotes an instance.
pub fn field_access<'n>(
    expr: &'n RepresentationNode,
    scope: &Scope<'_>,
) -> Option<(ModelRef, &'n str, String)> {
    if expr.kind != NodeKind::Attribute {
        return None;
    }
    let field = expr.value.as_deref()?;
    let receiver = expr.child(0)?;
    if receiver.kind == NodeKind::Call && receiver.callee()?.kind != NodeKind::Identifier {
        return None;
    }
    let model = object_ref(receiver, scope)?;
    let text = receiver.dotted().unwrap_or_default();
    Some((model, field, text))
}

/// Lookup keyword columns collected from every filtering call of a chain.
///
/// Returns `None` when the lookup is not a plain equality on columns
/// (positional `Q` objects, `**kwargs`, joins, comparisons, pk lookups).
pub fn chain_columns(
    call: &RepresentationNode,
    methods: &[String],
    exclude: &[String],
) -> Option<Vec<String>> {
    let mut columns: Vec<String> = Vec::new();
    let mut current = Some(call);
    while let Some(node) = current {
        if node.kind != NodeKind::Call {
            break;
        }
        let callee = node.callee()?;
        if callee.kind != NodeKind::Attribute {
            break;
        }
        let method = callee.text();
        if methods.iter().any(|m| m == method) {
            collect_lookup_columns(node, exclude, &mut columns)?;
        }
        current = callee.child(0);
    }
    if columns.is_empty() {
        return None;
    }
    columns.sort();
    columns.dedup();
    Some(columns)
}

/// Keyword columns of one lookup call.
pub fn collect_lookup_columns(
    call: &RepresentationNode,
    exclude: &[String],
    columns: &mut Vec<String>,
) -> Option<()> {
    if call.positional_args().next().is_some() {
        return None;
    }
    for (key, _) in call.keyword_args() {
        if exclude.iter().any(|e| e == key) {
            continue;
        }
        let column = lookup_column(key)?;
        if column == "pk" || column == "id" {
            return None;
        }
        columns.push(column.to_string());
    }
    Some(())
}

/// `sku__iexact` -> `sku`; joins and comparisons are rejected.
pub fn lookup_column(key: &str) -> Option<&str> {
    let base = key
        .strip_suffix("__iexact")
        .or_else(|| key.strip_suffix("__exact"))
        .unwrap_or(key);
    if base.is_empty() || base.contains("__") {
        None
    } else {
        Some(base)
    }
}

/// Whether the dotted receiver text is in a skip list (`request`,
/// `self.request.user` for `self.request`).
pub fn receiver_skipped(receiver: &str, skip: &[String]) -> bool {
    skip.iter().any(|s| {
        receiver == s
            || receiver
                .strip_prefix(s.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_are_camel_case() {
        assert!(is_model_name("Order"));
        assert!(is_model_name("OrderItem"));
        assert!(!is_model_name("MAX_ITEMS"));
        assert!(!is_model_name("order"));
    }

    #[test]
    fn lookup_columns_strip_exact_only() {
        assert_eq!(lookup_column("sku"), Some("sku"));
        assert_eq!(lookup_column("email__iexact"), Some("email"));
        assert_eq!(lookup_column("created__gte"), None);
        assert_eq!(lookup_column("shop__name"), None);
    }

    #[test]
    fn receiver_skip_matches_prefixes() {
        let skip = vec!["self.request".to_string(), "math".to_string()];
        assert!(receiver_skipped("self.request.user", &skip));
        assert!(receiver_skipped("math", &skip));
        assert!(!receiver_skipped("mathematics", &skip));
        assert!(!receiver_skipped("self", &skip));
    }
}
