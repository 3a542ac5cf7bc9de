//! Matcher output: Findings with unresolved bindings.

use serde::{Deserialize, Serialize};

use crate::constraints::{Confidence, ConstraintKind, Effect};
use crate::parsers::types::SourceLocation;

/// How a model reference was derived from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefOrigin {
    /// A class named directly: `Order.objects`, `Order(...)`.
    Class,
    /// `self` inside a class body.
    Enclosing,
    /// A local variable traced back to a class.
    Traced,
    /// Only a variable name is known.
    Guess,
}

/// An unresolved reference to a model, possibly through relationships
/// (`order.customer` is `Order` with path `["customer"]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelRef {
    pub origin: RefOrigin,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

impl ModelRef {
    pub fn class(name: &str) -> Self {
        Self {
            origin: RefOrigin::Class,
            name: name.to_string(),
            path: Vec::new(),
        }
    }

    pub fn with_origin(mut self, origin: RefOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn push(mut self, segment: &str) -> Self {
        self.path.push(segment.to_string());
        self
    }
}

/// Values bound by a pattern match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_model: Option<ModelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    /// Receiver text (`order.customer`), used to unify suppression checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

impl Bindings {
    /// Combine the bindings of two slots. `flow` must unify; columns are
    /// unioned; other values keep the earlier slot's binding.
    pub fn unify(&self, later: &Bindings) -> Option<Bindings> {
        if let (Some(a), Some(b)) = (&self.flow, &later.flow) {
            if a != b {
                return None;
            }
        }
        let mut merged = self.clone();
        for column in &later.columns {
            if !merged.columns.contains(column) {
                merged.columns.push(column.clone());
            }
        }
        merged.columns.sort();
        merged.model = merged.model.or_else(|| later.model.clone());
        merged.field = merged.field.or_else(|| later.field.clone());
        merged.ref_model = merged.ref_model.or_else(|| later.ref_model.clone());
        merged.ref_field = merged.ref_field.or_else(|| later.ref_field.clone());
        merged.predicate = merged.predicate.or_else(|| later.predicate.clone());
        merged.flow = merged.flow.or_else(|| later.flow.clone());
        merged.receiver = merged.receiver.or_else(|| later.receiver.clone());
        Some(merged)
    }
}

/// One pattern match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Finding {
    pub app: String,
    pub file: String,
    pub location: SourceLocation,
    pub pattern_id: String,
    pub kind: ConstraintKind,
    pub effect: Effect,
    pub confidence: Confidence,
    pub bindings: Bindings,
    pub is_test: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unify_rejects_different_flows() {
        let a = Bindings {
            flow: Some("qs".into()),
            ..Default::default()
        };
        let b = Bindings {
            flow: Some("other".into()),
            ..Default::default()
        };
        assert!(a.unify(&b).is_none());
    }

    #[test]
    fn unify_unions_columns() {
        let a = Bindings {
            model: Some(ModelRef::class("Order")),
            columns: vec!["sku".into()],
            flow: Some("qs".into()),
            ..Default::default()
        };
        let b = Bindings {
            columns: vec!["shop_id".into(), "sku".into()],
            flow: Some("qs".into()),
            ..Default::default()
        };
        let merged = a.unify(&b).unwrap();
        assert_eq!(merged.columns, vec!["shop_id".to_string(), "sku".to_string()]);
        assert_eq!(merged.model, Some(ModelRef::class("Order")));
    }
}
