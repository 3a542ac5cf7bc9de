//! Pattern definitions: the TOML form and the compiled form.

use serde::{Deserialize, Serialize};

use crate::constraints::{Confidence, ConstraintKind, Effect};

/// A catalog file as written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub version: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub patterns: Vec<PatternDef>,
}

/// One TOML-defined pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDef {
    pub id: String,
    pub kind: String,
    #[serde(default = "default_effect")]
    pub effect: String,
    #[serde(default = "default_confidence")]
    pub confidence: String,
    pub description: Option<String>,
    #[serde(default)]
    pub bindings: Vec<String>,
    #[serde(default)]
    pub slots: Vec<SlotDef>,
    pub unless: Option<SlotDef>,
    #[serde(default)]
    pub include_tests: bool,
    #[serde(default)]
    pub enabled: Option<bool>,
}

fn default_effect() -> String {
    "infer".to_string()
}

fn default_confidence() -> String {
    "exact".to_string()
}

/// One slot of a template: a shape or an `any` wildcard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotDef {
    pub shape: Option<String>,
    /// Wildcard: skip up to this many unrelated statements.
    pub any: Option<usize>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub skip_receivers: Vec<String>,
    #[serde(default)]
    pub skip_functions: Vec<String>,
    pub field_pattern: Option<String>,
}

/// Values a pattern can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    Model,
    Field,
    Columns,
    RefModel,
    RefField,
    Predicate,
    Flow,
}

impl Binding {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "model" => Some(Self::Model),
            "field" => Some(Self::Field),
            "columns" => Some(Self::Columns),
            "ref_model" => Some(Self::RefModel),
            "ref_field" => Some(Self::RefField),
            "predicate" => Some(Self::Predicate),
            "flow" => Some(Self::Flow),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Field => "field",
            Self::Columns => "columns",
            Self::RefModel => "ref_model",
            Self::RefField => "ref_field",
            Self::Predicate => "predicate",
            Self::Flow => "flow",
        }
    }
}

/// Built-in structural shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// `M.objects.get(a=.., b=..)`, `get_object_or_404(M, a=..)`.
    LookupCall,
    /// `obj.tags.add(x)`.
    M2mMutation,
    /// `if M.objects.filter(a=..).exists(): raise`.
    ExistenceGuard,
    /// `qs = M.objects.filter(a=..)`.
    QuerysetAssign,
    /// `if qs.exists(): raise` over a queryset variable.
    FlowExistenceGuard,
    /// `x.f + 1`, `x.f < y`, `x.f += 1`, `int(x.f)`.
    AttrOperand,
    /// `update(f=F("f") + 1)`.
    FExpression,
    /// `x.f.method()`.
    AttrDereference,
    /// `if x.f is None: raise`.
    NoneGuard,
    /// `assert x.f is not None`.
    NoneAssertion,
    /// `x.f = None`, `M(f=None)`.
    NoneAssignment,
    /// Any None test or truthiness test of `x.f`.
    NoneCheck,
    /// `Parent.objects.get(id=child.parent_id)`.
    FkLookup,
    /// `child.parent_id = parent.id`.
    FkAssign,
    /// `Child(parent_id=parent.id)`.
    FkKeyword,
    /// `Child.objects.filter(parent=p).delete()`.
    RelatedDelete,
    /// `p.delete()`.
    InstanceDelete,
    /// `if x.f < 0: raise`, `assert x.f >= 0`.
    ValueGuard,
}

impl ShapeKind {
    pub fn parse_str(s: &str) -> Option<Self> {
        let kind = match s {
            "lookup_call" => Self::LookupCall,
            "m2m_mutation" => Self::M2mMutation,
            "existence_guard" => Self::ExistenceGuard,
            "queryset_assign" => Self::QuerysetAssign,
            "flow_existence_guard" => Self::FlowExistenceGuard,
            "attr_operand" => Self::AttrOperand,
            "f_expression" => Self::FExpression,
            "attr_dereference" => Self::AttrDereference,
            "none_guard" => Self::NoneGuard,
            "none_assertion" => Self::NoneAssertion,
            "none_assignment" => Self::NoneAssignment,
            "none_check" => Self::NoneCheck,
            "fk_lookup" => Self::FkLookup,
            "fk_assign" => Self::FkAssign,
            "fk_keyword" => Self::FkKeyword,
            "related_delete" => Self::RelatedDelete,
            "instance_delete" => Self::InstanceDelete,
            "value_guard" => Self::ValueGuard,
            _ => return None,
        };
        Some(kind)
    }

    /// Bindings this shape produces.
    pub fn provides(&self) -> &'static [Binding] {
        use Binding::*;
        match self {
            Self::LookupCall | Self::ExistenceGuard => &[Model, Columns],
            Self::QuerysetAssign => &[Model, Columns, Flow],
            Self::FlowExistenceGuard => &[Flow, Columns],
            Self::M2mMutation
            | Self::AttrOperand
            | Self::FExpression
            | Self::AttrDereference
            | Self::NoneGuard
            | Self::NoneAssertion
            | Self::NoneAssignment
            | Self::NoneCheck => &[Model, Field],
            Self::FkLookup | Self::FkAssign | Self::FkKeyword => {
                &[Model, Field, RefModel, RefField]
            }
            Self::RelatedDelete => &[Model, Field, Flow],
            Self::InstanceDelete => &[Flow],
            Self::ValueGuard => &[Model, Field, Predicate],
        }
    }

    /// Shapes that only match against a `flow` bound by an earlier slot.
    pub fn consumes_flow(&self) -> bool {
        matches!(self, Self::FlowExistenceGuard | Self::InstanceDelete)
    }
}

/// Parameters of a compiled shape.
#[derive(Debug, Clone)]
pub struct ShapeSpec {
    pub kind: ShapeKind,
    pub methods: Vec<String>,
    pub functions: Vec<String>,
    pub exclude: Vec<String>,
    pub skip_receivers: Vec<String>,
    pub skip_functions: Vec<String>,
    pub field_pattern: Option<regex::Regex>,
}

impl ShapeSpec {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            methods: Vec::new(),
            functions: Vec::new(),
            exclude: Vec::new(),
            skip_receivers: Vec::new(),
            skip_functions: Vec::new(),
            field_pattern: None,
        }
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m == name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f == name)
    }

    pub fn excludes(&self, name: &str) -> bool {
        self.exclude.iter().any(|e| e == name)
    }

    /// Field names accepted by `field_pattern` (all when unset).
    pub fn accepts_field(&self, field: &str) -> bool {
        self.field_pattern.as_ref().map_or(true, |re| re.is_match(field))
    }
}

/// One compiled template slot.
#[derive(Debug, Clone)]
pub enum Slot {
    Shape(ShapeSpec),
    Any { max: usize },
}

/// A compiled, immutable pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: String,
    pub kind: ConstraintKind,
    pub effect: Effect,
    pub confidence: Confidence,
    pub description: Option<String>,
    pub bindings: Vec<Binding>,
    pub template: Vec<Slot>,
    pub unless: Option<ShapeSpec>,
    pub include_tests: bool,
}

impl Pattern {
    /// Minimum statements a match spans.
    pub fn min_span(&self) -> usize {
        self.template
            .iter()
            .filter(|s| matches!(s, Slot::Shape(_)))
            .count()
    }
}

/// Catalog entry summary for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSummary {
    pub id: String,
    pub kind: ConstraintKind,
    pub effect: Effect,
    pub confidence: Confidence,
    pub slots: usize,
    pub include_tests: bool,
    pub description: Option<String>,
}
