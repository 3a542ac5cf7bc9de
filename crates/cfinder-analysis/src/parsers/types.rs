//! Program representation: a uniform, location-annotated tree per file.
//!
//! Child layout per kind (fixed; the matcher and registry rely on it):
//!
//! | kind | value | children |
//! |------|-------|----------|
//! | `Module`, `Block` | | statements |
//! | `Class` | class name | `[Bases, Block]` |
//! | `Bases` | | base expressions, then `Keyword`s |
//! | `Function` | function name | `[Parameters, Block]` |
//! | `Parameters` | | `Identifier`s |
//! | `If` | | `[condition, Block, else?]`; `else` is a `Block` or a nested `If` (elif) |
//! | `For` | | `[target, iterable, Block, else Block?]` |
//! | `While` | | `[condition, Block, else Block?]` |
//! | `Try` | | `[Block, Handler*, else/finally Block*]` |
//! | `Handler` | exception text | `[Block]` |
//! | `With` | | `[item*, Block]` |
//! | `Return`, `Raise` | | `[expr?]` |
//! | `Assert` | | `[condition, message?]` |
//! | `Assign` | | `[target, value]` |
//! | `AugAssign` | operator (`+=`) | `[target, value]` |
//! | `ExprStmt` | | `[expr]` |
//! | `Call` | | `[callee, positional*, Keyword*]` |
//! | `Keyword` | argument name | `[expr]` |
//! | `Attribute` | attribute name | `[object]` |
//! | `Identifier` | name | |
//! | `Compare` | operator (`==`, `is not`, `in`, ...) | `[left, right]` |
//! | `BinaryOp` | operator | operands, left to right (a same-operator chain is one node) |
//! | `BoolOp` | `and` / `or` | operands, left to right (a same-operator chain is one node) |
//! | `Not` | | `[operand]` |
//! | `Unary` | operator | `[operand]` |
//! | `Subscript` | | `[value, index*]` |
//! | `Collection` | `list` / `tuple` / `set` / `dict` | elements (`Pair` for dicts) |
//! | `Pair` | | `[key, value]` |
//! | `String` | unquoted content | |
//! | `Number` | literal text | |
//! | `None` | | |
//! | `Bool` | `True` / `False` | |
//! | `Lambda` | | `[body]` |
//! | `Other` | tree-sitter kind | normalized named children |
//!
//! `Compare` chains (`a < b < c`) become one `BoolOp` `and` over the pairs.

use std::path::PathBuf;

use cfinder_core::errors::ParseError;
use serde::{Deserialize, Serialize};

/// Node kinds of the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Module,
    Class,
    Function,
    Block,
    If,
    For,
    While,
    Try,
    With,
    Return,
    Raise,
    Assert,
    Assign,
    AugAssign,
    ExprStmt,
    Call,
    Attribute,
    Keyword,
    Identifier,
    String,
    Number,
    None,
    Bool,
    Compare,
    BinaryOp,
    BoolOp,
    Not,
    Unary,
    Subscript,
    Collection,
    Pair,
    Parameters,
    Bases,
    Handler,
    Lambda,
    Other,
}

impl NodeKind {
    /// Kinds that own a nested statement sequence.
    pub fn is_compound(self) -> bool {
        matches!(
            self,
            NodeKind::Class
                | NodeKind::Function
                | NodeKind::If
                | NodeKind::For
                | NodeKind::While
                | NodeKind::Try
                | NodeKind::With
                | NodeKind::Handler
        )
    }
}

/// 1-based source position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn from_ts_node(node: &tree_sitter::Node) -> Self {
        let p = node.start_position();
        Self {
            line: p.row as u32 + 1,
            column: p.column as u32 + 1,
        }
    }
}

/// One node of the representation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentationNode {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RepresentationNode>,
    pub location: SourceLocation,
}

impl RepresentationNode {
    pub fn new(kind: NodeKind, location: SourceLocation) -> Self {
        Self {
            kind,
            value: None,
            children: Vec::new(),
            location,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<RepresentationNode>) -> Self {
        self.children = children;
        self
    }

    /// The node's value, or `""`.
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    pub fn child(&self, index: usize) -> Option<&RepresentationNode> {
        self.children.get(index)
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind == kind
    }

    /// Identifier name, when this node is an identifier.
    pub fn ident(&self) -> Option<&str> {
        if self.kind == NodeKind::Identifier {
            self.value.as_deref()
        } else {
            None
        }
    }

    /// `a.b.c` for identifier/attribute chains, `None` otherwise.
    pub fn dotted(&self) -> Option<String> {
        match self.kind {
            NodeKind::Identifier => self.value.clone(),
            NodeKind::Attribute => {
                let object = self.child(0)?.dotted()?;
                Some(format!("{object}.{}", self.text()))
            }
            _ => None,
        }
    }

    /// Last segment of a dotted name (`models.ForeignKey` -> `ForeignKey`).
    pub fn tail_name(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Identifier | NodeKind::Attribute => self.value.as_deref(),
            _ => None,
        }
    }

    /// Callee of a call node.
    pub fn callee(&self) -> Option<&RepresentationNode> {
        if self.kind == NodeKind::Call {
            self.child(0)
        } else {
            None
        }
    }

    /// Positional arguments of a call node.
    pub fn positional_args(&self) -> impl Iterator<Item = &RepresentationNode> {
        let args = if self.kind == NodeKind::Call {
            &self.children[1.min(self.children.len())..]
        } else {
            &[]
        };
        args.iter().filter(|c| c.kind != NodeKind::Keyword)
    }

    /// Keyword arguments of a call (or `Bases`) node as `(name, value)`.
    pub fn keyword_args(&self) -> impl Iterator<Item = (&str, &RepresentationNode)> {
        self.children.iter().filter_map(|c| {
            if c.kind == NodeKind::Keyword {
                Some((c.text(), c.child(0)?))
            } else {
                None
            }
        })
    }

    /// Value of the keyword argument `name`.
    pub fn keyword(&self, name: &str) -> Option<&RepresentationNode> {
        self.keyword_args().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    /// Nested statement blocks of a compound statement.
    pub fn blocks(&self) -> impl Iterator<Item = &RepresentationNode> {
        self.children.iter().filter(|c| c.kind == NodeKind::Block)
    }

    /// Visit this node and its descendants in pre-order.
    pub fn walk(&self, visit: &mut dyn FnMut(&RepresentationNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Number of nodes in the subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// A parsed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepresentationTree {
    pub path: PathBuf,
    pub root: RepresentationNode,
    pub content_hash: u64,
    /// ERROR/MISSING nodes tolerated in a partial parse.
    pub error_count: u32,
    pub first_error: Option<SourceLocation>,
    pub parse_time_us: u64,
}

impl RepresentationTree {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// The tolerated syntax errors of a partial tree, as a reportable error.
    pub fn partial_error(&self) -> Option<ParseError> {
        if !self.has_errors() {
            return None;
        }
        let first = self.first_error.unwrap_or_default();
        Some(ParseError::PartialTree {
            path: self.path.clone(),
            line: first.line,
            column: first.column,
            error_count: self.error_count,
        })
    }
}
