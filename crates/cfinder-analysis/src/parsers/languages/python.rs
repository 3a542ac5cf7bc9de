//! Python parser: tree-sitter-python CST normalized into the representation.
//!
//! Parentheses are unwrapped, `elif` chains become nested `If` nodes in the
//! else slot, decorators and comments are dropped, string literals are
//! unquoted. Left-associative operator chains (`a + b + c`, `x and y and z`)
//! become one n-ary node. Nesting past the configured limit rejects the file.

use std::cell::Cell;
use std::path::Path;

use cfinder_core::errors::ParseError;
use tree_sitter::Node;

use super::parse_with_language;
use crate::parsers::traits::{LanguageParser, ParseLimits};
use crate::parsers::types::{NodeKind, RepresentationNode, RepresentationTree, SourceLocation};
use crate::scanner::language_detect::Language;

pub struct PythonParser;

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonParser {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &[&str] {
        Language::Python.extensions()
    }

    fn parse(
        &self,
        source: &[u8],
        path: &Path,
        limits: ParseLimits,
    ) -> Result<RepresentationTree, ParseError> {
        parse_with_language(
            source,
            path,
            Language::Python,
            tree_sitter_python::LANGUAGE.into(),
            normalize_module,
            limits,
        )
    }
}

/// Normalize a `module` node. Returns `None` when statements or expressions
/// nest deeper than `max_nesting`.
pub fn normalize_module(root: Node, source: &[u8], max_nesting: usize) -> Option<RepresentationNode> {
    let n = Normalizer {
        src: source,
        max_nesting,
        depth: Cell::new(0),
        exceeded: Cell::new(false),
    };
    let module =
        RepresentationNode::new(NodeKind::Module, loc(&root)).with_children(n.statements(root));
    if n.exceeded.get() {
        None
    } else {
        Some(module)
    }
}

fn loc(node: &Node) -> SourceLocation {
    SourceLocation::from_ts_node(node)
}

fn node(kind: NodeKind, at: &Node) -> RepresentationNode {
    RepresentationNode::new(kind, loc(at))
}

/// Placeholder for a subtree cut at the nesting limit.
fn truncated(at: &Node) -> RepresentationNode {
    node(NodeKind::Other, at).with_value("nesting_limit")
}

fn operator(n: Node) -> String {
    n.child_by_field_name("operator")
        .map(|o| o.kind().to_string())
        .unwrap_or_default()
}

/// Strip string prefixes (`r`, `b`, `f`, `u`) and quotes.
pub fn unquote(raw: &str) -> String {
    let body = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].to_string();
        }
    }
    body.to_string()
}

struct Normalizer<'a> {
    src: &'a [u8],
    max_nesting: usize,
    depth: Cell<usize>,
    exceeded: Cell<bool>,
}

impl Normalizer<'_> {
    /// Run `build` one level deeper, or return `None` once the limit is hit.
    fn descend<T>(&self, build: impl FnOnce() -> T) -> Option<T> {
        let depth = self.depth.get();
        if self.exceeded.get() || depth >= self.max_nesting {
            self.exceeded.set(true);
            return None;
        }
        self.depth.set(depth + 1);
        let built = build();
        self.depth.set(depth);
        Some(built)
    }

    fn text(&self, node: &Node) -> String {
        node.utf8_text(self.src).unwrap_or("").to_string()
    }

    fn named<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        let children = node
            .named_children(&mut cursor)
            .filter(|c| !c.is_extra() && c.kind() != "comment")
            .collect();
        children
    }

    fn statements(&self, parent: Node) -> Vec<RepresentationNode> {
        self.named(parent)
            .into_iter()
            .filter_map(|c| self.statement(c))
            .collect()
    }

    fn block(&self, body: Option<Node>, at: &Node) -> RepresentationNode {
        match body {
            Some(b) => node(NodeKind::Block, &b).with_children(self.statements(b)),
            None => node(NodeKind::Block, at),
        }
    }

    fn statement(&self, n: Node) -> Option<RepresentationNode> {
        self.descend(|| self.statement_node(n))
            .unwrap_or_else(|| Some(truncated(&n)))
    }

    fn statement_node(&self, n: Node) -> Option<RepresentationNode> {
        let stmt = match n.kind() {
            "comment" => return None,
            "expression_statement" => {
                let children = self.named(n);
                match children.as_slice() {
                    [single] if single.kind() == "assignment" => self.assignment(*single),
                    [single] if single.kind() == "augmented_assignment" => {
                        self.aug_assignment(*single)
                    }
                    [single] => node(NodeKind::ExprStmt, &n).with_children(vec![self.expr(*single)]),
                    many => {
                        let tuple = node(NodeKind::Collection, &n)
                            .with_value("tuple")
                            .with_children(many.iter().map(|c| self.expr(*c)).collect());
                        node(NodeKind::ExprStmt, &n).with_children(vec![tuple])
                    }
                }
            }
            "if_statement" => self.if_statement(n),
            "for_statement" => {
                let mut children = Vec::with_capacity(4);
                children.push(self.opt_expr(n.child_by_field_name("left"), &n));
                children.push(self.opt_expr(n.child_by_field_name("right"), &n));
                children.push(self.block(n.child_by_field_name("body"), &n));
                if let Some(alt) = n.child_by_field_name("alternative") {
                    children.push(self.block(alt.child_by_field_name("body"), &alt));
                }
                node(NodeKind::For, &n).with_children(children)
            }
            "while_statement" => {
                let mut children = Vec::with_capacity(3);
                children.push(self.opt_expr(n.child_by_field_name("condition"), &n));
                children.push(self.block(n.child_by_field_name("body"), &n));
                if let Some(alt) = n.child_by_field_name("alternative") {
                    children.push(self.block(alt.child_by_field_name("body"), &alt));
                }
                node(NodeKind::While, &n).with_children(children)
            }
            "try_statement" => self.try_statement(n),
            "with_statement" => {
                let mut children = Vec::new();
                for part in self.named(n) {
                    if part.kind() == "with_clause" {
                        for item in self.named(part) {
                            let value = item.child_by_field_name("value").unwrap_or(item);
                            children.push(self.expr(value));
                        }
                    }
                }
                children.push(self.block(n.child_by_field_name("body"), &n));
                node(NodeKind::With, &n).with_children(children)
            }
            "function_definition" => {
                let name = n
                    .child_by_field_name("name")
                    .map(|c| self.text(&c))
                    .unwrap_or_default();
                let params = self.parameters(n.child_by_field_name("parameters"), &n);
                let body = self.block(n.child_by_field_name("body"), &n);
                node(NodeKind::Function, &n)
                    .with_value(name)
                    .with_children(vec![params, body])
            }
            "class_definition" => {
                let name = n
                    .child_by_field_name("name")
                    .map(|c| self.text(&c))
                    .unwrap_or_default();
                let bases = match n.child_by_field_name("superclasses") {
                    Some(args) => node(NodeKind::Bases, &args).with_children(self.arguments(args)),
                    None => node(NodeKind::Bases, &n),
                };
                let body = self.block(n.child_by_field_name("body"), &n);
                node(NodeKind::Class, &n)
                    .with_value(name)
                    .with_children(vec![bases, body])
            }
            "decorated_definition" => {
                return n
                    .child_by_field_name("definition")
                    .and_then(|d| self.statement(d));
            }
            "return_statement" => {
                node(NodeKind::Return, &n).with_children(self.first_expr(n).into_iter().collect())
            }
            "raise_statement" => {
                node(NodeKind::Raise, &n).with_children(self.first_expr(n).into_iter().collect())
            }
            "assert_statement" => node(NodeKind::Assert, &n)
                .with_children(self.named(n).into_iter().map(|c| self.expr(c)).collect()),
            "block" => node(NodeKind::Block, &n).with_children(self.statements(n)),
            other => node(NodeKind::Other, &n).with_value(other),
        };
        Some(stmt)
    }

    fn if_statement(&self, n: Node) -> RepresentationNode {
        let mut cursor = n.walk();
        let mut alternatives: Vec<Node> = n
            .children_by_field_name("alternative", &mut cursor)
            .collect();
        let mut else_slot: Option<RepresentationNode> = None;
        while let Some(alt) = alternatives.pop() {
            else_slot = Some(match alt.kind() {
                "elif_clause" => {
                    let mut children = vec![
                        self.opt_expr(alt.child_by_field_name("condition"), &alt),
                        self.block(alt.child_by_field_name("consequence"), &alt),
                    ];
                    children.extend(else_slot.take());
                    node(NodeKind::If, &alt).with_children(children)
                }
                _ => self.block(alt.child_by_field_name("body"), &alt),
            });
        }
        let mut children = vec![
            self.opt_expr(n.child_by_field_name("condition"), &n),
            self.block(n.child_by_field_name("consequence"), &n),
        ];
        children.extend(else_slot);
        node(NodeKind::If, &n).with_children(children)
    }

    fn try_statement(&self, n: Node) -> RepresentationNode {
        let mut children = vec![self.block(n.child_by_field_name("body"), &n)];
        for part in self.named(n) {
            match part.kind() {
                "except_clause" | "except_group_clause" => {
                    let parts = self.named(part);
                    let caught: Vec<String> = parts
                        .iter()
                        .filter(|p| p.kind() != "block")
                        .map(|p| self.text(p))
                        .collect();
                    let body = parts.iter().rev().find(|p| p.kind() == "block").copied();
                    let mut handler = node(NodeKind::Handler, &part)
                        .with_children(vec![self.block(body, &part)]);
                    if !caught.is_empty() {
                        handler = handler.with_value(caught.join(" "));
                    }
                    children.push(handler);
                }
                "else_clause" => children.push(self.block(part.child_by_field_name("body"), &part)),
                "finally_clause" => {
                    let body = self.named(part).into_iter().find(|p| p.kind() == "block");
                    children.push(self.block(body, &part));
                }
                _ => {}
            }
        }
        node(NodeKind::Try, &n).with_children(children)
    }

    fn assignment(&self, n: Node) -> RepresentationNode {
        let target = self.opt_expr(n.child_by_field_name("left"), &n);
        // `a = b = value`: keep the first target and the final value.
        let mut right = n.child_by_field_name("right");
        while let Some(r) = right {
            if r.kind() == "assignment" {
                right = r.child_by_field_name("right");
            } else {
                break;
            }
        }
        match right {
            Some(value) => node(NodeKind::Assign, &n).with_children(vec![target, self.expr(value)]),
            None => node(NodeKind::Other, &n)
                .with_value("annotation")
                .with_children(vec![target]),
        }
    }

    fn aug_assignment(&self, n: Node) -> RepresentationNode {
        let op = n
            .child_by_field_name("operator")
            .map(|o| o.kind().to_string())
            .unwrap_or_else(|| "+=".to_string());
        node(NodeKind::AugAssign, &n).with_value(op).with_children(vec![
            self.opt_expr(n.child_by_field_name("left"), &n),
            self.opt_expr(n.child_by_field_name("right"), &n),
        ])
    }

    fn parameters(&self, params: Option<Node>, at: &Node) -> RepresentationNode {
        let Some(params) = params else {
            return node(NodeKind::Parameters, at);
        };
        let names = self
            .named(params)
            .into_iter()
            .filter_map(|p| {
                let ident = if p.kind() == "identifier" {
                    Some(p)
                } else {
                    p.child_by_field_name("name")
                        .or_else(|| self.named(p).into_iter().find(|c| c.kind() == "identifier"))
                }?;
                Some(node(NodeKind::Identifier, &ident).with_value(self.text(&ident)))
            })
            .collect();
        node(NodeKind::Parameters, &params).with_children(names)
    }

    fn arguments(&self, args: Node) -> Vec<RepresentationNode> {
        let mut positional = Vec::new();
        let mut keywords = Vec::new();
        for arg in self.named(args) {
            if arg.kind() == "keyword_argument" {
                keywords.push(self.expr(arg));
            } else {
                positional.push(self.expr(arg));
            }
        }
        positional.extend(keywords);
        positional
    }

    fn first_expr(&self, n: Node) -> Option<RepresentationNode> {
        self.named(n).into_iter().next().map(|c| self.expr(c))
    }

    fn opt_expr(&self, n: Option<Node>, at: &Node) -> RepresentationNode {
        match n {
            Some(e) => self.expr(e),
            None => node(NodeKind::Other, at).with_value("missing"),
        }
    }

    fn expr(&self, n: Node) -> RepresentationNode {
        self.descend(|| self.expr_node(n))
            .unwrap_or_else(|| truncated(&n))
    }

    fn expr_node(&self, n: Node) -> RepresentationNode {
        match n.kind() {
            "identifier" => node(NodeKind::Identifier, &n).with_value(self.text(&n)),
            "attribute" => {
                let attr = n
                    .child_by_field_name("attribute")
                    .map(|a| self.text(&a))
                    .unwrap_or_default();
                node(NodeKind::Attribute, &n)
                    .with_value(attr)
                    .with_children(vec![self.opt_expr(n.child_by_field_name("object"), &n)])
            }
            "call" => {
                let mut children = vec![self.opt_expr(n.child_by_field_name("function"), &n)];
                if let Some(args) = n.child_by_field_name("arguments") {
                    if args.kind() == "argument_list" {
                        children.extend(self.arguments(args));
                    } else {
                        children.push(self.expr(args));
                    }
                }
                node(NodeKind::Call, &n).with_children(children)
            }
            "keyword_argument" => {
                let name = n
                    .child_by_field_name("name")
                    .map(|c| self.text(&c))
                    .unwrap_or_default();
                node(NodeKind::Keyword, &n)
                    .with_value(name)
                    .with_children(vec![self.opt_expr(n.child_by_field_name("value"), &n)])
            }
            "parenthesized_expression" => match self.named(n).into_iter().next() {
                Some(inner) => self.expr(inner),
                None => node(NodeKind::Collection, &n).with_value("tuple"),
            },
            "string" | "concatenated_string" => {
                node(NodeKind::String, &n).with_value(self.string_value(n))
            }
            "integer" | "float" => node(NodeKind::Number, &n).with_value(self.text(&n)),
            "true" => node(NodeKind::Bool, &n).with_value("True"),
            "false" => node(NodeKind::Bool, &n).with_value("False"),
            "none" => node(NodeKind::None, &n),
            "comparison_operator" => self.comparison(n),
            "not_operator" => node(NodeKind::Not, &n)
                .with_children(vec![self.opt_expr(n.child_by_field_name("argument"), &n)]),
            "boolean_operator" => self.operator_chain(n, NodeKind::BoolOp),
            "binary_operator" => self.operator_chain(n, NodeKind::BinaryOp),
            "unary_operator" => {
                node(NodeKind::Unary, &n)
                    .with_value(operator(n))
                    .with_children(vec![self.opt_expr(n.child_by_field_name("argument"), &n)])
            }
            "subscript" => {
                let mut children = vec![self.opt_expr(n.child_by_field_name("value"), &n)];
                let mut cursor = n.walk();
                let indices: Vec<Node> = n.children_by_field_name("subscript", &mut cursor).collect();
                children.extend(indices.into_iter().map(|i| self.expr(i)));
                node(NodeKind::Subscript, &n).with_children(children)
            }
            "list" | "tuple" | "set" | "expression_list" | "pattern_list" | "tuple_pattern"
            | "list_pattern" => {
                let flavor = match n.kind() {
                    "list" | "list_pattern" => "list",
                    "set" => "set",
                    _ => "tuple",
                };
                node(NodeKind::Collection, &n)
                    .with_value(flavor)
                    .with_children(self.named(n).into_iter().map(|c| self.expr(c)).collect())
            }
            "dictionary" => node(NodeKind::Collection, &n).with_value("dict").with_children(
                self.named(n)
                    .into_iter()
                    .map(|c| {
                        if c.kind() == "pair" {
                            node(NodeKind::Pair, &c).with_children(vec![
                                self.opt_expr(c.child_by_field_name("key"), &c),
                                self.opt_expr(c.child_by_field_name("value"), &c),
                            ])
                        } else {
                            self.expr(c)
                        }
                    })
                    .collect(),
            ),
            "lambda" => node(NodeKind::Lambda, &n)
                .with_children(vec![self.opt_expr(n.child_by_field_name("body"), &n)]),
            other => node(NodeKind::Other, &n)
                .with_value(other)
                .with_children(self.named(n).into_iter().map(|c| self.expr(c)).collect()),
        }
    }

    /// Collect a left-nested chain of one operator into a single node whose
    /// children are the operands in source order.
    fn operator_chain(&self, n: Node, kind: NodeKind) -> RepresentationNode {
        let op = operator(n);
        let mut rights = Vec::new();
        let mut head = n;
        let leftmost = loop {
            rights.push((head.child_by_field_name("right"), head));
            match head.child_by_field_name("left") {
                Some(left) if left.kind() == n.kind() && operator(left) == op => head = left,
                left => break left,
            }
        };
        let mut children = Vec::with_capacity(rights.len() + 1);
        children.push(self.opt_expr(leftmost, &head));
        children.extend(
            rights
                .into_iter()
                .rev()
                .map(|(right, owner)| self.opt_expr(right, &owner)),
        );
        node(kind, &n).with_value(op).with_children(children)
    }

    fn string_value(&self, n: Node) -> String {
        if n.kind() == "concatenated_string" {
            return self
                .named(n)
                .into_iter()
                .map(|part| unquote(&self.text(&part)))
                .collect();
        }
        unquote(&self.text(&n))
    }

    /// `a < b < c` becomes `(a < b) and (b < c)`, one `and` over all pairs.
    fn comparison(&self, n: Node) -> RepresentationNode {
        let operands: Vec<RepresentationNode> =
            self.named(n).into_iter().map(|c| self.expr(c)).collect();
        let mut cursor = n.walk();
        let operators: Vec<String> = n
            .children_by_field_name("operators", &mut cursor)
            .map(|o| {
                o.utf8_text(self.src)
                    .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
                    .unwrap_or_else(|_| o.kind().to_string())
            })
            .collect();
        let mut pairs: Vec<RepresentationNode> = operators
            .iter()
            .enumerate()
            .filter_map(|(i, op)| {
                let left = operands.get(i)?.clone();
                let right = operands.get(i + 1)?.clone();
                Some(
                    node(NodeKind::Compare, &n)
                        .with_value(op.clone())
                        .with_children(vec![left, right]),
                )
            })
            .collect();
        match pairs.len() {
            0 => node(NodeKind::Other, &n).with_value("comparison_operator"),
            1 => pairs.remove(0),
            _ => node(NodeKind::BoolOp, &n)
                .with_value("and")
                .with_children(pairs),
        }
    }
}
