//! Traversal scope: the stack of statement sequences around the statement
//! being matched, and bounded def-use lookups over it.

use crate::parsers::types::{NodeKind, RepresentationNode};

/// One statement sequence and the position inside it.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'t> {
    pub stmts: &'t [RepresentationNode],
    pub index: usize,
    /// Compound statement owning the sequence; `None` for the module.
    pub owner: Option<&'t RepresentationNode>,
}

/// Where a local name got its value.
#[derive(Debug, Clone, Copy)]
pub enum Definition<'t> {
    /// `name = value`.
    Value(&'t RepresentationNode),
    /// `name, other = value`: first element of an unpacked call result.
    Unpacked(&'t RepresentationNode),
    /// `for name in iterable`.
    Iterated(&'t RepresentationNode),
    /// A parameter of the enclosing function.
    Parameter,
}

#[derive(Debug)]
pub struct Scope<'t> {
    frames: Vec<Frame<'t>>,
    window: usize,
}

impl<'t> Scope<'t> {
    pub fn new(window: usize) -> Self {
        Self {
            frames: Vec::new(),
            window,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn push(&mut self, stmts: &'t [RepresentationNode], owner: Option<&'t RepresentationNode>) {
        self.frames.push(Frame {
            stmts,
            index: 0,
            owner,
        });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn set_index(&mut self, index: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.index = index;
        }
    }

    pub fn frame(&self) -> Option<&Frame<'t>> {
        self.frames.last()
    }

    /// Name of the innermost enclosing class.
    pub fn enclosing_class(&self) -> Option<&'t str> {
        self.frames
            .iter()
            .rev()
            .filter_map(|f| f.owner)
            .find(|o| o.kind == NodeKind::Class)
            .and_then(|o| o.value.as_deref())
    }

    /// The innermost enclosing function.
    pub fn enclosing_function(&self) -> Option<&'t RepresentationNode> {
        self.frames
            .iter()
            .rev()
            .filter_map(|f| f.owner)
            .find(|o| o.kind == NodeKind::Function)
    }

    /// Statements of the enclosing function body, or of the module.
    pub fn search_root(&self) -> &'t [RepresentationNode] {
        if let Some(body) = self.enclosing_function().and_then(|f| f.child(1)) {
            return &body.children;
        }
        self.frames.first().map(|f| f.stmts).unwrap_or(&[])
    }

    /// Find the most recent definition of `name` before the current
    /// statement, searching outward through enclosing blocks up to the
    /// function, examining at most `window` statements.
    pub fn lookup(&self, name: &str) -> Option<Definition<'t>> {
        let mut budget = self.window;
        for frame in self.frames.iter().rev() {
            let end = frame.index.min(frame.stmts.len());
            for stmt in frame.stmts[..end].iter().rev() {
                if budget == 0 {
                    return None;
                }
                budget -= 1;
                if let Some(def) = defines(stmt, name) {
                    return Some(def);
                }
            }
            match frame.owner {
                Some(owner) if owner.kind == NodeKind::For => {
                    if owner.child(0).and_then(|t| t.ident()) == Some(name) {
                        return owner.child(1).map(Definition::Iterated);
                    }
                }
                Some(owner) if owner.kind == NodeKind::Function => {
                    let is_param = owner
                        .child(0)
                        .is_some_and(|p| p.children.iter().any(|c| c.ident() == Some(name)));
                    return is_param.then_some(Definition::Parameter);
                }
                _ => {}
            }
        }
        None
    }
}

fn defines<'t>(stmt: &'t RepresentationNode, name: &str) -> Option<Definition<'t>> {
    if stmt.kind != NodeKind::Assign {
        return None;
    }
    let target = stmt.child(0)?;
    let value = stmt.child(1)?;
    if target.ident() == Some(name) {
        return Some(Definition::Value(value));
    }
    if target.kind == NodeKind::Collection
        && target.child(0).and_then(|t| t.ident()) == Some(name)
        && value.kind == NodeKind::Call
    {
        return Some(Definition::Unpacked(value));
    }
    None
}
