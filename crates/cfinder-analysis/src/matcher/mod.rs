//! Pattern matcher: runs every catalog pattern over the statement
//! sequences of one representation tree.
//!
//! A pattern's template is matched against consecutive statements of one
//! block: each shape slot consumes one statement, `any` slots skip up to
//! their bound, and the whole match spans at most `window` statements.
//! Matching is pure; results are deduplicated and returned sorted.

pub mod receivers;
pub mod scope;
pub mod shapes;
pub mod types;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cfinder_core::config::AnalysisConfig;
use cfinder_core::errors::MatchError;

use crate::catalog::{Pattern, PatternCatalog, ShapeSpec, Slot};
use crate::parsers::types::{NodeKind, RepresentationNode, RepresentationTree, SourceLocation};
use crate::scanner::SourceUnit;

pub use scope::Scope;
pub use types::{Bindings, Finding, ModelRef, RefOrigin};

/// Matches a compiled catalog against parsed files. Cheap to share.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    catalog: Arc<PatternCatalog>,
    window: usize,
    max_depth: usize,
    budget_ms: u64,
}

impl PatternMatcher {
    pub fn new(catalog: Arc<PatternCatalog>, config: &AnalysisConfig) -> Self {
        Self {
            catalog,
            window: config.effective_window(),
            max_depth: config.effective_max_depth(),
            budget_ms: config.effective_file_budget_ms(),
        }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// All findings of one file, sorted and deduplicated.
    pub fn match_tree(
        &self,
        tree: &RepresentationTree,
        unit: &SourceUnit,
    ) -> Result<Vec<Finding>, MatchError> {
        let started = Instant::now();
        let mut walk = Walk {
            matcher: self,
            unit,
            deadline: started + Duration::from_millis(self.budget_ms),
            scope: Scope::new(self.window),
            findings: BTreeSet::new(),
        };
        walk.visit_sequence(&tree.root.children, None)?;
        let findings: Vec<Finding> = walk.findings.into_iter().collect();
        tracing::debug!(
            file = %unit.rel_path,
            findings = findings.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "matched file"
        );
        Ok(findings)
    }
}

struct Walk<'a, 't> {
    matcher: &'a PatternMatcher,
    unit: &'a SourceUnit,
    deadline: Instant,
    scope: Scope<'t>,
    findings: BTreeSet<Finding>,
}

impl<'a, 't> Walk<'a, 't> {
    fn visit_sequence(
        &mut self,
        stmts: &'t [RepresentationNode],
        owner: Option<&'t RepresentationNode>,
    ) -> Result<(), MatchError> {
        self.scope.push(stmts, owner);
        for (index, stmt) in stmts.iter().enumerate() {
            self.check_deadline()?;
            self.scope.set_index(index);
            self.match_at(stmts, index);
            self.scope.set_index(index);
            self.descend(stmt)?;
        }
        self.scope.pop();
        Ok(())
    }

    fn descend(&mut self, stmt: &'t RepresentationNode) -> Result<(), MatchError> {
        if !stmt.kind.is_compound() {
            return Ok(());
        }
        for child in &stmt.children {
            match child.kind {
                NodeKind::Block => self.visit_sequence(&child.children, Some(stmt))?,
                NodeKind::If if stmt.kind == NodeKind::If => {
                    self.visit_sequence(std::slice::from_ref(child), Some(stmt))?
                }
                NodeKind::Handler => {
                    if let Some(body) = child.child(0) {
                        self.visit_sequence(&body.children, Some(child))?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_deadline(&self) -> Result<(), MatchError> {
        if Instant::now() >= self.deadline {
            return Err(MatchError::BudgetExceeded {
                path: self.unit.path.clone(),
                budget_ms: self.matcher.budget_ms,
            });
        }
        Ok(())
    }

    /// Try every pattern anchored at `stmts[index]`.
    fn match_at(&mut self, stmts: &'t [RepresentationNode], index: usize) {
        let matcher = self.matcher;
        for pattern in matcher.catalog.patterns() {
            if self.unit.is_test && !pattern.include_tests {
                continue;
            }
            if index + pattern.min_span() > stmts.len() {
                continue;
            }
            let mut hits = Vec::new();
            self.match_slots(&pattern.template, stmts, index, 0, None, &mut hits);
            self.scope.set_index(index);
            for (bindings, location) in hits {
                if let Some(unless) = &pattern.unless {
                    if self.suppressed(unless, &bindings) {
                        continue;
                    }
                }
                let finding = self.finding(pattern, bindings, location);
                self.findings.insert(finding);
            }
        }
    }

    fn match_slots(
        &mut self,
        slots: &[Slot],
        stmts: &'t [RepresentationNode],
        pos: usize,
        span: usize,
        acc: Option<(Bindings, SourceLocation)>,
        out: &mut Vec<(Bindings, SourceLocation)>,
    ) {
        let Some((slot, rest)) = slots.split_first() else {
            out.extend(acc);
            return;
        };
        let window = self.matcher.window;
        match slot {
            Slot::Any { max } => {
                for skip in 0..=*max {
                    if span + skip >= window || pos + skip >= stmts.len() {
                        break;
                    }
                    self.match_slots(rest, stmts, pos + skip, span + skip, acc.clone(), out);
                }
            }
            Slot::Shape(spec) => {
                if span >= window || pos >= stmts.len() {
                    return;
                }
                self.scope.set_index(pos);
                let flow = acc.as_ref().and_then(|(b, _)| b.flow.as_deref());
                let max_depth = self.matcher.max_depth;
                let hits = shapes::match_shape(spec, &stmts[pos], &self.scope, max_depth, flow);
                for (bindings, location) in hits {
                    let next = match &acc {
                        Some((earlier, anchor)) => match earlier.unify(&bindings) {
                            Some(merged) => (merged, *anchor),
                            None => continue,
                        },
                        None => (bindings, location),
                    };
                    self.match_slots(rest, stmts, pos + 1, span + 1, Some(next), out);
                }
            }
        }
    }

    /// Whether the same receiver and field are None-checked anywhere in the
    /// enclosing function.
    fn suppressed(&self, unless: &ShapeSpec, bindings: &Bindings) -> bool {
        let (Some(receiver), Some(field)) = (&bindings.receiver, &bindings.field) else {
            return false;
        };
        let mut found = false;
        for stmt in self.scope.search_root() {
            each_statement(stmt, &mut |s| {
                if found {
                    return;
                }
                found = shapes::match_shape(unless, s, &self.scope, self.matcher.max_depth, None)
                    .iter()
                    .any(|(b, _)| {
                        b.receiver.as_ref() == Some(receiver) && b.field.as_ref() == Some(field)
                    });
            });
            if found {
                return true;
            }
        }
        false
    }

    fn finding(&self, pattern: &Pattern, bindings: Bindings, location: SourceLocation) -> Finding {
        Finding {
            app: self.unit.app.clone(),
            file: self.unit.rel_path.clone(),
            location,
            pattern_id: pattern.id.clone(),
            kind: pattern.kind,
            effect: pattern.effect,
            confidence: pattern.confidence,
            bindings,
            is_test: self.unit.is_test,
        }
    }
}

/// Visit a statement and every statement nested in its blocks.
fn each_statement<'t>(stmt: &'t RepresentationNode, visit: &mut dyn FnMut(&'t RepresentationNode)) {
    visit(stmt);
    for child in &stmt.children {
        match child.kind {
            NodeKind::Block => {
                for s in &child.children {
                    each_statement(s, visit);
                }
            }
            NodeKind::Handler => {
                for s in child.blocks().flat_map(|b| b.children.iter()) {
                    each_statement(s, visit);
                }
            }
            NodeKind::If if stmt.kind == NodeKind::If => each_statement(child, visit),
            _ => {}
        }
    }
}
