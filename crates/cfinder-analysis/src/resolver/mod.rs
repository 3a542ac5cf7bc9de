//! Constraint resolver: turns Findings into canonical constraint
//! candidates over the model registry.
//!
//! Candidates with equal identity are merged with the union of their
//! provenance and, for CHECK, the conjunction of their distinct predicates. A Finding with any unresolvable identifier produces a
//! RESOLUTION_FAILED diagnostic and nothing else.

pub mod types;

use std::collections::BTreeMap;

use cfinder_core::errors::{Diagnostic, DiagnosticScope, ResolutionError};
use cfinder_core::types::FxHashMap;

use crate::constraints::{
    ColumnRef, ColumnSet, Confidence, ConstraintIdentity, ConstraintKind, DeleteBehavior, Effect,
    IgnoreFilter,
};
use crate::matcher::{Finding, ModelRef, RefOrigin};
use crate::registry::{FieldLocation, Lookup, ModelDefinition, ModelRegistry, RelationKind};
use crate::scanner::types::app_label_for;

pub use types::{
    ConstraintCandidate, ExcludedCandidate, ExclusionReason, RefutedCandidate, Resolution,
};

/// One Finding resolved to a constraint identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFinding {
    pub identity: ConstraintIdentity,
    pub delete_behavior: Option<DeleteBehavior>,
    pub predicate: Option<String>,
    pub confidence: Confidence,
}

/// Resolves Findings of one application against its registry.
pub struct ConstraintResolver<'r> {
    registry: &'r ModelRegistry,
    filter: &'r IgnoreFilter,
    max_unique_columns: usize,
    primary_keys: FxHashMap<String, String>,
}

impl<'r> ConstraintResolver<'r> {
    pub fn new(registry: &'r ModelRegistry, filter: &'r IgnoreFilter, max_unique_columns: usize) -> Self {
        let primary_keys = registry
            .models()
            .iter()
            .filter(|m| !m.is_abstract)
            .filter_map(|m| {
                let column = m.primary_key()?.column.as_ref()?;
                Some((m.table.clone(), column.to_ascii_lowercase()))
            })
            .collect();
        Self {
            registry,
            filter,
            max_unique_columns,
            primary_keys,
        }
    }

    /// Resolve, merge, refute and filter all Findings of the application.
    pub fn resolve_all(&self, findings: &[Finding]) -> Resolution {
        let mut merged: BTreeMap<ConstraintIdentity, ConstraintCandidate> = BTreeMap::new();
        let mut refutations: BTreeMap<ConstraintIdentity, Vec<Finding>> = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for finding in findings {
            let resolved = match self.resolve_finding(finding) {
                Ok(resolved) => resolved,
                Err(error) => {
                    let diagnostic = Diagnostic::from_error(
                        DiagnosticScope::Finding {
                            app: finding.app.clone(),
                            path: finding.file.clone(),
                            line: finding.location.line,
                            pattern: finding.pattern_id.clone(),
                        },
                        &error,
                    );
                    tracing::debug!(%diagnostic, "finding dropped");
                    diagnostics.push(diagnostic);
                    continue;
                }
            };
            match finding.effect {
                Effect::Refute => refutations
                    .entry(resolved.identity)
                    .or_default()
                    .push(finding.clone()),
                Effect::Infer => merged
                    .entry(resolved.identity.clone())
                    .or_insert_with(|| ConstraintCandidate {
                        identity: resolved.identity,
                        delete_behavior: resolved.delete_behavior,
                        predicate: None,
                        confidence: resolved.confidence,
                        provenance: Vec::new(),
                    })
                    .absorb(finding.clone(), resolved.confidence, resolved.predicate),
            }
        }

        let mut resolution = Resolution {
            diagnostics,
            ..Default::default()
        };
        for (identity, candidate) in merged {
            if let Some(mut refuted_by) = refutations.remove(&identity) {
                refuted_by.sort();
                refuted_by.dedup();
                resolution.refuted.push(RefutedCandidate {
                    candidate,
                    refuted_by,
                });
            } else if let Some(reason) = self.exclusion(&candidate) {
                resolution.excluded.push(ExcludedCandidate { candidate, reason });
            } else {
                resolution.candidates.push(candidate);
            }
        }
        resolution
    }

    fn exclusion(&self, candidate: &ConstraintCandidate) -> Option<ExclusionReason> {
        let identity = &candidate.identity;
        if candidate.is_test_only() {
            return Some(ExclusionReason::TestOnly);
        }
        let tables = std::iter::once(identity.table.as_str())
            .chain(identity.reference.as_ref().map(|r| r.table.as_str()));
        for table in tables {
            if self.filter.ignores_table(table) {
                return Some(ExclusionReason::IgnoredTable {
                    table: table.to_string(),
                });
            }
        }
        if let Some(column) = identity.columns.iter().find(|c| self.filter.ignores_column(c)) {
            return Some(ExclusionReason::IgnoredColumn {
                column: column.to_string(),
            });
        }
        let pk = self.primary_keys.get(&identity.table);
        match identity.kind {
            ConstraintKind::Unique => {
                if pk.is_some_and(|pk| identity.columns.contains(pk)) {
                    return Some(ExclusionReason::PrimaryKey);
                }
                if identity.columns.len() > self.max_unique_columns {
                    return Some(ExclusionReason::TooManyColumns {
                        count: identity.columns.len(),
                        max: self.max_unique_columns,
                    });
                }
            }
            ConstraintKind::NotNull => {
                if pk.is_some_and(|pk| identity.columns.sole() == Some(pk.as_str())) {
                    return Some(ExclusionReason::PrimaryKey);
                }
            }
            _ => {}
        }
        None
    }

    /// Resolve one Finding's bindings to table and column names.
    pub fn resolve_finding(&self, finding: &Finding) -> Result<ResolvedFinding, ResolutionError> {
        let bindings = &finding.bindings;
        let label = app_label_for(&finding.file, &finding.app);
        let model_ref = bindings
            .model
            .as_ref()
            .ok_or(ResolutionError::MissingBinding("model"))?;
        let hint = bindings.field.as_deref().or(bindings.columns.first().map(String::as_str));
        let (model, guessed) = self.resolve_model(model_ref, &label, hint)?;
        let mut confidence = finding.confidence;
        if guessed {
            confidence = confidence.min(Confidence::Heuristic);
        }

        let mut resolved = ResolvedFinding {
            identity: ConstraintIdentity::new(finding.kind, &model.table, ColumnSet::default(), None),
            delete_behavior: None,
            predicate: None,
            confidence,
        };

        match finding.kind {
            ConstraintKind::Unique if !bindings.columns.is_empty() => {
                let mut table: Option<String> = None;
                let mut columns = Vec::with_capacity(bindings.columns.len());
                for name in &bindings.columns {
                    let (loc, column) = self.column(model, name)?;
                    if table.as_ref().is_some_and(|t| *t != loc.table) {
                        return Err(ResolutionError::BrokenPath {
                            model: model.qualified_name.clone(),
                            path: bindings.columns.join(","),
                        });
                    }
                    table = Some(loc.table);
                    columns.push(column);
                }
                let table = table.unwrap_or_else(|| model.table.clone());
                resolved.identity =
                    ConstraintIdentity::new(ConstraintKind::Unique, &table, ColumnSet::new(columns), None);
            }
            ConstraintKind::Unique => {
                let name = required(&bindings.field, "field")?;
                let loc = self.field(model, name)?;
                if !loc.field.is_many_to_many() {
                    return Err(ResolutionError::NotManyToMany {
                        model: model.qualified_name.clone(),
                        field: name.to_string(),
                    });
                }
                let through = self.registry.through_table(model, &loc.field).found().ok_or_else(|| {
                    ResolutionError::BrokenPath {
                        model: model.qualified_name.clone(),
                        path: name.to_string(),
                    }
                })?;
                resolved.identity = ConstraintIdentity::new(
                    ConstraintKind::Unique,
                    &through.table,
                    ColumnSet::new([through.source_column, through.target_column]),
                    None,
                );
            }
            ConstraintKind::NotNull => {
                let (loc, column) = self.column(model, required(&bindings.field, "field")?)?;
                resolved.identity =
                    ConstraintIdentity::new(ConstraintKind::NotNull, &loc.table, ColumnSet::single(&column), None);
            }
            ConstraintKind::Check => {
                let (loc, column) = self.column(model, required(&bindings.field, "field")?)?;
                let predicate = required(&bindings.predicate, "predicate")?;
                resolved.predicate = Some(format!("{column} {predicate}"));
                resolved.identity =
                    ConstraintIdentity::new(ConstraintKind::Check, &loc.table, ColumnSet::single(&column), None);
            }
            ConstraintKind::ForeignKey => {
                let (loc, column) = self.column(model, required(&bindings.field, "field")?)?;
                let ref_model_ref = bindings
                    .ref_model
                    .as_ref()
                    .ok_or(ResolutionError::MissingBinding("ref_model"))?;
                let ref_key = required(&bindings.ref_field, "ref_field")?;
                let (target, ref_guessed) = self.resolve_model(ref_model_ref, &label, None)?;
                if ref_guessed {
                    resolved.confidence = resolved.confidence.min(Confidence::Heuristic);
                }
                let (target_loc, target_column) = self.column(target, ref_key)?;
                resolved.identity = ConstraintIdentity::new(
                    ConstraintKind::ForeignKey,
                    &loc.table,
                    ColumnSet::single(&column),
                    Some(ColumnRef::new(&target_loc.table, &target_column)),
                );
            }
            ConstraintKind::CascadeDelete => {
                let name = required(&bindings.field, "field")?;
                let (loc, column) = self.column(model, name)?;
                let reference = loc
                    .field
                    .relation
                    .as_ref()
                    .filter(|r| r.kind != RelationKind::ManyToMany)
                    .and_then(|r| self.registry.referenced_column(model, r).found())
                    .ok_or_else(|| ResolutionError::BrokenPath {
                        model: model.qualified_name.clone(),
                        path: name.to_string(),
                    })?;
                resolved.delete_behavior = Some(DeleteBehavior::Cascade);
                resolved.identity = ConstraintIdentity::new(
                    ConstraintKind::CascadeDelete,
                    &loc.table,
                    ColumnSet::single(&column),
                    Some(ColumnRef::new(&reference.0, &reference.1)),
                );
            }
        }
        Ok(resolved)
    }

    /// Model of a reference, following its relationship path. The flag is
    /// set when the model was guessed rather than traced.
    fn resolve_model(
        &self,
        model_ref: &ModelRef,
        label: &str,
        field_hint: Option<&str>,
    ) -> Result<(&'r ModelDefinition, bool), ResolutionError> {
        let (mut model, guessed) = match model_ref.origin {
            RefOrigin::Guess => (self.guess_model(model_ref, label, field_hint)?, true),
            _ => match self.registry.lookup_model(&model_ref.name, Some(label)) {
                Lookup::Found(model) => (model, false),
                Lookup::NotFound => return Err(ResolutionError::ModelNotFound(model_ref.name.clone())),
            },
        };
        for segment in &model_ref.path {
            let next = self
                .registry
                .lookup_field(model, segment)
                .found()
                .and_then(|loc| loc.field.relation)
                .and_then(|relation| self.registry.resolve_relation(model, &relation).found());
            model = next.ok_or_else(|| ResolutionError::BrokenPath {
                model: model.qualified_name.clone(),
                path: model_ref.path.join("."),
            })?;
        }
        Ok((model, guessed))
    }

    /// `order_item` -> `OrderItem`; otherwise the only model owning the
    /// field, when no relationship path is involved.
    fn guess_model(
        &self,
        model_ref: &ModelRef,
        label: &str,
        field_hint: Option<&str>,
    ) -> Result<&'r ModelDefinition, ResolutionError> {
        let camel = camel_case(&model_ref.name);
        if let Lookup::Found(model) = self.registry.lookup_model(&camel, Some(label)) {
            return Ok(model);
        }
        if model_ref.path.is_empty() {
            if let Some(field) = field_hint {
                if let [only] = self.registry.models_with_field(field).as_slice() {
                    return Ok(*only);
                }
            }
        }
        Err(ResolutionError::UnknownReceiver {
            receiver: model_ref.name.clone(),
        })
    }

    fn field(&self, model: &ModelDefinition, name: &str) -> Result<FieldLocation, ResolutionError> {
        self.registry
            .lookup_field(model, name)
            .found()
            .ok_or_else(|| ResolutionError::FieldNotFound {
                model: model.qualified_name.clone(),
                field: name.to_string(),
            })
    }

    /// A field that is stored in a column.
    fn column(&self, model: &ModelDefinition, name: &str) -> Result<(FieldLocation, String), ResolutionError> {
        let loc = self.field(model, name)?;
        match loc.column.clone() {
            Some(column) => Ok((loc, column)),
            None => Err(ResolutionError::FieldNotFound {
                model: model.qualified_name.clone(),
                field: name.to_string(),
            }),
        }
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ResolutionError> {
    value.as_deref().ok_or(ResolutionError::MissingBinding(name))
}

fn camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
