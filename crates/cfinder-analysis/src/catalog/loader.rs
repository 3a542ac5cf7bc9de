//! Catalog loading: TOML parse, compile, validate.

use std::path::Path;

use cfinder_core::errors::CatalogError;
use cfinder_core::types::collections::FxHashSet;

use super::types::{Binding, CatalogFile, Pattern, PatternDef, ShapeKind, ShapeSpec, Slot, SlotDef};
use crate::constraints::{Confidence, ConstraintKind, Effect};

/// A loaded catalog before it is frozen.
pub(super) struct LoadedCatalog {
    pub name: String,
    pub version: String,
    pub patterns: Vec<Pattern>,
}

pub(super) fn load_from_str(toml_str: &str) -> Result<LoadedCatalog, CatalogError> {
    let file: CatalogFile =
        toml::from_str(toml_str).map_err(|e| CatalogError::Toml(e.to_string()))?;

    let version = file
        .version
        .filter(|v| !v.trim().is_empty())
        .ok_or(CatalogError::MissingVersion)?;

    let mut seen = FxHashSet::default();
    let mut patterns = Vec::with_capacity(file.patterns.len());
    for def in file.patterns {
        if !seen.insert(def.id.clone()) {
            return Err(CatalogError::DuplicatePattern(def.id));
        }
        if def.enabled == Some(false) {
            continue;
        }
        patterns.push(compile(def)?);
    }

    Ok(LoadedCatalog {
        name: file.name.unwrap_or_else(|| "custom".to_string()),
        version,
        patterns,
    })
}

pub(super) fn load_from_file(path: &Path) -> Result<LoadedCatalog, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    load_from_str(&content)
}

fn compile(def: PatternDef) -> Result<Pattern, CatalogError> {
    let kind = ConstraintKind::parse_str(&def.kind).ok_or_else(|| CatalogError::UnknownKind {
        pattern: def.id.clone(),
        kind: def.kind.clone(),
    })?;
    let effect = Effect::parse_str(&def.effect).ok_or_else(|| CatalogError::InvalidTemplate {
        pattern: def.id.clone(),
        message: format!("unknown effect '{}'", def.effect),
    })?;
    let confidence =
        Confidence::parse_str(&def.confidence).ok_or_else(|| CatalogError::InvalidTemplate {
            pattern: def.id.clone(),
            message: format!("unknown confidence '{}'", def.confidence),
        })?;

    let mut bindings = Vec::with_capacity(def.bindings.len());
    for raw in &def.bindings {
        let binding = Binding::parse_str(raw).ok_or_else(|| CatalogError::InvalidTemplate {
            pattern: def.id.clone(),
            message: format!("unknown binding '{raw}'"),
        })?;
        bindings.push(binding);
    }

    if def.slots.is_empty() {
        return Err(invalid(&def.id, "template has no slots"));
    }
    let mut template = Vec::with_capacity(def.slots.len());
    for slot in &def.slots {
        template.push(compile_slot(&def.id, slot)?);
    }
    if !matches!(template.first(), Some(Slot::Shape(_)))
        || !matches!(template.last(), Some(Slot::Shape(_)))
    {
        return Err(invalid(&def.id, "template must start and end with a shape"));
    }

    // Every flow consumer needs an earlier producer; every required binding
    // must come from some slot.
    let mut provided: FxHashSet<Binding> = FxHashSet::default();
    for slot in &template {
        if let Slot::Shape(spec) = slot {
            if spec.kind.consumes_flow() && !provided.contains(&Binding::Flow) {
                return Err(CatalogError::UnboundVariable {
                    pattern: def.id.clone(),
                    binding: Binding::Flow.name().to_string(),
                });
            }
            provided.extend(spec.kind.provides().iter().copied());
        }
    }
    for binding in &bindings {
        if !provided.contains(binding) {
            return Err(CatalogError::UnboundVariable {
                pattern: def.id.clone(),
                binding: binding.name().to_string(),
            });
        }
    }

    let unless = match &def.unless {
        Some(slot) => match compile_slot(&def.id, slot)? {
            Slot::Shape(spec) => Some(spec),
            Slot::Any { .. } => return Err(invalid(&def.id, "`unless` must be a shape")),
        },
        None => None,
    };

    Ok(Pattern {
        id: def.id,
        kind,
        effect,
        confidence,
        description: def.description,
        bindings,
        template,
        unless,
        include_tests: def.include_tests,
    })
}

fn compile_slot(pattern: &str, slot: &SlotDef) -> Result<Slot, CatalogError> {
    match (&slot.shape, slot.any) {
        (Some(_), Some(_)) => Err(invalid(pattern, "a slot is either a shape or `any`")),
        (None, None) => Err(invalid(pattern, "empty slot")),
        (None, Some(0)) => Err(invalid(pattern, "`any` must skip at least one statement")),
        (None, Some(max)) => Ok(Slot::Any { max }),
        (Some(shape), None) => {
            let kind = ShapeKind::parse_str(shape)
                .ok_or_else(|| invalid(pattern, &format!("unknown shape '{shape}'")))?;
            let field_pattern = match &slot.field_pattern {
                Some(raw) => Some(regex::Regex::new(raw).map_err(|e| {
                    CatalogError::InvalidRegex {
                        pattern: pattern.to_string(),
                        message: e.to_string(),
                    }
                })?),
                None => None,
            };
            Ok(Slot::Shape(ShapeSpec {
                kind,
                methods: slot.methods.clone(),
                functions: slot.functions.clone(),
                exclude: slot.exclude.clone(),
                skip_receivers: slot.skip_receivers.clone(),
                skip_functions: slot.skip_functions.clone(),
                field_pattern,
            }))
        }
    }
}

fn invalid(pattern: &str, message: &str) -> CatalogError {
    CatalogError::InvalidTemplate {
        pattern: pattern.to_string(),
        message: message.to_string(),
    }
}
