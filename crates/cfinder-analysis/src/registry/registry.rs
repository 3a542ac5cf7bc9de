//! The per-application model registry.
//!
//! Built once per application after every file has been extracted. Base
//! classes, relationship targets and field names are all resolved by name
//! through the indices below.

use cfinder_core::errors::{Diagnostic, DiagnosticScope, RegistryError};
use cfinder_core::types::collections::{FxHashMap, FxHashSet};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use smallvec::SmallVec;

use super::types::{
    DeclaredClass, DeleteBehavior, FieldDefinition, FieldLocation, Lookup, ModelDefinition,
    RelationKind, RelationTarget, ThroughTable,
};

/// Class name -> model, (model, field) -> column.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    app: String,
    models: Vec<ModelDefinition>,
    by_qualified: FxHashMap<String, usize>,
    by_simple: FxHashMap<String, SmallVec<[usize; 2]>>,
    diagnostics: Vec<Diagnostic>,
}

impl ModelRegistry {
    /// Build the registry from every class declared in an application.
    ///
    /// Classes on an inheritance cycle are dropped with a `REGISTRY_ERROR`
    /// diagnostic and look up as `NotFound`.
    pub fn build(app: &str, mut classes: Vec<DeclaredClass>, model_bases: &[String]) -> Self {
        classes.sort_by(|a, b| (a.file.as_str(), a.line).cmp(&(b.file.as_str(), b.line)));

        let mut diagnostics = Vec::new();
        let mut qualified_index: FxHashMap<String, usize> = FxHashMap::default();
        let mut declared: Vec<DeclaredClass> = Vec::with_capacity(classes.len());
        let mut duplicates: Vec<(usize, DeclaredClass)> = Vec::new();
        for class in classes {
            let qualified = class.qualified_name();
            match qualified_index.get(&qualified) {
                Some(&first) => duplicates.push((first, class)),
                None => {
                    qualified_index.insert(qualified, declared.len());
                    declared.push(class);
                }
            }
        }
        let mut simple_index: FxHashMap<String, SmallVec<[usize; 2]>> = FxHashMap::default();
        for (i, class) in declared.iter().enumerate() {
            simple_index.entry(class.name.clone()).or_default().push(i);
        }

        let resolver = ClassIndex {
            declared: &declared,
            by_qualified: &qualified_index,
            by_simple: &simple_index,
            model_bases,
        };
        let resolved_bases: Vec<Vec<usize>> = declared
            .iter()
            .map(|c| {
                c.bases
                    .iter()
                    .filter_map(|b| resolver.resolve_base(b, &c.app_label))
                    .collect()
            })
            .collect();

        // Cycle detection over the inheritance graph.
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..declared.len()).map(|i| graph.add_node(i)).collect();
        for (child, bases) in resolved_bases.iter().enumerate() {
            for &base in bases {
                graph.add_edge(nodes[child], nodes[base], ());
            }
        }
        let mut cyclic: FxHashSet<usize> = FxHashSet::default();
        for component in tarjan_scc(&graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| graph.contains_edge(n, n));
            if !is_cycle {
                continue;
            }
            let mut members: Vec<usize> = component.iter().map(|n| graph[*n]).collect();
            members.sort_unstable();
            let names: Vec<String> = members.iter().map(|&i| declared[i].qualified_name()).collect();
            for &i in &members {
                cyclic.insert(i);
                let err = RegistryError::InheritanceCycle {
                    classes: names.clone(),
                };
                diagnostics.push(Diagnostic::from_error(
                    DiagnosticScope::Class {
                        app: app.to_string(),
                        class: declared[i].qualified_name(),
                    },
                    &err,
                ));
            }
        }

        let mut memo: Vec<Option<bool>> = vec![None; declared.len()];
        for i in 0..declared.len() {
            resolver.is_model(i, &resolved_bases, &cyclic, &mut memo);
        }
        let is_model = |i: usize| memo[i].unwrap_or(false);

        for (first, dup) in &duplicates {
            if is_model(*first) {
                let err = RegistryError::DuplicateModel {
                    class: dup.qualified_name(),
                    first: declared[*first].file.clone(),
                    second: dup.file.clone(),
                };
                diagnostics.push(Diagnostic::from_error(
                    DiagnosticScope::Class {
                        app: app.to_string(),
                        class: dup.qualified_name(),
                    },
                    &err,
                ));
            }
        }

        let mut models: Vec<ModelDefinition> = (0..declared.len())
            .filter(|&i| is_model(i) && !cyclic.contains(&i))
            .map(|i| merge_model(i, &declared, &resolved_bases, &cyclic, &is_model))
            .collect();
        models.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));

        let mut registry = Self {
            app: app.to_string(),
            models,
            diagnostics,
            ..Default::default()
        };
        registry.reindex();
        tracing::debug!(
            app = %registry.app,
            models = registry.models.len(),
            "model registry built"
        );
        registry
    }

    fn reindex(&mut self) {
        self.by_qualified.clear();
        self.by_simple.clear();
        for (i, model) in self.models.iter().enumerate() {
            self.by_qualified.insert(model.qualified_name.clone(), i);
            self.by_simple.entry(model.name.clone()).or_default().push(i);
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn models(&self) -> &[ModelDefinition] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// `REGISTRY_ERROR` diagnostics produced while building.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Find a model by `"Model"`, `"app.Model"` or `module.Model`.
    ///
    /// Simple-name collisions prefer `from_label`, then the
    /// lexicographically first qualified name.
    pub fn lookup_model(&self, name: &str, from_label: Option<&str>) -> Lookup<&ModelDefinition> {
        let name = name.trim();
        if let Some(&i) = self.by_qualified.get(name) {
            return Lookup::Found(&self.models[i]);
        }
        let simple = name.rsplit('.').next().unwrap_or(name);
        let Some(candidates) = self.by_simple.get(simple) else {
            return Lookup::NotFound;
        };
        if let Some(label) = from_label {
            if let Some(&i) = candidates.iter().find(|&&i| self.models[i].app_label == label) {
                return Lookup::Found(&self.models[i]);
            }
        }
        candidates
            .first()
            .map(|&i| &self.models[i])
            .into()
    }

    /// Resolve a field by name, attribute name (`parent_id`) or `pk`.
    /// Fields of a concrete parent resolve to the parent's table.
    pub fn lookup_field(&self, model: &ModelDefinition, name: &str) -> Lookup<FieldLocation> {
        let name = name.trim();
        let field = if name == "pk" {
            model.primary_key()
        } else {
            model.own_field(name)
        };
        if let Some(field) = field {
            return Lookup::Found(FieldLocation {
                model: model.qualified_name.clone(),
                table: model.table.clone(),
                column: field.column.as_ref().map(|c| c.to_ascii_lowercase()),
                field: field.clone(),
            });
        }
        match &model.concrete_parent {
            Some(parent) => match self.lookup_model(parent, None) {
                Lookup::Found(parent) => self.lookup_field(parent, name),
                Lookup::NotFound => Lookup::NotFound,
            },
            None => Lookup::NotFound,
        }
    }

    /// Target model of a relational field.
    pub fn resolve_relation(
        &self,
        model: &ModelDefinition,
        relation: &RelationTarget,
    ) -> Lookup<&ModelDefinition> {
        if relation.target == "self" {
            return self.lookup_model(&model.qualified_name, None);
        }
        self.lookup_model(&relation.target, Some(&model.app_label))
    }

    /// `(table, column)` referenced by a FK/one-to-one field.
    pub fn referenced_column(
        &self,
        model: &ModelDefinition,
        relation: &RelationTarget,
    ) -> Lookup<(String, String)> {
        let Lookup::Found(target) = self.resolve_relation(model, relation) else {
            return Lookup::NotFound;
        };
        let key = relation.to_field.as_deref().unwrap_or("pk");
        self.lookup_field(target, key).found().and_then(|loc| {
            Some((loc.table, loc.column?))
        }).into()
    }

    /// Join table of a many-to-many field.
    pub fn through_table(&self, model: &ModelDefinition, field: &FieldDefinition) -> Lookup<ThroughTable> {
        let Some(relation) = field.relation.as_ref().filter(|r| r.kind == RelationKind::ManyToMany) else {
            return Lookup::NotFound;
        };
        let Lookup::Found(target) = self.resolve_relation(model, relation) else {
            return Lookup::NotFound;
        };

        if let Some(through) = &relation.through {
            let Lookup::Found(through_model) = self.lookup_model(through, Some(&model.app_label)) else {
                return Lookup::NotFound;
            };
            let links = through_model.fields.iter().filter_map(|f| {
                let rel = f.relation.as_ref()?;
                if rel.kind == RelationKind::ManyToMany {
                    return None;
                }
                let resolved = self.resolve_relation(through_model, rel).found()?;
                Some((resolved.qualified_name.clone(), f.column.clone()?))
            });
            let mut source = None;
            let mut dest = None;
            for (points_to, column) in links {
                if source.is_none() && points_to == model.qualified_name {
                    source = Some(column);
                } else if dest.is_none() && points_to == target.qualified_name {
                    dest = Some(column);
                }
            }
            return match (source, dest) {
                (Some(source_column), Some(target_column)) => Lookup::Found(ThroughTable {
                    table: through_model.table.clone(),
                    source_column,
                    target_column,
                }),
                _ => Lookup::NotFound,
            };
        }

        let source = model.name.to_ascii_lowercase();
        let dest = target.name.to_ascii_lowercase();
        let (source_column, target_column) = if source == dest {
            (format!("from_{source}_id"), format!("to_{dest}_id"))
        } else {
            (format!("{source}_id"), format!("{dest}_id"))
        };
        Lookup::Found(ThroughTable {
            table: format!("{}_{}", model.table, field.name.to_ascii_lowercase()),
            source_column,
            target_column,
        })
    }

    /// Concrete models on which `field` resolves.
    pub fn models_with_field(&self, field: &str) -> Vec<&ModelDefinition> {
        self.models
            .iter()
            .filter(|m| !m.is_abstract)
            .filter(|m| m.own_field(field).is_some())
            .collect()
    }
}

/// Name resolution over declared (not yet merged) classes.
struct ClassIndex<'a> {
    declared: &'a [DeclaredClass],
    by_qualified: &'a FxHashMap<String, usize>,
    by_simple: &'a FxHashMap<String, SmallVec<[usize; 2]>>,
    model_bases: &'a [String],
}

impl ClassIndex<'_> {
    fn is_configured_base(&self, base: &str) -> bool {
        self.model_bases.iter().any(|b| b == base)
    }

    fn resolve_base(&self, base: &str, label: &str) -> Option<usize> {
        if self.is_configured_base(base) {
            return None;
        }
        if let Some(&i) = self.by_qualified.get(base) {
            return Some(i);
        }
        let simple = base.rsplit('.').next().unwrap_or(base);
        let candidates = self.by_simple.get(simple)?;
        candidates
            .iter()
            .find(|&&i| self.declared[i].app_label == label)
            .or_else(|| candidates.first())
            .copied()
    }

    fn is_model(
        &self,
        i: usize,
        bases: &[Vec<usize>],
        cyclic: &FxHashSet<usize>,
        memo: &mut [Option<bool>],
    ) -> bool {
        if let Some(known) = memo[i] {
            return known;
        }
        if cyclic.contains(&i) {
            memo[i] = Some(false);
            return false;
        }
        memo[i] = Some(false);
        let direct = self.declared[i].bases.iter().any(|b| {
            self.is_configured_base(b)
                || self.is_configured_base(b.rsplit('.').next().unwrap_or(b))
        });
        let result = direct || bases[i].iter().any(|&b| self.is_model(b, bases, cyclic, memo));
        memo[i] = Some(result);
        result
    }
}

/// Fields, Meta and parent link of one model with its bases applied.
fn merge_model(
    i: usize,
    declared: &[DeclaredClass],
    bases: &[Vec<usize>],
    cyclic: &FxHashSet<usize>,
    is_model: &dyn Fn(usize) -> bool,
) -> ModelDefinition {
    let class = &declared[i];
    let mut fields: Vec<FieldDefinition> = Vec::new();
    let mut concrete_parent: Option<String> = None;
    let mut unique_together = class.unique_together.clone();
    let mut constraints = class.constraints.clone();

    for &b in &bases[i] {
        if cyclic.contains(&b) {
            continue;
        }
        let base = &declared[b];
        if is_model(b) && !base.is_abstract {
            if concrete_parent.is_none() {
                let lower = base.name.to_ascii_lowercase();
                concrete_parent = Some(base.qualified_name());
                fields.push(FieldDefinition {
                    name: format!("{lower}_ptr"),
                    attname: format!("{lower}_ptr_id"),
                    column: Some(format!("{lower}_ptr_id")),
                    field_type: "OneToOneField".to_string(),
                    nullable: false,
                    unique: true,
                    primary_key: true,
                    relation: Some(RelationTarget {
                        target: base.qualified_name(),
                        kind: RelationKind::OneToOne,
                        on_delete: Some(DeleteBehavior::Cascade),
                        through: None,
                        to_field: None,
                    }),
                    line: class.line,
                });
            }
            continue;
        }
        let (inherited, meta) = abstract_fields(b, declared, bases, cyclic, is_model);
        for field in inherited {
            override_field(&mut fields, field);
        }
        if !class.has_meta {
            if let Some((ut, cons)) = meta {
                unique_together.extend(ut);
                constraints.extend(cons);
            }
        }
    }
    for field in &class.fields {
        override_field(&mut fields, field.clone());
    }
    if !fields.iter().any(|f| f.primary_key) {
        fields.insert(0, FieldDefinition::implicit_id());
    }

    let table = class
        .db_table
        .clone()
        .unwrap_or_else(|| format!("{}_{}", class.app_label, class.name.to_ascii_lowercase()));

    ModelDefinition {
        name: class.name.clone(),
        qualified_name: class.qualified_name(),
        app_label: class.app_label.clone(),
        table: table.to_ascii_lowercase(),
        is_abstract: class.is_abstract,
        fields,
        bases: class.bases.clone(),
        concrete_parent,
        unique_together,
        constraints,
        file: class.file.clone(),
        line: class.line,
    }
}

type InheritedMeta = (Vec<Vec<String>>, Vec<super::types::MetaConstraint>);

/// Fields contributed by an abstract base or mixin, bases first.
fn abstract_fields(
    i: usize,
    declared: &[DeclaredClass],
    bases: &[Vec<usize>],
    cyclic: &FxHashSet<usize>,
    is_model: &dyn Fn(usize) -> bool,
) -> (Vec<FieldDefinition>, Option<InheritedMeta>) {
    let class = &declared[i];
    let mut fields = Vec::new();
    let mut meta: Option<InheritedMeta> = None;
    for &b in &bases[i] {
        if cyclic.contains(&b) || (is_model(b) && !declared[b].is_abstract) {
            continue;
        }
        let (inherited, base_meta) = abstract_fields(b, declared, bases, cyclic, is_model);
        for field in inherited {
            override_field(&mut fields, field);
        }
        if meta.is_none() {
            meta = base_meta;
        }
    }
    for field in &class.fields {
        override_field(&mut fields, field.clone());
    }
    if class.has_meta {
        meta = Some((class.unique_together.clone(), class.constraints.clone()));
    }
    (fields, meta)
}

fn override_field(fields: &mut Vec<FieldDefinition>, field: FieldDefinition) {
    match fields.iter_mut().find(|f| f.name == field.name) {
        Some(existing) => *existing = field,
        None => fields.push(field),
    }
}
