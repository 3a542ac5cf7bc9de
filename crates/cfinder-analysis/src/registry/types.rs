//! Model registry types.

use serde::{Deserialize, Serialize};

/// Typed lookup outcome. Unknown classes and fields are ordinary results,
/// never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }
}

/// Relationship flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ForeignKey,
    OneToOne,
    ManyToMany,
}

/// Referential action on delete of the referenced row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeleteBehavior {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl DeleteBehavior {
    /// Parse Django (`models.CASCADE`, `PROTECT`, `DO_NOTHING`) and SQL
    /// (`CASCADE`, `SET NULL`, `NO ACTION`) spellings.
    pub fn parse(raw: &str) -> Option<Self> {
        let tail = raw.rsplit('.').next().unwrap_or(raw);
        let norm = tail.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match norm.as_str() {
            "CASCADE" => Some(Self::Cascade),
            "SET_NULL" => Some(Self::SetNull),
            "SET_DEFAULT" => Some(Self::SetDefault),
            "RESTRICT" | "PROTECT" => Some(Self::Restrict),
            "NO_ACTION" | "DO_NOTHING" => Some(Self::NoAction),
            _ => None,
        }
    }
}

/// Raw relationship declaration of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTarget {
    /// Target as written: `"self"`, `"Model"`, `"app.Model"`, `module.Model`.
    pub target: String,
    pub kind: RelationKind,
    pub on_delete: Option<DeleteBehavior>,
    /// Explicit many-to-many through model.
    pub through: Option<String>,
    /// `to_field=`; the primary key when absent.
    pub to_field: Option<String>,
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Attribute name: `<name>_id` for FK/one-to-one, else the name.
    pub attname: String,
    /// Database column; `None` for many-to-many fields.
    pub column: Option<String>,
    pub field_type: String,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub relation: Option<RelationTarget>,
    pub line: u32,
}

impl FieldDefinition {
    /// The implicit `id` primary key.
    pub fn implicit_id() -> Self {
        Self {
            name: "id".to_string(),
            attname: "id".to_string(),
            column: Some("id".to_string()),
            field_type: "AutoField".to_string(),
            nullable: false,
            unique: true,
            primary_key: true,
            relation: None,
            line: 0,
        }
    }

    pub fn is_many_to_many(&self) -> bool {
        matches!(&self.relation, Some(r) if r.kind == RelationKind::ManyToMany)
    }
}

/// `Meta.constraints` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaConstraint {
    Unique {
        name: Option<String>,
        fields: Vec<String>,
    },
    Check {
        name: Option<String>,
        fields: Vec<String>,
        predicate: String,
    },
}

/// A class as declared in one file, before inheritance is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredClass {
    pub name: String,
    pub app_label: String,
    pub file: String,
    pub line: u32,
    /// Base expressions as dotted names.
    pub bases: Vec<String>,
    pub fields: Vec<FieldDefinition>,
    pub db_table: Option<String>,
    pub is_abstract: bool,
    pub has_meta: bool,
    pub unique_together: Vec<Vec<String>>,
    pub constraints: Vec<MetaConstraint>,
}

impl DeclaredClass {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.app_label, self.name)
    }
}

/// A data model with inheritance resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub qualified_name: String,
    pub app_label: String,
    pub table: String,
    pub is_abstract: bool,
    /// Own fields plus fields inherited from abstract bases, in order.
    pub fields: Vec<FieldDefinition>,
    pub bases: Vec<String>,
    /// Qualified name of the concrete parent (multi-table inheritance).
    pub concrete_parent: Option<String>,
    pub unique_together: Vec<Vec<String>>,
    pub constraints: Vec<MetaConstraint>,
    pub file: String,
    pub line: u32,
}

impl ModelDefinition {
    /// The primary key field (declared, parent link, or implicit `id`).
    pub fn primary_key(&self) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.primary_key)
    }

    pub fn own_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.attname == name))
            .or_else(|| {
                self.fields
                    .iter()
                    .find(|f| f.relation.is_some() && f.column.as_deref() == Some(name))
            })
    }
}

/// Where a field lives in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLocation {
    /// Qualified name of the model that stores the column.
    pub model: String,
    pub table: String,
    /// `None` for many-to-many fields.
    pub column: Option<String>,
    pub field: FieldDefinition,
}

impl FieldLocation {
    pub fn nullable(&self) -> bool {
        self.field.nullable
    }
}

/// Join table of a many-to-many field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThroughTable {
    pub table: String,
    pub source_column: String,
    pub target_column: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_behavior_spellings() {
        assert_eq!(DeleteBehavior::parse("models.CASCADE"), Some(DeleteBehavior::Cascade));
        assert_eq!(DeleteBehavior::parse("PROTECT"), Some(DeleteBehavior::Restrict));
        assert_eq!(DeleteBehavior::parse("set null"), Some(DeleteBehavior::SetNull));
        assert_eq!(DeleteBehavior::parse("DO_NOTHING"), Some(DeleteBehavior::NoAction));
        assert_eq!(DeleteBehavior::parse("models.SET"), None);
    }
}
