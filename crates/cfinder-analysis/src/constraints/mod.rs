//! Constraint vocabulary shared by the catalog, resolver, schema loaders and
//! comparator.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod filter;

pub use crate::registry::DeleteBehavior;
pub use filter::IgnoreFilter;

/// Constraint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    Unique,
    NotNull,
    ForeignKey,
    Check,
    CascadeDelete,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 5] = [
        ConstraintKind::Unique,
        ConstraintKind::NotNull,
        ConstraintKind::ForeignKey,
        ConstraintKind::Check,
        ConstraintKind::CascadeDelete,
    ];

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "UNIQUE" => Some(Self::Unique),
            "NOT_NULL" => Some(Self::NotNull),
            "FOREIGN_KEY" | "FK" => Some(Self::ForeignKey),
            "CHECK" => Some(Self::Check),
            "CASCADE_DELETE" | "CASCADE" => Some(Self::CascadeDelete),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unique => "UNIQUE",
            Self::NotNull => "NOT_NULL",
            Self::ForeignKey => "FOREIGN_KEY",
            Self::Check => "CHECK",
            Self::CascadeDelete => "CASCADE_DELETE",
        }
    }

    /// Kinds that carry a referenced table/column.
    pub fn has_reference(&self) -> bool {
        matches!(self, Self::ForeignKey | Self::CascadeDelete)
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a Finding's model was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Exact,
    Heuristic,
}

impl Confidence {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "exact" => Some(Self::Exact),
            "heuristic" => Some(Self::Heuristic),
            _ => None,
        }
    }

    /// The weaker of two confidences.
    pub fn min(self, other: Confidence) -> Confidence {
        if self == Confidence::Heuristic || other == Confidence::Heuristic {
            Confidence::Heuristic
        } else {
            Confidence::Exact
        }
    }
}

/// Whether a pattern is evidence for or against a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Infer,
    Refute,
}

impl Effect {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "infer" => Some(Self::Infer),
            "refute" => Some(Self::Refute),
            _ => None,
        }
    }
}

/// Sorted, lower-cased, duplicate-free column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSet(BTreeSet<String>);

impl ColumnSet {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            columns
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }

    pub fn single(column: &str) -> Self {
        Self::new([column])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains(&column.to_ascii_lowercase())
    }

    pub fn is_subset(&self, other: &ColumnSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The only column of a single-column set.
    pub fn sole(&self) -> Option<&str> {
        if self.0.len() == 1 {
            self.0.iter().next().map(String::as_str)
        } else {
            None
        }
    }
}

impl fmt::Display for ColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols: Vec<&str> = self.iter().collect();
        write!(f, "({})", cols.join(", "))
    }
}

/// Referenced `table.column` of a FK or cascade constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.trim().to_ascii_lowercase(),
            column: column.trim().to_ascii_lowercase(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Canonical identity: (kind, table, column-set, reference).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintIdentity {
    pub kind: ConstraintKind,
    pub table: String,
    pub columns: ColumnSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ColumnRef>,
}

impl ConstraintIdentity {
    pub fn new(kind: ConstraintKind, table: &str, columns: ColumnSet, reference: Option<ColumnRef>) -> Self {
        Self {
            kind,
            table: table.trim().to_ascii_lowercase(),
            columns,
            reference,
        }
    }
}

impl fmt::Display for ConstraintIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.kind, self.table, self.columns)?;
        if let Some(reference) = &self.reference {
            write!(f, " -> {reference}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_sets_ignore_case_and_order() {
        assert_eq!(ColumnSet::new(["B", "a"]), ColumnSet::new(["a", "b"]));
        assert_eq!(ColumnSet::new(["a", "A"]).len(), 1);
        assert!(ColumnSet::new(["a"]).is_subset(&ColumnSet::new(["b", "a"])));
    }

    #[test]
    fn identity_display() {
        let id = ConstraintIdentity::new(
            ConstraintKind::ForeignKey,
            "Shop_Order",
            ColumnSet::single("customer_id"),
            Some(ColumnRef::new("shop_customer", "id")),
        );
        assert_eq!(id.to_string(), "FOREIGN_KEY shop_order(customer_id) -> shop_customer.id");
    }

    #[test]
    fn kind_names_parse_back() {
        for kind in ConstraintKind::ALL {
            assert_eq!(ConstraintKind::parse_str(kind.name()), Some(kind));
        }
    }
}
