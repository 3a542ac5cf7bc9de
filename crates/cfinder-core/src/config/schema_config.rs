//! Schema loader configuration.

use serde::{Deserialize, Serialize};

/// Where declared constraints come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSourceKind {
    Auto,
    Sql,
    Json,
    Models,
}

impl SchemaSourceKind {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "sql" => Some(Self::Sql),
            "json" => Some(Self::Json),
            "models" => Some(Self::Models),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Sql => "sql",
            Self::Json => "json",
            Self::Models => "models",
        }
    }
}

/// SQL dialect used to parse DDL files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlDialectKind {
    Generic,
    Postgres,
    MySql,
    Sqlite,
}

impl SqlDialectKind {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "ansi" => Some(Self::Generic),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "mysql" => Some(Self::MySql),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Configuration for declared-schema loading.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SchemaConfig {
    /// `auto`, `sql`, `json` or `models`. Default: auto.
    pub source: Option<String>,
    /// SQL dialect for DDL files. Default: generic.
    pub dialect: Option<String>,
    /// Directory (relative to the application root) holding schema files.
    pub dir: Option<String>,
}

impl SchemaConfig {
    /// Returns the configured source, defaulting to `auto`.
    pub fn effective_source(&self) -> SchemaSourceKind {
        self.source
            .as_deref()
            .and_then(SchemaSourceKind::parse_str)
            .unwrap_or(SchemaSourceKind::Auto)
    }

    /// Returns the configured dialect, defaulting to `generic`.
    pub fn effective_dialect(&self) -> SqlDialectKind {
        self.dialect
            .as_deref()
            .and_then(SqlDialectKind::parse_str)
            .unwrap_or(SqlDialectKind::Generic)
    }
}
