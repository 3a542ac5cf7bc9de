//! Language detection from file extension.

use serde::{Deserialize, Serialize};

/// File languages the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Application source, analyzed for idioms and model declarations.
    Python,
    /// Schema DDL, read by the SQL schema loader.
    Sql,
}

impl Language {
    /// Detect language from a file extension string.
    pub fn from_extension(ext: Option<&str>) -> Option<Language> {
        match ext? {
            "py" | "pyi" => Some(Language::Python),
            "sql" | "ddl" => Some(Language::Sql),
            _ => None,
        }
    }

    /// Returns all file extensions associated with this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyi"],
            Language::Sql => &["sql", "ddl"],
        }
    }

    /// Returns the display name of the language.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Sql => "SQL",
        }
    }
}
