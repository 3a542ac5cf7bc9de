//! `history.toml`: the dataset of past constraint issues.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cfinder_core::errors::HistoryError;
use cfinder_core::types::FxHashSet;

use crate::constraints::{ColumnRef, ColumnSet, ConstraintIdentity, ConstraintKind, DeleteBehavior};
use crate::schema::SchemaConstraint;

/// Parsed and validated dataset manifest. Relative paths are resolved
/// against the manifest's directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryManifest {
    #[serde(default)]
    pub applications: Vec<HistoryApplication>,
    #[serde(default)]
    pub issues: Vec<HistoryIssue>,
}

/// A directory of code snippets analyzed as one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryApplication {
    pub id: String,
    pub dir: PathBuf,
    /// Model files that live outside `dir` but declare the snippets' models.
    #[serde(default)]
    pub models: Vec<PathBuf>,
}

/// One past issue and the constraint that fixed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryIssue {
    pub id: String,
    pub app: String,
    pub kind: ConstraintKind,
    pub table: String,
    pub columns: Vec<String>,
    /// `table.column` of the referenced key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    /// Restrict matching to candidates found in these snippet files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl HistoryManifest {
    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        let text = std::fs::read_to_string(path).map_err(|e| HistoryError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut manifest = Self::from_toml(&text).map_err(|e| match e {
            HistoryError::Parse { message, .. } => HistoryError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for app in &mut manifest.applications {
            app.dir = base.join(&app.dir);
            for model in &mut app.models {
                *model = base.join(&*model);
            }
        }
        Ok(manifest)
    }

    pub fn from_toml(text: &str) -> Result<Self, HistoryError> {
        let manifest: Self = toml::from_str(text).map_err(|e| HistoryError::Parse {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), HistoryError> {
        let apps: FxHashSet<&str> = self.applications.iter().map(|a| a.id.as_str()).collect();
        let mut seen = FxHashSet::default();
        for issue in &self.issues {
            if !seen.insert(issue.id.as_str()) {
                return Err(invalid(issue, "duplicate issue id"));
            }
            if !apps.contains(issue.app.as_str()) {
                return Err(HistoryError::UnknownApplication {
                    issue: issue.id.clone(),
                    app: issue.app.clone(),
                });
            }
            issue.expected()?;
        }
        Ok(())
    }

    pub fn issues_of<'m>(&'m self, app: &'m str) -> impl Iterator<Item = &'m HistoryIssue> + 'm {
        self.issues.iter().filter(move |i| i.app == app)
    }
}

impl HistoryIssue {
    /// The expected constraint, shaped like a declared one.
    pub fn expected(&self) -> Result<SchemaConstraint, HistoryError> {
        let columns = ColumnSet::new(&self.columns);
        if columns.is_empty() || self.table.trim().is_empty() {
            return Err(invalid(self, "table and at least one column are required"));
        }
        let reference = match (&self.references, self.kind.has_reference()) {
            (Some(target), true) => {
                let (table, column) = target
                    .split_once('.')
                    .filter(|(t, c)| !t.is_empty() && !c.is_empty())
                    .ok_or_else(|| invalid(self, "references must be `table.column`"))?;
                Some(ColumnRef::new(table, column))
            }
            (None, true) => return Err(invalid(self, "references is required for this kind")),
            (Some(_), false) => return Err(invalid(self, "references is only valid for foreign keys")),
            (None, false) => None,
        };
        if self.kind.has_reference() && columns.len() != 1 {
            return Err(invalid(self, "foreign keys take exactly one column"));
        }
        // A cascade expectation is a foreign key declared ON DELETE CASCADE.
        let (kind, delete_behavior) = match self.kind {
            ConstraintKind::CascadeDelete => (ConstraintKind::ForeignKey, Some(DeleteBehavior::Cascade)),
            kind => (kind, None),
        };
        Ok(
            SchemaConstraint::new(ConstraintIdentity::new(kind, &self.table, columns, reference), "history")
                .with_delete_behavior(delete_behavior),
        )
    }

    /// Whether a candidate found in `files` may satisfy this issue.
    pub fn accepts_files<'a>(&self, mut files: impl Iterator<Item = &'a str>) -> bool {
        self.files.is_empty()
            || files.any(|file| {
                self.files
                    .iter()
                    .any(|wanted| file == wanted || file.ends_with(&format!("/{wanted}")))
            })
    }
}

fn invalid(issue: &HistoryIssue, message: &str) -> HistoryError {
    HistoryError::InvalidExpectation {
        issue: issue.id.clone(),
        message: message.to_string(),
    }
}
