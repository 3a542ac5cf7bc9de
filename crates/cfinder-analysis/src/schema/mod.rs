//! Schema loaders: the constraints an application declares.
//!
//! Sources are SQL DDL, a JSON constraint dump, or the models themselves.
//! Files are read during the per-application file phase; the models source
//! needs the registry and is materialized after it is built.

pub mod json;
pub mod models;
pub mod sql;
pub mod types;

use std::path::{Path, PathBuf};

use cfinder_core::config::{SchemaConfig, SchemaSourceKind, SqlDialectKind};
use cfinder_core::constants::SCHEMA_DUMP_FILE;
use cfinder_core::errors::SchemaError;

use crate::constraints::IgnoreFilter;
use crate::registry::ModelRegistry;
use crate::scanner::Application;

pub use types::{DeclaredSchema, SchemaConstraint};

/// Result of the file phase of schema loading.
#[derive(Debug, Clone)]
pub enum SchemaLoad {
    Loaded(DeclaredSchema),
    /// Read the declarations from the model registry once it exists.
    FromModels,
}

impl SchemaLoad {
    /// Finish loading with the application's registry.
    pub fn complete(self, registry: &ModelRegistry, filter: &IgnoreFilter) -> DeclaredSchema {
        match self {
            Self::Loaded(schema) => schema,
            Self::FromModels => DeclaredSchema::new(
                SchemaSourceKind::Models,
                models::schema_from_models(registry),
                filter,
            ),
        }
    }
}

/// Picks and reads an application's schema source.
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    source: SchemaSourceKind,
    dialect: SqlDialectKind,
    /// Per-application directory, relative to the application root.
    app_dir: Option<String>,
    /// Run-level directory holding `<app>.sql` / `<app>.json`.
    schemas_dir: Option<PathBuf>,
    filter: IgnoreFilter,
}

impl SchemaLoader {
    pub fn new(config: &SchemaConfig, filter: IgnoreFilter) -> Self {
        Self {
            source: config.effective_source(),
            dialect: config.effective_dialect(),
            app_dir: config.dir.clone(),
            schemas_dir: None,
            filter,
        }
    }

    pub fn with_schemas_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.schemas_dir = dir;
        self
    }

    pub fn filter(&self) -> &IgnoreFilter {
        &self.filter
    }

    /// Load the file-based sources of `app`. `sql_files` are the DDL files
    /// discovered under the application root.
    pub fn load(&self, app: &Application, sql_files: &[PathBuf]) -> Result<SchemaLoad, SchemaError> {
        let json = self.json_file(app);
        let sql = self.sql_files(app, sql_files);
        let load = match self.source {
            SchemaSourceKind::Models => SchemaLoad::FromModels,
            SchemaSourceKind::Json => {
                let path = json.ok_or_else(|| SchemaError::NotFound { app: app.id.clone() })?;
                self.from_json(&path)?
            }
            SchemaSourceKind::Sql => {
                if sql.is_empty() {
                    return Err(SchemaError::NotFound { app: app.id.clone() });
                }
                self.from_sql(&sql)?
            }
            SchemaSourceKind::Auto => match json {
                Some(path) => self.from_json(&path)?,
                None if !sql.is_empty() => self.from_sql(&sql)?,
                None => SchemaLoad::FromModels,
            },
        };
        if let SchemaLoad::Loaded(schema) = &load {
            tracing::debug!(
                app = %app.id,
                source = schema.source.name(),
                constraints = schema.len(),
                "loaded declared schema"
            );
        }
        Ok(load)
    }

    fn from_json(&self, path: &Path) -> Result<SchemaLoad, SchemaError> {
        let constraints = json::load_json_file(path)?;
        Ok(SchemaLoad::Loaded(DeclaredSchema::new(
            SchemaSourceKind::Json,
            constraints,
            &self.filter,
        )))
    }

    fn from_sql(&self, files: &[PathBuf]) -> Result<SchemaLoad, SchemaError> {
        let constraints = sql::load_sql_files(files, self.dialect)?;
        Ok(SchemaLoad::Loaded(DeclaredSchema::new(
            SchemaSourceKind::Sql,
            constraints,
            &self.filter,
        )))
    }

    fn json_file(&self, app: &Application) -> Option<PathBuf> {
        if let Some(dir) = &self.schemas_dir {
            let path = dir.join(format!("{}.json", app.id));
            if path.is_file() {
                return Some(path);
            }
        }
        let base = match &self.app_dir {
            Some(dir) => app.root.join(dir),
            None => app.root.clone(),
        };
        Some(base.join(SCHEMA_DUMP_FILE)).filter(|p| p.is_file())
    }

    fn sql_files(&self, app: &Application, discovered: &[PathBuf]) -> Vec<PathBuf> {
        if let Some(dir) = &self.schemas_dir {
            let path = dir.join(format!("{}.sql", app.id));
            if path.is_file() {
                return vec![path];
            }
        }
        let mut files: Vec<PathBuf> = match &self.app_dir {
            Some(dir) => {
                let base = app.root.join(dir);
                discovered.iter().filter(|p| p.starts_with(&base)).cloned().collect()
            }
            None => discovered.to_vec(),
        };
        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader(source: &str) -> SchemaLoader {
        let config = SchemaConfig {
            source: Some(source.to_string()),
            ..Default::default()
        };
        SchemaLoader::new(&config, IgnoreFilter::default())
    }

    #[test]
    fn auto_prefers_json_then_sql_then_models() {
        let dir = tempfile::tempdir().unwrap();
        let app = Application::new("shop", dir.path());
        assert!(matches!(loader("auto").load(&app, &[]).unwrap(), SchemaLoad::FromModels));

        let ddl = dir.path().join("schema.sql");
        std::fs::write(&ddl, "CREATE TABLE shop_a (id integer PRIMARY KEY);").unwrap();
        match loader("auto").load(&app, &[ddl.clone()]).unwrap() {
            SchemaLoad::Loaded(schema) => assert_eq!(schema.source, SchemaSourceKind::Sql),
            other => panic!("unexpected {other:?}"),
        }

        std::fs::write(dir.path().join(SCHEMA_DUMP_FILE), r#"{"unique": []}"#).unwrap();
        match loader("auto").load(&app, &[ddl]).unwrap() {
            SchemaLoad::Loaded(schema) => assert_eq!(schema.source, SchemaSourceKind::Json),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn explicit_sql_without_files_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = Application::new("shop", dir.path());
        assert!(matches!(
            loader("sql").load(&app, &[]),
            Err(SchemaError::NotFound { .. })
        ));
    }

    #[test]
    fn schemas_dir_maps_application_ids() {
        let apps = tempfile::tempdir().unwrap();
        let schemas = tempfile::tempdir().unwrap();
        std::fs::write(
            schemas.path().join("shop.sql"),
            "CREATE TABLE shop_item (id integer PRIMARY KEY, sku text UNIQUE);",
        )
        .unwrap();
        let app = Application::new("shop", apps.path());
        let loader = loader("sql").with_schemas_dir(Some(schemas.path().to_path_buf()));
        match loader.load(&app, &[]).unwrap() {
            SchemaLoad::Loaded(schema) => assert_eq!(schema.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }
}
