//! Shared constants for the CFinder engine.

/// CFinder version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum file size in bytes for scanning (default: 1MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Default number of threads (0 = rayon default).
pub const DEFAULT_THREADS: usize = 0;

/// Default statement window for multi-statement patterns.
pub const DEFAULT_WINDOW: usize = 8;

/// Default maximum depth a slot shape searches inside one statement.
pub const DEFAULT_MAX_DEPTH: usize = 12;

/// Default syntactic nesting limit for one parsed file.
pub const DEFAULT_MAX_NESTING: usize = 128;

/// Default per-file parse + match budget in milliseconds.
pub const DEFAULT_FILE_BUDGET_MS: u64 = 5_000;

/// UNIQUE candidates wider than this are treated as noise.
pub const DEFAULT_MAX_UNIQUE_COLUMNS: usize = 3;

/// Default parse cache capacity (entries).
pub const DEFAULT_PARSE_CACHE_CAPACITY: u64 = 10_000;

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "cfinder.toml";

/// JSON constraint dump looked up in each application root.
pub const SCHEMA_DUMP_FILE: &str = "cfinder_schema.json";

/// Path markers that flag a source file as test code.
pub const DEFAULT_TEST_MARKERS: &[&str] = &["test", "tests"];

/// Base classes that make a class a data model.
pub const DEFAULT_MODEL_BASES: &[&str] = &[
    "Model",
    "models.Model",
    "AbstractUser",
    "AbstractBaseUser",
    "PolymorphicModel",
    "MPTTModel",
];

/// Table name fragments of framework and third-party tables.
pub const DEFAULT_IGNORED_TABLE_KEYWORDS: &[&str] = &[
    "django_",
    "auth_",
    "celery",
    "taggit",
    "historical",
    "silk_",
    "social_auth",
    "oauth2_provider",
    "guardian_",
    "reversion_",
    "easy_thumbnails",
    "waffle_",
];

/// Column names maintained by third-party libraries.
pub const DEFAULT_IGNORED_COLUMNS: &[&str] = &[
    "lft",
    "rght",
    "tree_id",
    "level",
    "content_type_id",
    "object_id",
    "polymorphic_ctype_id",
];
