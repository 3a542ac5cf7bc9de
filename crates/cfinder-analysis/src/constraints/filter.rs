//! Table and column ignore lists shared by the resolver and schema loaders.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use cfinder_core::config::CompareConfig;
use cfinder_core::types::FxHashSet;

/// Compiled ignore lists. Table keywords match anywhere in the table name,
/// case-insensitively; column names match exactly.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    tables: Option<AhoCorasick>,
    columns: FxHashSet<String>,
}

impl IgnoreFilter {
    pub fn new(table_keywords: &[String], columns: &[String]) -> Self {
        let tables = if table_keywords.is_empty() {
            None
        } else {
            AhoCorasickBuilder::new()
                .ascii_case_insensitive(true)
                .build(table_keywords)
                .ok()
        };
        Self {
            tables,
            columns: columns.iter().map(|c| c.to_ascii_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &CompareConfig) -> Self {
        Self::new(
            &config.effective_ignored_table_keywords(),
            &config.effective_ignored_columns(),
        )
    }

    pub fn ignores_table(&self, table: &str) -> bool {
        self.tables.as_ref().is_some_and(|ac| ac.is_match(table))
    }

    pub fn ignores_column(&self, column: &str) -> bool {
        self.columns.contains(&column.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_match_inside_table_names() {
        let filter = IgnoreFilter::new(&["django_".into(), "Historical".into()], &["lft".into()]);
        assert!(filter.ignores_table("django_session"));
        assert!(filter.ignores_table("shop_historicalorder"));
        assert!(!filter.ignores_table("shop_order"));
        assert!(filter.ignores_column("LFT"));
        assert!(!filter.ignores_column("left"));
    }

    #[test]
    fn empty_filter_ignores_nothing() {
        let filter = IgnoreFilter::default();
        assert!(!filter.ignores_table("django_session"));
        assert!(!filter.ignores_column("id"));
    }
}
