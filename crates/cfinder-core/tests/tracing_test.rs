//! Tests for tracing initialization.

use cfinder_core::tracing::init_tracing;

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!(app = "shop", files = 3, "logging after init");
}

#[test]
fn test_init_tracing_with_invalid_filter_falls_back() {
    std::env::set_var("CFINDER_LOG", "this is [not a filter");
    init_tracing();
    tracing::debug!("still logging");
    std::env::remove_var("CFINDER_LOG");
}
