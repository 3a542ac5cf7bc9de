//! Core types, errors, configuration, events, and tracing for CFinder.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod tracing;
pub mod types;
