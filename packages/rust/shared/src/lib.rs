//! Shared types, error model, and configuration for Icebreaker.
//!
//! This crate is the foundation depended on by all other Icebreaker crates.
//! It provides:
//! - [`IcebreakerError`]: the unified error type
//! - Domain types ([`Lead`], [`LeadOutcome`], [`FailureReason`], [`RunId`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, FetchConfig, FetchSection, LlmConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, read_api_key,
};
pub use error::{IcebreakerError, Result};
pub use types::{FailureReason, Lead, LeadOutcome, OutcomeRecord, RunId};
