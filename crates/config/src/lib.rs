//! Configuration loading, validation, and env substitution.
//!
//! Config files: `volley.toml`, `volley.yaml`, or `volley.json`
//! Searched in `./` then `~/.config/volley/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, expand_tilde, find_config_file, load_config},
    schema::{
        CampaignConfig, DispatchConfig, LedgerConfig, MediaMode, PacingConfig, SessionConfig,
        VolleyConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
