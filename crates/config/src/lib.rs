//! Configuration loading, validation, and env substitution.
//!
//! Config files: `lcbot.toml`, `lcbot.yaml`, or `lcbot.json`
//! Searched in `./` then `~/.config/lcbot/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution anywhere in
//! the file.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        BotConfig, BotSettings, CredentialsConfig, PlatformConfig, ServerConfig, WebhooksConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_config},
};
