//! Configuration loading, validation, and env substitution.
//!
//! Config files: `biometry.toml`, `biometry.yaml`, or `biometry.json`
//! Searched in `./` then `~/.config/biometry/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values and `BIOMETRY_*`
//! overrides for the most common settings.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_or_default_config_path,
        load_config, save_config,
    },
    schema::{
        BiometryConfig, CipherAlgorithm, CipherConfig, KeysConfig, LoggingConfig, PromptConfig,
        SecurityConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
