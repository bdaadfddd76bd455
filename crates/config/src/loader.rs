use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::BiometryConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "biometry.toml",
    "biometry.yaml",
    "biometry.yml",
    "biometry.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<BiometryConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply `BIOMETRY_*`
/// environment overrides.
///
/// Search order:
/// 1. `./biometry.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/biometry/biometry.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `BiometryConfig::default()` if no config file is found or
/// the file fails to parse.
pub fn discover_and_load() -> BiometryConfig {
    let config = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                BiometryConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        BiometryConfig::default()
    };
    apply_env_overrides(config)
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/biometry/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "biometry").map(|d| d.config_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("biometry.toml")
}

/// Serialize `config` to TOML and write it to the active config path.
///
/// Creates parent directories if needed. Returns the path written to.
pub fn save_config(config: &BiometryConfig) -> anyhow::Result<PathBuf> {
    let path = find_or_default_config_path();
    write_config(config, &path)?;
    Ok(path)
}

fn write_config(config: &BiometryConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw = match extension(path) {
        "yaml" | "yml" => serde_yaml::to_string(config)?,
        "json" => serde_json::to_string_pretty(config)?,
        _ => toml::to_string_pretty(config)
            .map_err(|e| anyhow::anyhow!("serialize config: {e}"))?,
    };
    std::fs::write(path, raw)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

/// Apply `BIOMETRY_*` environment variables on top of a loaded config.
///
/// Recognized variables:
/// - `BIOMETRY_DEFAULT_KEY_ALIAS`
/// - `BIOMETRY_CIPHER` (`aes-256-gcm` or `xchacha20-poly1305`)
/// - `BIOMETRY_PROMPT_TIMEOUT_SECS` (`0` or empty clears the timeout)
/// - `BIOMETRY_REQUIRE_AUTH_FOR_DELETE`
/// - `BIOMETRY_LOG_LEVEL`
/// - `BIOMETRY_LOG_JSON`
#[must_use]
pub fn apply_env_overrides(config: BiometryConfig) -> BiometryConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: BiometryConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> BiometryConfig {
    if let Some(alias) = lookup("BIOMETRY_DEFAULT_KEY_ALIAS") {
        config.keys.default_alias = alias;
    }

    if let Some(raw) = lookup("BIOMETRY_CIPHER") {
        match serde_json::from_value(serde_json::Value::String(raw.clone())) {
            Ok(algorithm) => config.cipher.algorithm = algorithm,
            Err(_) => warn!(value = %raw, "ignoring unknown BIOMETRY_CIPHER"),
        }
    }

    if let Some(raw) = lookup("BIOMETRY_PROMPT_TIMEOUT_SECS") {
        let raw = raw.trim();
        if raw.is_empty() || raw == "0" {
            config.prompt.timeout_secs = None;
        } else {
            match raw.parse::<u64>() {
                Ok(secs) => config.prompt.timeout_secs = Some(secs),
                Err(_) => warn!(value = %raw, "ignoring invalid BIOMETRY_PROMPT_TIMEOUT_SECS"),
            }
        }
    }

    if let Some(raw) = lookup("BIOMETRY_REQUIRE_AUTH_FOR_DELETE") {
        match parse_bool(&raw) {
            Some(flag) => config.security.require_auth_for_delete = flag,
            None => warn!(value = %raw, "ignoring invalid BIOMETRY_REQUIRE_AUTH_FOR_DELETE"),
        }
    }

    if let Some(level) = lookup("BIOMETRY_LOG_LEVEL") {
        config.logging.level = level;
    }

    if let Some(raw) = lookup("BIOMETRY_LOG_JSON") {
        match parse_bool(&raw) {
            Some(flag) => config.logging.json = flag,
            None => warn!(value = %raw, "ignoring invalid BIOMETRY_LOG_JSON"),
        }
    }

    config
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<BiometryConfig> {
    match extension(path) {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        ext => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
