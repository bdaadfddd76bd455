//! Configuration validation engine.
//!
//! Validates configuration files against the known schema, detects
//! unknown/misspelled fields, and reports values that would make a biometric
//! ceremony unusable or weaken key protection.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::schema::BiometryConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "value", "security",
    /// "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "prompt.timeout_secs"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn single(severity: Severity, category: &'static str, message: String) -> Self {
        Self {
            diagnostics: vec![Diagnostic {
                severity,
                category,
                path: String::new(),
                message,
            }],
            config_path: None,
        }
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Represents the expected shape of the configuration schema.
enum KnownKeys {
    /// A table with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// Scalar value, stop recursion.
    Leaf,
}

/// Build the schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    Struct(HashMap::from([
        ("keys", Struct(HashMap::from([("default_alias", Leaf)]))),
        ("cipher", Struct(HashMap::from([("algorithm", Leaf)]))),
        (
            "prompt",
            Struct(HashMap::from([
                ("prompt_message", Leaf),
                ("cancel_button_text", Leaf),
                ("allow_device_credentials", Leaf),
                ("timeout_secs", Leaf),
            ])),
        ),
        (
            "security",
            Struct(HashMap::from([("require_auth_for_delete", Leaf)])),
        ),
        (
            "logging",
            Struct(HashMap::from([("level", Leaf), ("json", Leaf)])),
        ),
    ]))
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Prompts left open longer than this are almost certainly abandoned.
const LONG_PROMPT_TIMEOUT_SECS: u64 = 600;

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Find the closest candidate within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(actual_path) = config_path else {
        return ValidationResult::single(
            Severity::Info,
            "file-ref",
            "no config file found; using defaults".into(),
        );
    };

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(raw) => {
            let raw = crate::env_subst::substitute_env(&raw);
            match actual_path.extension().and_then(|e| e.to_str()) {
                Some("yaml" | "yml") => match serde_yaml::from_str::<toml::Value>(&raw) {
                    Ok(value) => validate_value(value),
                    Err(e) => ValidationResult::single(
                        Severity::Error,
                        "syntax",
                        format!("YAML syntax error: {e}"),
                    ),
                },
                Some("json") => match serde_json::from_str::<toml::Value>(&raw) {
                    Ok(value) => validate_value(value),
                    Err(e) => ValidationResult::single(
                        Severity::Error,
                        "syntax",
                        format!("JSON syntax error: {e}"),
                    ),
                },
                _ => validate_toml_str(&raw),
            }
        },
        Err(e) => ValidationResult::single(
            Severity::Error,
            "syntax",
            format!("failed to read config file: {e}"),
        ),
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    match toml::from_str::<toml::Value>(toml_str) {
        Ok(value) => validate_value(value),
        Err(e) => {
            ValidationResult::single(Severity::Error, "syntax", format!("TOML syntax error: {e}"))
        },
    }
}

/// Validate an already-loaded config (e.g. after env overrides).
#[must_use]
pub fn validate_config(config: &BiometryConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_semantics(config, &mut diagnostics);
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn validate_value(value: toml::Value) -> ValidationResult {
    let mut diagnostics = Vec::new();

    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    let parsed: Result<BiometryConfig, _> = value.try_into();
    match parsed {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Walk the value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        // Leaf or type mismatch, type errors are caught by deserialization.
        return;
    };

    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let message = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message: message.trim().to_string(),
        });
    }
}

/// Run semantic checks on a successfully parsed config.
fn check_semantics(config: &BiometryConfig, diagnostics: &mut Vec<Diagnostic>) {
    let mut push = |severity, category, path: &str, message: String| {
        diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message,
        });
    };

    if config.keys.default_alias.trim().is_empty() {
        push(
            Severity::Error,
            "value",
            "keys.default_alias",
            "default key alias must not be empty".into(),
        );
    }

    if config.prompt.prompt_message.trim().is_empty() {
        push(
            Severity::Error,
            "value",
            "prompt.prompt_message",
            "prompt message must not be empty".into(),
        );
    }

    if config.prompt.cancel_button_text.trim().is_empty() && !config.prompt.allow_device_credentials
    {
        push(
            Severity::Error,
            "value",
            "prompt.cancel_button_text",
            "cancel button text is required unless device credentials are allowed".into(),
        );
    }

    match config.prompt.timeout_secs {
        Some(0) => push(
            Severity::Error,
            "value",
            "prompt.timeout_secs",
            "timeout of 0 cancels every prompt; omit it to wait indefinitely".into(),
        ),
        Some(secs) if secs > LONG_PROMPT_TIMEOUT_SECS => push(
            Severity::Warning,
            "value",
            "prompt.timeout_secs",
            format!("prompt timeout of {secs}s is unusually long"),
        ),
        _ => {},
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        let message = match suggest(&level, LOG_LEVELS, 2) {
            Some(s) => format!(
                "unknown log level \"{}\" (did you mean \"{s}\"?)",
                config.logging.level
            ),
            None => format!(
                "unknown log level \"{}\"; expected one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        };
        push(Severity::Warning, "value", "logging.level", message);
    }

    if !config.security.require_auth_for_delete {
        push(
            Severity::Info,
            "security",
            "security.require_auth_for_delete",
            "keys can be deleted without biometric authentication".into(),
        );
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(result: &'a ValidationResult, path: &str) -> Option<&'a Diagnostic> {
        result.diagnostics.iter().find(|d| d.path == path)
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("prompt", "prompt"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("cipher", "ciper"), 1);
        assert_eq!(levenshtein("keys", "kays"), 1);
    }

    #[test]
    fn suggest_picks_closest() {
        assert_eq!(suggest("securty", &["security", "logging"], 3), Some("security"));
        assert_eq!(suggest("zzzzzzzz", &["keys"], 3), None);
    }

    #[test]
    fn empty_config_is_valid() {
        let result = validate_toml_str("");
        assert!(
            !result.has_errors(),
            "empty config should be valid, got: {:?}",
            result.diagnostics
        );
        assert_eq!(result.count(Severity::Warning), 0);
        assert!(find(&result, "security.require_auth_for_delete").is_some());
    }

    #[test]
    fn full_valid_config_no_diagnostics() {
        let toml = r#"
[keys]
default_alias = "vault_key"

[cipher]
algorithm = "aes-256-gcm"

[prompt]
prompt_message = "Unlock your vault"
cancel_button_text = "Use password"
timeout_secs = 60

[security]
require_auth_for_delete = true

[logging]
level = "debug"
json = true
"#;
        let result = validate_toml_str(toml);
        assert!(
            result.diagnostics.is_empty(),
            "expected no diagnostics, got: {:?}",
            result.diagnostics
        );
    }

    #[test]
    fn syntax_error_detected() {
        let result = validate_toml_str("this is not valid toml [[[");
        assert!(result.has_errors());
        assert!(result.diagnostics.iter().any(|d| d.category == "syntax"));
    }

    #[test]
    fn unknown_field_with_suggestion() {
        let result = validate_toml_str("[securty]\nrequire_auth_for_delete = true\n");
        let d = find(&result, "securty").unwrap();
        assert_eq!(d.category, "unknown-field");
        assert!(d.message.contains("did you mean \"security\""));
    }

    #[test]
    fn unknown_nested_field() {
        let result = validate_toml_str("[prompt]\ntimeout = 30\n");
        let d = find(&result, "prompt.timeout").unwrap();
        assert_eq!(d.severity, Severity::Error);
    }

    #[test]
    fn type_error_detected() {
        let result = validate_toml_str("[prompt]\ntimeout_secs = \"soon\"\n");
        assert!(result.diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn empty_alias_is_error() {
        let result = validate_toml_str("[keys]\ndefault_alias = \"  \"\n");
        assert_eq!(
            find(&result, "keys.default_alias").unwrap().severity,
            Severity::Error
        );
    }

    #[test]
    fn zero_timeout_is_error_and_long_timeout_warns() {
        let zero = validate_toml_str("[prompt]\ntimeout_secs = 0\n");
        assert_eq!(
            find(&zero, "prompt.timeout_secs").unwrap().severity,
            Severity::Error
        );

        let long = validate_toml_str("[prompt]\ntimeout_secs = 3600\n");
        assert_eq!(
            find(&long, "prompt.timeout_secs").unwrap().severity,
            Severity::Warning
        );
    }

    #[test]
    fn empty_cancel_text_allowed_with_device_credentials() {
        let without = validate_toml_str("[prompt]\ncancel_button_text = \"\"\n");
        assert!(find(&without, "prompt.cancel_button_text").is_some());

        let with = validate_toml_str(
            "[prompt]\ncancel_button_text = \"\"\nallow_device_credentials = true\n",
        );
        assert!(find(&with, "prompt.cancel_button_text").is_none());
    }

    #[test]
    fn unknown_log_level_warns_with_hint() {
        let result = validate_toml_str("[logging]\nlevel = \"debgu\"\n");
        let d = find(&result, "logging.level").unwrap();
        assert_eq!(d.severity, Severity::Warning);
        assert!(d.message.contains("did you mean \"debug\""));
    }

    #[test]
    fn validate_reads_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("biometry.yaml");
        std::fs::write(&yaml, "keys:\n  default_alias: \"\"\n").unwrap();
        let result = validate(Some(&yaml));
        assert_eq!(result.config_path.as_deref(), Some(yaml.as_path()));
        assert!(find(&result, "keys.default_alias").is_some());

        let json = dir.path().join("biometry.json");
        std::fs::write(&json, r#"{"cipher":{"algoritm":"aes-256-gcm"}}"#).unwrap();
        let result = validate(Some(&json));
        assert!(find(&result, "cipher.algoritm").is_some());
    }

    #[test]
    fn missing_file_is_error() {
        let result = validate(Some(Path::new("/nonexistent/biometry.toml")));
        assert!(result.has_errors());
    }

    #[test]
    fn validate_config_checks_overridden_values() {
        let mut config = BiometryConfig::default();
        config.keys.default_alias.clear();
        assert!(validate_config(&config).has_errors());
    }
}
