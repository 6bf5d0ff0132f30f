//! Configuration validation.
//!
//! Two passes: a structural pass over the raw file (syntax, unknown or
//! misspelled keys) and a semantic pass over the parsed [`BotConfig`]
//! (required credentials, usable URLs).

use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;

use crate::{
    env_subst::substitute_env,
    loader::{apply_env_overrides, find_config_file, parse_config, parse_config_value},
    schema::BotConfig,
};

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
    /// Category: "syntax", "unknown-field", "type-error", "missing", "url",
    /// "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "webhooks.public_url"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration.
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
}

/// Known keys per section, used for unknown-field detection.
const KNOWN_SECTIONS: &[(&str, &[&str])] = &[
    ("server", &["bind", "port"]),
    ("platform", &["api_url", "accounts_url", "request_timeout_secs"]),
    ("credentials", &[
        "client_id",
        "client_secret",
        "redirect_uri",
        "author_id",
        "access_token",
    ]),
    ("webhooks", &["public_url", "secret", "require_secret"]),
    ("bot", &["name", "install_timeout_secs", "shutdown_timeout_secs"]),
];

/// Validate a config file. With no explicit path the standard locations are
/// searched.
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        let mut config = BotConfig::default();
        apply_env_overrides(&mut config);
        let mut diagnostics = vec![Diagnostic::new(
            Severity::Info,
            "file-ref",
            "",
            "no config file found; using defaults",
        )];
        diagnostics.extend(check_config(&config));
        return ValidationResult {
            diagnostics,
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let mut result = validate_str(&substitute_env(&content), actual_path);
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate raw config text; the format is taken from `path`'s extension.
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value = match parse_config_value(raw, path) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &mut diagnostics);

    match parse_config(raw, path) {
        Ok(mut config) => {
            apply_env_overrides(&mut config);
            diagnostics.extend(check_config(&config));
        },
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Semantic checks on an already-parsed config.
pub fn validate_config(config: &BotConfig) -> ValidationResult {
    ValidationResult {
        diagnostics: check_config(config),
        config_path: None,
    }
}

fn check_unknown_fields(value: &serde_json::Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(root) = value.as_object() else {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            "config root must be a table",
        ));
        return;
    };

    for (section, body) in root {
        let Some((_, keys)) = KNOWN_SECTIONS.iter().find(|(name, _)| name == section) else {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "unknown-field",
                section.clone(),
                format!("unknown section '{section}'"),
            ));
            continue;
        };
        let Some(table) = body.as_object() else {
            continue;
        };
        for key in table.keys() {
            if !keys.contains(&key.as_str()) {
                diagnostics.push(Diagnostic::new(
                    Severity::Warning,
                    "unknown-field",
                    format!("{section}.{key}"),
                    format!("unknown field '{key}' in [{section}]"),
                ));
            }
        }
    }
}

fn check_config(config: &BotConfig) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let creds = &config.credentials;
    let has_token = creds
        .access_token
        .as_ref()
        .is_some_and(|t| !t.expose_secret().is_empty());

    let mut require = |path: &str, value: &str| {
        if value.trim().is_empty() {
            out.push(Diagnostic::new(
                Severity::Error,
                "missing",
                path,
                format!("{path} is required"),
            ));
        }
    };
    require("credentials.client_id", &creds.client_id);
    require("credentials.author_id", &creds.author_id);
    require("webhooks.public_url", &config.webhooks.public_url);
    require("webhooks.secret", config.webhooks.secret.expose_secret());

    if !has_token && creds.client_secret.expose_secret().is_empty() {
        out.push(Diagnostic::new(
            Severity::Error,
            "missing",
            "credentials.client_secret",
            "credentials.client_secret is required unless credentials.access_token is set",
        ));
    }
    if !has_token && creds.redirect_uri.trim().is_empty() {
        out.push(Diagnostic::new(
            Severity::Warning,
            "missing",
            "credentials.redirect_uri",
            "no redirect_uri; the OAuth code exchange will likely be rejected",
        ));
    }

    check_http_url(&mut out, "webhooks.public_url", &config.webhooks.public_url);
    check_http_url(&mut out, "platform.api_url", &config.platform.api_url);
    check_http_url(&mut out, "platform.accounts_url", &config.platform.accounts_url);

    if config.platform.request_timeout_secs == 0 {
        out.push(Diagnostic::new(
            Severity::Warning,
            "type-error",
            "platform.request_timeout_secs",
            "a zero timeout fails every platform call",
        ));
    }
    if config.bot.install_timeout_secs == 0 && !has_token {
        out.push(Diagnostic::new(
            Severity::Warning,
            "type-error",
            "bot.install_timeout_secs",
            "installs will time out before the OAuth callback arrives",
        ));
    }

    out
}

fn check_http_url(out: &mut Vec<Diagnostic>, path: &str, value: &str) {
    if value.trim().is_empty() {
        return;
    }
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {},
        Ok(url) => out.push(Diagnostic::new(
            Severity::Error,
            "url",
            path,
            format!("{path} must be http or https, got '{}'", url.scheme()),
        )),
        Err(e) => out.push(Diagnostic::new(
            Severity::Error,
            "url",
            path,
            format!("{path} is not a valid URL: {e}"),
        )),
    }
}
