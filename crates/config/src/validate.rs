//! Configuration and campaign-input validation.
//!
//! Checks that the campaign input files exist and are usable before a run
//! starts; a failed validation means no partial run is attempted.

use std::path::Path;

use crate::{loader::expand_tilde, schema::VolleyConfig};

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
    /// Category: "file-ref", "value", "endpoint"
    pub category: &'static str,
    /// Dotted path, e.g. "campaign.recipients_file"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
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

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a configuration and the campaign inputs it points at.
#[must_use]
pub fn validate(config: &VolleyConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_required_file(
        &mut result,
        "campaign.recipients_file",
        &config.campaign.recipients_file,
    );
    check_required_file(
        &mut result,
        "campaign.messages_file",
        &config.campaign.messages_file,
    );
    check_required_file(
        &mut result,
        "campaign.media_manifest",
        &config.campaign.media_manifest,
    );

    let country = expand_tilde(&config.campaign.country_file);
    if !country.exists() {
        result.push(
            Severity::Info,
            "file-ref",
            "campaign.country_file",
            "not found; no default country code will be applied",
        );
    }

    let media_dir = expand_tilde(&config.campaign.media_dir);
    if !media_dir.is_dir() {
        result.push(
            Severity::Warning,
            "file-ref",
            "campaign.media_dir",
            format!(
                "{} is not a directory; every media file will be skipped",
                media_dir.display()
            ),
        );
    }

    if config.dispatch.attempt_cap == 0 {
        result.push(
            Severity::Error,
            "value",
            "dispatch.attempt_cap",
            "must be at least 1",
        );
    }

    if config.pacing.between_recipients_secs == 0 {
        result.push(
            Severity::Warning,
            "value",
            "pacing.between_recipients_secs",
            "no pacing between recipients; the remote network may rate-limit the account",
        );
    }

    if !config.session.bridge_url.starts_with("ws://")
        && !config.session.bridge_url.starts_with("wss://")
    {
        result.push(
            Severity::Error,
            "endpoint",
            "session.bridge_url",
            "must be a ws:// or wss:// URL",
        );
    }

    result
}

fn check_required_file(result: &mut ValidationResult, path_key: &'static str, path: &Path) {
    let expanded = expand_tilde(path);
    if !expanded.is_file() {
        result.push(
            Severity::Error,
            "file-ref",
            path_key,
            format!("required file {} not found", expanded.display()),
        );
        return;
    }
    match std::fs::metadata(&expanded) {
        Ok(meta) if meta.len() == 0 => {
            result.push(
                Severity::Error,
                "file-ref",
                path_key,
                format!("{} is empty", expanded.display()),
            );
        },
        Ok(_) => {},
        Err(e) => {
            result.push(
                Severity::Error,
                "file-ref",
                path_key,
                format!("cannot read {}: {e}", expanded.display()),
            );
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::VolleyConfig;

    fn config_in(dir: &Path) -> VolleyConfig {
        let mut cfg = VolleyConfig::default();
        cfg.campaign.recipients_file = dir.join("numbers.txt");
        cfg.campaign.messages_file = dir.join("messages.txt");
        cfg.campaign.media_manifest = dir.join("media.txt");
        cfg.campaign.country_file = dir.join("country.txt");
        cfg.campaign.media_dir = dir.join("media");
        cfg
    }

    fn write_inputs(dir: &Path) {
        std::fs::write(dir.join("numbers.txt"), "+15551234567\n").unwrap();
        std::fs::write(dir.join("messages.txt"), "1. hi\n").unwrap();
        std::fs::write(dir.join("media.txt"), "promo.jpg\n").unwrap();
        std::fs::create_dir(dir.join("media")).unwrap();
    }

    #[test]
    fn complete_inputs_have_no_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        let result = validate(&config_in(dir.path()));
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        // Missing country file is informational only.
        assert_eq!(result.count(Severity::Info), 1);
    }

    #[test]
    fn missing_recipients_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        std::fs::remove_file(dir.path().join("numbers.txt")).unwrap();
        let result = validate(&config_in(dir.path()));
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "campaign.recipients_file" && d.severity == Severity::Error)
        );
    }

    #[test]
    fn empty_messages_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        std::fs::write(dir.path().join("messages.txt"), "").unwrap();
        let result = validate(&config_in(dir.path()));
        assert!(result.has_errors());
    }

    #[test]
    fn zero_attempt_cap_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        let mut cfg = config_in(dir.path());
        cfg.dispatch.attempt_cap = 0;
        assert!(validate(&cfg).has_errors());
    }

    #[test]
    fn non_ws_bridge_url_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        let mut cfg = config_in(dir.path());
        cfg.session.bridge_url = "http://127.0.0.1:3180".into();
        assert!(validate(&cfg).has_errors());
    }
}
