//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

use adcflow_config::ConfigError;
use adcflow_core::{CoreError, PostProcessError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Inputs ───────────────────────────────────────────────────────
    #[error("Cannot read {path}")]
    #[diagnostic(code(adcflow::read), help("Check that the file exists and is readable."))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write {path}")]
    #[diagnostic(code(adcflow::write))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(adcflow::input), help("Check the JSON file contents and try again."))]
    InvalidInput { message: String },

    #[error("The target device version is unknown")]
    #[diagnostic(
        code(adcflow::no_version),
        help(
            "Add \"tmosVersion\" to the device snapshot, or set defaults.tmos_version\n\
             in the config (env: ADCFLOW_DEFAULTS__TMOS_VERSION)."
        )
    )]
    UnknownDeviceVersion,

    // ── Post-processing ──────────────────────────────────────────────
    #[error("Declaration rejected: {summary}")]
    #[diagnostic(
        code(adcflow::rejected),
        help("{count} finding(s) must be fixed. Run with --output json to see each data path.")
    )]
    Rejected { count: usize, summary: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(adcflow::validation))]
    Validation { field: String, reason: String },

    #[error("Cannot compare '{left}' with '{right}'")]
    #[diagnostic(
        code(adcflow::malformed_version),
        help("Versions are dot-separated numbers, e.g. 14.1 or 15.1.0.")
    )]
    MalformedVersion { left: String, right: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(adcflow::config), help("Run: adcflow config path"))]
    Config(#[from] ConfigError),

    // ── Serialization ────────────────────────────────────────────────
    #[error("Failed to render {format} output: {reason}")]
    #[diagnostic(code(adcflow::render))]
    Render { format: &'static str, reason: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                exit_code::NOT_FOUND
            }
            Self::Rejected { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::MalformedVersion { .. }
            | Self::UnknownDeviceVersion
            | Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.display().to_string(),
            source,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingField { .. } => Self::UnknownDeviceVersion,
            CoreError::UnknownTag(tag) => Self::Validation {
                field: "tags".into(),
                reason: format!("unknown post-process tag '{tag}'"),
            },
            err @ (CoreError::Json { .. } | CoreError::InvalidPath { .. }) => Self::InvalidInput {
                message: err.to_string(),
            },
        }
    }
}

impl From<PostProcessError> for CliError {
    fn from(err: PostProcessError) -> Self {
        Self::Rejected {
            count: err.records().len(),
            summary: err.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use adcflow_core::{ErrorRecord, PostProcessTag};

    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let missing = CliError::read(
            Path::new("decl.json"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let denied = CliError::read(
            Path::new("decl.json"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(denied.exit_code(), exit_code::GENERAL);

        let rejected = CliError::from(PostProcessError::new(vec![ErrorRecord::new(
            PostProcessTag::Node,
            "/T/A/p/members/0",
            "conflict",
        )]));
        assert_eq!(rejected.exit_code(), exit_code::CONFLICT);
        assert_eq!(rejected.to_string(), "Declaration rejected: conflict");
    }

    #[test]
    fn core_errors_map_to_cli_errors() {
        let err = CliError::from(CoreError::MissingField {
            field: "tmosVersion".into(),
        });
        assert!(matches!(err, CliError::UnknownDeviceVersion));
        assert_eq!(err.exit_code(), exit_code::USAGE);

        let err = CliError::from(CoreError::UnknownTag("pointer".into()));
        assert!(err.to_string().contains("pointer"));
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
