//! Configuration for the adcflow CLI.
//!
//! Serialized defaults, then an optional TOML file, then `ADCFLOW_`
//! prefixed environment variables (nested keys split on `__`, e.g.
//! `ADCFLOW_NODE__RECONCILE=false`). The result is validated before use
//! and translated into the processors `adcflow_core` runs.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use adcflow_core::{MinVersionProcessor, NodeProcessor, PostProcessor, VersionGate, VersionPolicy};

/// Environment override for `defaults.tmos_version`.
pub const TMOS_VERSION_ENV: &str = "ADCFLOW_DEFAULTS__TMOS_VERSION";

/// Output format names accepted in `defaults.output`.
pub const OUTPUT_FORMATS: [&str; 5] = ["table", "json", "json-compact", "yaml", "plain"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Properties that need a minimum device version.
    #[serde(default)]
    pub version_gates: Vec<VersionGate>,

    #[serde(default)]
    pub min_version: MinVersionSettings,

    #[serde(default)]
    pub node: NodeSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Used when a device snapshot does not say what it runs.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "version_text"
    )]
    pub tmos_version: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            tmos_version: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}

/// Accepts `tmos_version = 15` as well as `"15.1.0"`.
fn version_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(u64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(de)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Integer(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    }))
}

/// Mirrors `VersionPolicy` with kebab-case names for TOML and env.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicySetting {
    #[default]
    FailOpen,
    FailClosed,
}

impl From<PolicySetting> for VersionPolicy {
    fn from(setting: PolicySetting) -> Self {
        match setting {
            PolicySetting::FailOpen => Self::FailOpen,
            PolicySetting::FailClosed => Self::FailClosed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MinVersionSettings {
    #[serde(default)]
    pub policy: PolicySetting,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NodeSettings {
    /// Match pool members against nodes already on the device.
    #[serde(default = "default_reconcile")]
    pub reconcile: bool,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            reconcile: default_reconcile(),
        }
    }
}

fn default_reconcile() -> bool {
    true
}

impl Config {
    /// Rejects settings the pipeline cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !OUTPUT_FORMATS.contains(&self.defaults.output.as_str()) {
            return Err(ConfigError::validation(
                "defaults.output",
                format!(
                    "expected one of {}, got '{}'",
                    OUTPUT_FORMATS.join(", "),
                    self.defaults.output
                ),
            ));
        }

        for (idx, gate) in self.version_gates.iter().enumerate() {
            let field = format!("version_gates[{idx}]");
            if gate.class.trim().is_empty() {
                return Err(ConfigError::validation(field, "class must not be empty"));
            }
            if gate.property.trim().is_empty() {
                return Err(ConfigError::validation(field, "property must not be empty"));
            }
            if !gate.version.chars().any(|c| c.is_ascii_digit()) {
                return Err(ConfigError::validation(
                    field,
                    format!("'{}' is not a version", gate.version),
                ));
            }
        }
        Ok(())
    }

    /// Processors configured from these settings.
    pub fn post_processor(&self) -> PostProcessor {
        PostProcessor::new(
            MinVersionProcessor::new(self.min_version.policy.into()),
            NodeProcessor::new(self.node.reconcile),
        )
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "adcflow", "adcflow").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("adcflow");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn figment(path: &Path) -> Figment {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ADCFLOW_").split("__"));

    // Env parses "14.10" as the float 14.1; versions keep their text.
    match Env::var(TMOS_VERSION_ENV) {
        Some(raw) => figment.merge(Serialized::default("defaults.tmos_version", raw)),
        None => figment,
    }
}

/// Load and validate the config from `path` (or the default location)
/// plus the environment. A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning the defaults if loading fails.
pub fn load_config_or_default(path: Option<&Path>) -> Config {
    load_config(path).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.defaults.output, "table");
        assert!(config.node.reconcile);
        assert_eq!(config.min_version.policy, PolicySetting::FailOpen);
        config.validate().unwrap();
    }

    // Jail serializes tests that touch the process environment.

    #[test]
    fn toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "adcflow.toml",
                r#"
[defaults]
output = "json"
tmos_version = "14.1.0"

[node]
reconcile = false

[min_version]
policy = "fail-closed"

[[version_gates]]
class = "Pool"
property = "slowRampTime"
version = "14.0"
strict = true
"#,
            )?;

            let config = load_config(Some(Path::new("adcflow.toml"))).unwrap();
            assert_eq!(config.defaults.output, "json");
            assert_eq!(config.defaults.tmos_version.as_deref(), Some("14.1.0"));
            assert!(!config.node.reconcile);
            assert_eq!(config.min_version.policy, PolicySetting::FailClosed);
            assert_eq!(
                config.version_gates,
                vec![VersionGate::new("Pool", "slowRampTime", "14.0").strict()]
            );
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("adcflow.toml", "[defaults]\noutput = \"yaml\"\n")?;
            jail.set_env("ADCFLOW_DEFAULTS__OUTPUT", "plain");
            jail.set_env("ADCFLOW_NODE__RECONCILE", "false");

            let config = load_config(Some(Path::new("adcflow.toml"))).unwrap();
            assert_eq!(config.defaults.output, "plain");
            assert!(!config.node.reconcile);
            Ok(())
        });
    }

    #[test]
    fn environment_version_keeps_its_text() {
        Jail::expect_with(|jail| {
            jail.create_file("adcflow.toml", "[defaults]\ntmos_version = \"12.1.0\"\n")?;

            jail.set_env(TMOS_VERSION_ENV, "14.1");
            let config = load_config(Some(Path::new("adcflow.toml"))).unwrap();
            assert_eq!(config.defaults.tmos_version.as_deref(), Some("14.1"));

            jail.set_env(TMOS_VERSION_ENV, "14.10");
            let config = load_config(Some(Path::new("adcflow.toml"))).unwrap();
            assert_eq!(config.defaults.tmos_version.as_deref(), Some("14.10"));

            jail.set_env(TMOS_VERSION_ENV, "13");
            let config = load_config(Some(Path::new("adcflow.toml"))).unwrap();
            assert_eq!(config.defaults.tmos_version.as_deref(), Some("13"));
            Ok(())
        });
    }

    #[test]
    fn numeric_file_version_is_accepted() {
        Jail::expect_with(|jail| {
            jail.create_file("adcflow.toml", "[defaults]\ntmos_version = 15\n")?;
            let config = load_config(Some(Path::new("adcflow.toml"))).unwrap();
            assert_eq!(config.defaults.tmos_version.as_deref(), Some("15"));
            Ok(())
        });
    }

    #[test]
    fn invalid_file_values_fail_validation() {
        Jail::expect_with(|jail| {
            jail.create_file("adcflow.toml", "[defaults]\noutput = \"xml\"\n")?;
            let err = load_config(Some(Path::new("adcflow.toml"))).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { .. }));
            assert_eq!(
                load_config_or_default(Some(Path::new("adcflow.toml"))),
                Config::default()
            );
            Ok(())
        });
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_| {
            let dir = tempfile::tempdir().unwrap();
            let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut config = Config::default();
        config.version_gates.push(VersionGate::new("Pool", "x", "latest"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("version_gates[0]"), "{err}");

        let mut config = Config::default();
        config.version_gates.push(VersionGate::new("", "x", "14.0"));
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.defaults.output = "xml".into();
        assert!(config.validate().unwrap_err().to_string().contains("defaults.output"));
    }

    #[test]
    fn renders_as_toml() {
        let mut config = Config::default();
        config.version_gates.push(VersionGate::new("Pool", "slowRampTime", "14.0"));
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[[version_gates]]"));
        assert!(rendered.contains("reconcile = true"));
    }
}
