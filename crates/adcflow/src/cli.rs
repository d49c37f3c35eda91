//! Clap derive structures for the `adcflow` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use adcflow_config::Config;

use crate::error::CliError;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// adcflow -- post-process validated ADC declarations against a device
#[derive(Debug, Parser)]
#[command(
    name = "adcflow",
    version,
    about = "Post-process ADC declarations against live device state",
    long_about = "Applies post-validation tags to an ADC declaration.\n\n\
        Properties newer than the target device are stripped, and pool\n\
        members are reconciled with nodes that already exist on it.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "ADCFLOW_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to `defaults.output` from the config)
    #[arg(long, short = 'o', env = "ADCFLOW_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

impl GlobalOpts {
    /// `--output` if given, else the configured default.
    pub fn output_format(&self, config: &Config) -> Result<OutputFormat, CliError> {
        if let Some(format) = &self.output {
            return Ok(format.clone());
        }
        OutputFormat::from_str(&config.defaults.output, true).map_err(|reason| {
            CliError::Validation {
                field: "defaults.output".into(),
                reason,
            }
        })
    }
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one line per finding (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every post-process tag over a declaration
    #[command(alias = "p")]
    Process(ProcessArgs),

    /// Compare two dotted version strings
    #[command(alias = "vc")]
    VersionCheck(VersionCheckArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Process ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Validated declaration (JSON)
    #[arg(long, short = 'd')]
    pub declaration: PathBuf,

    /// Device snapshot: `{ "tmosVersion": ..., "nodes": [...] }`
    #[arg(long)]
    pub device: PathBuf,

    /// Declaration as submitted, before defaults were filled in
    /// (defaults to --declaration)
    #[arg(long)]
    pub original: Option<PathBuf>,

    /// Pre-collected tagged items keyed by tag keyword, instead of
    /// collecting them from the declaration
    #[arg(long)]
    pub tags: Option<PathBuf>,

    /// Write the processed declaration here on success
    #[arg(long, short = 'w')]
    pub write: Option<PathBuf>,
}

// ── Version check ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VersionCheckArgs {
    /// Version on the left of `<`
    pub left: String,

    /// Version on the right of `<`
    pub right: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
