//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, Write};

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use adcflow_core::{ErrorRecord, RunReport};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table and plain rendering use the supplied closures, since single-item
/// views don't use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Findings ─────────────────────────────────────────────────────────

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Severity")]
    severity: &'static str,
    #[tabled(rename = "Tenant")]
    tenant: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl FindingRow {
    fn new(severity: &'static str, record: &ErrorRecord) -> Self {
        Self {
            severity,
            tenant: record.tenant.clone().unwrap_or_else(|| "-".into()),
            path: record.data_path.clone(),
            message: record.message.clone(),
        }
    }
}

fn findings(report: &RunReport) -> impl Iterator<Item = (&'static str, &ErrorRecord)> {
    report
        .errors
        .iter()
        .map(|r| ("error", r))
        .chain(report.warnings.iter().map(|r| ("warning", r)))
}

/// Errors first, then warnings.
pub fn render_report(format: &OutputFormat, report: &RunReport) -> Result<String, CliError> {
    render_single(
        format,
        report,
        |report| {
            let rows: Vec<FindingRow> = findings(report)
                .map(|(severity, record)| FindingRow::new(severity, record))
                .collect();
            if rows.is_empty() {
                "No findings.".into()
            } else {
                render_table(&rows)
            }
        },
        |report| {
            findings(report)
                .map(|(severity, record)| format!("{severity}\t{}\t{}", record.data_path, record.message))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty-printed JSON.
pub(crate) fn render_json_pretty<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(data).map_err(|e| render_err("json", &e))
}

/// Compact single-line JSON.
pub(crate) fn render_json_compact<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string(data).map_err(|e| render_err("json", &e))
}

/// YAML output.
pub(crate) fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| render_err("yaml", &e))
}

fn render_err(format: &'static str, err: &impl std::fmt::Display) -> CliError {
    CliError::Render {
        format,
        reason: err.to_string(),
    }
}
