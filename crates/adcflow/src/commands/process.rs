//! `adcflow process`: load inputs, run the pipeline, report findings.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use adcflow_config::Config;
use adcflow_core::{CoreError, DeviceSnapshot, TagCollector, TaggedItems};

use crate::cli::{GlobalOpts, ProcessArgs};
use crate::error::CliError;
use crate::output;

/// Raw file contents for one run.
#[derive(Debug)]
struct Inputs {
    declaration: String,
    device: String,
    original: Option<String>,
    tags: Option<String>,
}

async fn read(path: &Path) -> Result<String, CliError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::read(path, e))
}

async fn read_optional(path: Option<&Path>) -> Result<Option<String>, CliError> {
    match path {
        Some(path) => read(path).await.map(Some),
        None => Ok(None),
    }
}

async fn load_inputs(args: &ProcessArgs) -> Result<Inputs, CliError> {
    let (declaration, device, original, tags) = tokio::try_join!(
        read(&args.declaration),
        read(&args.device),
        read_optional(args.original.as_deref()),
        read_optional(args.tags.as_deref()),
    )?;
    Ok(Inputs {
        declaration,
        device,
        original,
        tags,
    })
}

fn parse_document(raw: &str, path: &Path) -> Result<Value, CoreError> {
    serde_json::from_str(raw).map_err(|source| CoreError::Json {
        what: path.display().to_string(),
        source,
    })
}

pub async fn handle(args: ProcessArgs, global: &GlobalOpts, config: &Config) -> Result<(), CliError> {
    let format = global.output_format(config)?;
    let inputs = load_inputs(&args).await?;

    let mut declaration = parse_document(&inputs.declaration, &args.declaration)?;
    let original = match (&inputs.original, &args.original) {
        (Some(raw), Some(path)) => parse_document(raw, path)?,
        _ => declaration.clone(),
    };
    let mut ctx = DeviceSnapshot::from_json(&inputs.device)?
        .into_context(config.defaults.tmos_version.as_deref())?;
    let tagged = match &inputs.tags {
        Some(raw) => TaggedItems::from_json(raw)?,
        None => TagCollector::new(&config.version_gates).collect(&declaration),
    };
    info!(
        tmos_version = %ctx.target.tmos_version,
        nodes = ctx.nodes.len(),
        items = tagged.len(),
        "processing declaration"
    );

    let report = config
        .post_processor()
        .run(&mut ctx, &mut declaration, &tagged, Some(&original));

    let rendered = output::render_report(&format, &report)?;
    output::print_output(&rendered, global.quiet);

    let warnings = report.into_result()?;
    debug!(warnings = warnings.len(), "declaration accepted");

    if let Some(path) = &args.write {
        let body = output::render_json_pretty(&declaration)?;
        tokio::fs::write(path, body + "\n")
            .await
            .map_err(|e| CliError::write(path, e))?;
        info!(path = %path.display(), "wrote processed declaration");
    }
    Ok(())
}
