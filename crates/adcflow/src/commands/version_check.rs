//! `adcflow version-check`: the comparator the min-version gate uses.

use serde::Serialize;

use adcflow_config::Config;
use adcflow_core::version;

use crate::cli::{GlobalOpts, VersionCheckArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Comparison<'a> {
    left: &'a str,
    right: &'a str,
    less: bool,
}

impl Comparison<'_> {
    fn verdict(&self) -> String {
        let verdict = if self.less { "less" } else { "not-less" };
        verdict.to_owned()
    }
}

pub fn handle(args: &VersionCheckArgs, global: &GlobalOpts, config: &Config) -> Result<(), CliError> {
    let format = global.output_format(config)?;
    let less = version::is_less(&args.left, &args.right).ok_or_else(|| {
        CliError::MalformedVersion {
            left: args.left.clone(),
            right: args.right.clone(),
        }
    })?;
    let comparison = Comparison {
        left: &args.left,
        right: &args.right,
        less,
    };
    let rendered = output::render_single(&format, &comparison, Comparison::verdict, Comparison::verdict)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
