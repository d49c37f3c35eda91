//! Config subcommand handlers.

use adcflow_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config(global.config.as_deref())?;
            let format = global.output_format(&cfg)?;
            let toml = cfg.to_toml()?;
            let rendered =
                output::render_single(&format, &cfg, |_: &Config| toml.clone(), |_: &Config| toml.clone())?;
            output::print_output(&rendered, global.quiet);
            Ok(())
        }
        ConfigCommand::Path => {
            let path = global.config.clone().unwrap_or_else(config::config_path);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}
