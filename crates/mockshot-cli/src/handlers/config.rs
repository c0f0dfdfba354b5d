//! Config command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::ConfigArgs;
use mockshot::MockshotConfig;

/// Where the effective configuration comes from
#[must_use]
pub fn config_source(config: &CliConfig) -> String {
    config
        .config_path
        .as_ref()
        .map_or_else(|| "<defaults>".to_string(), |p| p.display().to_string())
}

/// Render the effective engine configuration
pub fn render_config(engine: &MockshotConfig, json: bool) -> CliResult<String> {
    if json {
        serde_json::to_string_pretty(engine).map_err(|e| CliError::config(e.to_string()))
    } else {
        engine.to_yaml().map_err(|e| CliError::config(e.to_string()))
    }
}

/// Execute the config command
pub fn execute_config(config: &CliConfig, engine: &MockshotConfig, args: &ConfigArgs) -> CliResult<()> {
    if args.path {
        println!("{}", config_source(config));
        return Ok(());
    }
    if config.verbosity.is_verbose() {
        eprintln!("# source: {}", config_source(config));
    }
    print!("{}", render_config(engine, args.json)?);
    if args.json {
        println!();
    }
    Ok(())
}
