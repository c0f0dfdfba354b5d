//! Mockshot CLI: render, composite and export mockups
//!
//! ## Usage
//!
//! ```bash
//! mockshot capture post.yaml -o post.png --padding 32 --shadow
//! mockshot composite shot.png -o framed.png --radius 16
//! mockshot animate f1.png f2.png f3.png -o chat.gif --delay 120
//! mockshot estimate --width 800 --height 600 -f gif --frames 20
//! ```

use clap::Parser;
use mockshot_cli::{
    handlers::{execute_animate, execute_capture, execute_composite, execute_config, execute_estimate},
    Cli, CliConfig, CliResult, ColorChoice, Commands, ProgressReporter, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    let color = config.color.should_color();
    console::set_colors_enabled_stderr(color);
    let mut reporter = ProgressReporter::new(color, config.verbosity.is_quiet());
    let engine = config.engine_config()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match cli.command {
            Commands::Capture(args) => execute_capture(&engine, &args, &mut reporter).await.map(drop),
            Commands::Composite(args) => {
                execute_composite(&engine, &args, &mut reporter).await.map(drop)
            }
            Commands::Animate(args) => execute_animate(&engine, &args, &mut reporter).await.map(drop),
            Commands::Estimate(args) => execute_estimate(&engine, &args),
            Commands::Config(args) => execute_config(&config, &engine, &args),
        }
    })
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_config_path(cli.config.clone())
}

/// `RUST_LOG` wins; otherwise the level follows `-v`/`-q`
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity.is_debug())
        .try_init();
}
