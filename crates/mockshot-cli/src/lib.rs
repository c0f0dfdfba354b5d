//! Mockshot CLI Library
//!
//! Command-line front end for the Mockshot capture and export engine.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    AnimateArgs, AnimationFormatArg, CaptureArgs, Cli, ColorArg, Commands, CompositeArgs,
    CompositeOpts, ConfigArgs, EstimateArgs, FormatArg,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{artifact_summary, ProgressReporter};
