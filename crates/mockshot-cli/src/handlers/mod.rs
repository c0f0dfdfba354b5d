//! Command handlers - extracted from main.rs for testability

pub mod animate;
pub mod capture;
pub mod composite;
pub mod config;
pub mod estimate;

pub use animate::execute_animate;
pub use capture::execute_capture;
pub use composite::execute_composite;
pub use config::execute_config;
pub use estimate::execute_estimate;

use crate::error::{CliError, CliResult};
use mockshot::{ExportArtifact, ExportFormat, RasterBitmap};
use std::path::{Path, PathBuf};

/// Output format: explicit flag, then the output extension, then `fallback`
#[must_use]
pub fn resolve_format(
    explicit: Option<ExportFormat>,
    output: Option<&Path>,
    fallback: ExportFormat,
) -> ExportFormat {
    explicit
        .or_else(|| {
            output
                .and_then(Path::extension)
                .and_then(|ext| ext.to_str())
                .and_then(ExportFormat::from_extension)
        })
        .unwrap_or(fallback)
}

/// Filename stem for suggested names, taken from an input path
#[must_use]
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("mockup")
        .to_string()
}

/// Write `artifact` to `output`.
///
/// No output or an existing directory gets the suggested filename.
pub fn write_artifact(artifact: &ExportArtifact, output: Option<&Path>) -> CliResult<PathBuf> {
    match output {
        Some(path) if !path.is_dir() => {
            artifact.save_as(path)?;
            Ok(path.to_path_buf())
        }
        Some(dir) => Ok(artifact.save(dir)?),
        None => Ok(artifact.save(Path::new("."))?),
    }
}

/// Read and decode an image file
pub fn load_image(path: &Path) -> CliResult<RasterBitmap> {
    let bytes = std::fs::read(path)?;
    RasterBitmap::decode(&bytes)
        .map_err(|e| CliError::invalid_argument(format!("{}: {e}", path.display())))
}
