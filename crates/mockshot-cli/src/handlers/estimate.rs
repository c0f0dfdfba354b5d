//! Estimate command handler

use crate::error::{CliError, CliResult};
use crate::EstimateArgs;
use mockshot::{format_bytes, ExportEstimate, ExportSettings, MockshotConfig};

/// Compute the estimate for the given flags
#[must_use]
pub fn estimate(engine: &MockshotConfig, args: &EstimateArgs) -> ExportEstimate {
    let mut settings = ExportSettings {
        format: args.format.into(),
        ..engine.export.clone()
    };
    if let Some(quality) = args.quality {
        settings = settings.with_quality(quality);
    }
    if let Some(fps) = args.fps {
        settings = settings.with_frame_rate(fps);
    }
    if let Some(delay) = args.delay {
        settings = settings.with_frame_delay(delay);
    }
    if let Some(bitrate) = args.bitrate {
        settings = settings.with_bitrate(bitrate);
    }
    ExportEstimate::for_settings(
        &settings,
        args.width,
        args.height,
        args.frames,
        engine.size_divisor,
    )
}

/// Render an estimate as text
#[must_use]
pub fn render_estimate(estimate: &ExportEstimate) -> String {
    let mut out = format!("Estimated size: {}", format_bytes(estimate.bytes));
    if estimate.duration_ms > 0 {
        out.push_str(&format!(
            "\nDuration: {:.1}s ({} frames)",
            estimate.duration_ms as f64 / 1000.0,
            estimate.frame_count
        ));
    }
    out
}

/// Execute the estimate command
pub fn execute_estimate(engine: &MockshotConfig, args: &EstimateArgs) -> CliResult<()> {
    let estimate = estimate(engine, args);
    if args.json {
        let json = serde_json::to_string_pretty(&estimate)
            .map_err(|e| CliError::invalid_argument(e.to_string()))?;
        println!("{json}");
    } else {
        println!("{}", render_estimate(&estimate));
    }
    Ok(())
}
