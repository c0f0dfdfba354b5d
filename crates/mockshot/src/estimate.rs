//! Closed-form size and duration estimates for the export dialog.
//!
//! These are display hints, not predictions: real encoder output depends on
//! image content. Only monotonicity is guaranteed.

use crate::settings::{ExportFormat, ExportSettings};
use serde::{Deserialize, Serialize};

/// Raw-pixel bytes per estimated output byte
pub const DEFAULT_BYTES_DIVISOR: f64 = 10.0;

/// `frames * width * height * (quality / 100) / divisor`, in bytes
#[must_use]
pub fn estimate_file_size(width: u32, height: u32, quality: u8, frame_count: usize) -> u64 {
    estimate_file_size_with(width, height, quality, frame_count, DEFAULT_BYTES_DIVISOR)
}

/// [`estimate_file_size`] with a custom divisor
#[must_use]
pub fn estimate_file_size_with(
    width: u32,
    height: u32,
    quality: u8,
    frame_count: usize,
    divisor: f64,
) -> u64 {
    let divisor = if divisor.is_finite() && divisor > 0.0 {
        divisor
    } else {
        DEFAULT_BYTES_DIVISOR
    };
    let pixels = f64::from(width) * f64::from(height) * frame_count as f64;
    let quality = f64::from(quality.min(100)) / 100.0;
    (pixels * quality / divisor).round() as u64
}

/// GIF duration: every frame shows for `delay_ms`
#[must_use]
pub fn estimate_gif_duration_ms(frame_count: usize, delay_ms: u32) -> u64 {
    (frame_count as u64).saturating_mul(u64::from(delay_ms))
}

/// Video duration in seconds at `fps`
#[must_use]
pub fn estimate_video_duration_secs(frame_count: usize, fps: u8) -> f64 {
    frame_count as f64 / f64::from(fps.max(1))
}

/// Video size in bytes from bitrate and duration
#[must_use]
pub fn estimate_video_size(bitrate_kbps: u32, duration_secs: f64) -> u64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return 0;
    }
    (f64::from(bitrate_kbps) * 1000.0 / 8.0 * duration_secs).round() as u64
}

/// Everything the export dialog shows before the user commits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportEstimate {
    /// Estimated file size in bytes
    pub bytes: u64,
    /// Playback duration in milliseconds (0 for stills)
    pub duration_ms: u64,
    /// Frames in the output
    pub frame_count: usize,
}

impl ExportEstimate {
    /// Estimate an export of `frame_count` frames of `width x height`
    #[must_use]
    pub fn for_settings(
        settings: &ExportSettings,
        width: u32,
        height: u32,
        frame_count: usize,
        divisor: f64,
    ) -> Self {
        let (width, height) = settings.target_size(width, height);
        match settings.format {
            ExportFormat::Mp4 => {
                let secs = estimate_video_duration_secs(frame_count, settings.frame_rate);
                Self {
                    bytes: estimate_video_size(settings.bitrate_kbps, secs),
                    duration_ms: (secs * 1000.0).round() as u64,
                    frame_count,
                }
            }
            ExportFormat::Gif => Self {
                bytes: estimate_file_size_with(width, height, settings.quality, frame_count, divisor),
                duration_ms: estimate_gif_duration_ms(frame_count, settings.frame_delay_ms),
                frame_count,
            },
            ExportFormat::Png | ExportFormat::Jpeg | ExportFormat::Webp => Self {
                bytes: estimate_file_size_with(width, height, settings.quality, frame_count.min(1), divisor),
                duration_ms: 0,
                frame_count: frame_count.min(1),
            },
        }
    }
}

/// Human-readable byte count (`1.5 MB`)
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
