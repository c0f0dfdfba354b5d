//! Plain value settings passed explicitly between pipeline stages.
//!
//! All of them are `Serialize`/`Deserialize` so the UI can keep them as
//! presets; none of them is shared or mutated behind the caller's back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Lossless PNG
    #[default]
    Png,
    /// Lossy JPEG (no alpha)
    Jpeg,
    /// Lossless WebP
    Webp,
    /// Animated GIF
    Gif,
    /// MP4 video (Motion JPEG track)
    Mp4,
}

impl ExportFormat {
    /// MIME type of the encoded artifact
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
            Self::Mp4 => "video/mp4",
        }
    }

    /// File extension without the dot
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
        }
    }

    /// GIF and video hold frame sequences
    #[must_use]
    pub const fn is_animated(self) -> bool {
        matches!(self, Self::Gif | Self::Mp4)
    }

    /// Whether the quality setting changes the output
    #[must_use]
    pub const fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::Mp4)
    }

    /// Guess the format from a file extension (case-insensitive)
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            "mp4" => Some(Self::Mp4),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Webp => "WebP",
            Self::Gif => "GIF",
            Self::Mp4 => "MP4",
        };
        f.write_str(name)
    }
}

/// Padding, corner clip and drop shadow applied after capture.
///
/// Fields are signed so UI sliders can pass anything; negative values act
/// as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeSettings {
    /// Transparent border around the content, in pixels
    pub padding: i32,
    /// Corner radius of the content clip, in pixels
    pub border_radius: i32,
    /// Soft drop shadow below the content
    pub shadow: bool,
}

impl CompositeSettings {
    /// Create composite settings
    #[must_use]
    pub const fn new(padding: i32, border_radius: i32, shadow: bool) -> Self {
        Self {
            padding,
            border_radius,
            shadow,
        }
    }

    /// Set padding
    #[must_use]
    pub const fn with_padding(mut self, padding: i32) -> Self {
        self.padding = padding;
        self
    }

    /// Set corner radius
    #[must_use]
    pub const fn with_border_radius(mut self, radius: i32) -> Self {
        self.border_radius = radius;
        self
    }

    /// Enable or disable the shadow
    #[must_use]
    pub const fn with_shadow(mut self, shadow: bool) -> Self {
        self.shadow = shadow;
        self
    }

    /// Padding clamped to `>= 0`
    #[must_use]
    pub fn padding_px(&self) -> u32 {
        self.padding.max(0) as u32
    }

    /// Corner radius clamped to `>= 0`
    #[must_use]
    pub fn border_radius_px(&self) -> u32 {
        self.border_radius.max(0) as u32
    }

    /// No padding, no radius, no shadow: the stage can be skipped
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.padding_px() == 0 && self.border_radius_px() == 0 && !self.shadow
    }

    /// Extra space reserved for the shadow, added once to each dimension
    #[must_use]
    pub fn shadow_margin(&self) -> u32 {
        if self.shadow {
            crate::composite::SHADOW_MARGIN
        } else {
            0
        }
    }

    /// Output size for a source of `width x height`, computed without
    /// touching any pixels. Saturates instead of overflowing.
    #[must_use]
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        let extra = self
            .padding_px()
            .saturating_mul(2)
            .saturating_add(self.shadow_margin());
        (width.saturating_add(extra), height.saturating_add(extra))
    }
}

/// Settings of one capture invocation, owned by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Raster type of the resulting artifact
    pub format: ExportFormat,
    /// Encoder quality, 0.0-1.0 (lossy formats only)
    pub quality: f32,
    /// Device-pixel multiplier
    pub scale: f64,
    /// Keep the page background; `false` leaves unpainted pixels at alpha 0
    pub include_background: bool,
    /// Padding in pixels
    pub padding: i32,
    /// Corner radius in pixels
    pub border_radius: i32,
    /// Drop shadow
    pub shadow: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            quality: 0.92,
            scale: 2.0,
            include_background: true,
            padding: 0,
            border_radius: 0,
            shadow: false,
        }
    }
}

impl CaptureSettings {
    /// Create default capture settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format
    #[must_use]
    pub const fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set quality (clamped to 0.0-1.0)
    #[must_use]
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = if quality.is_finite() {
            quality.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self
    }

    /// Set the device-pixel scale
    #[must_use]
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Keep or drop the background
    #[must_use]
    pub const fn with_background(mut self, include: bool) -> Self {
        self.include_background = include;
        self
    }

    /// Set padding
    #[must_use]
    pub const fn with_padding(mut self, padding: i32) -> Self {
        self.padding = padding;
        self
    }

    /// Set corner radius
    #[must_use]
    pub const fn with_border_radius(mut self, radius: i32) -> Self {
        self.border_radius = radius;
        self
    }

    /// Enable or disable the shadow
    #[must_use]
    pub const fn with_shadow(mut self, shadow: bool) -> Self {
        self.shadow = shadow;
        self
    }

    /// The composite part of these settings
    #[must_use]
    pub const fn composite_settings(&self) -> CompositeSettings {
        CompositeSettings::new(self.padding, self.border_radius, self.shadow)
    }

    /// Quality on the encoders' 1-100 scale
    #[must_use]
    pub fn export_quality(&self) -> u8 {
        let q = if self.quality.is_finite() {
            self.quality.clamp(0.0, 1.0)
        } else {
            1.0
        };
        ((q * 100.0).round() as u8).clamp(1, 100)
    }
}

/// Settings of one export call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Output format
    pub format: ExportFormat,
    /// Encoder quality (1-100)
    pub quality: u8,
    /// Target width; frames are resized to it
    pub width: Option<u32>,
    /// Target height; frames are resized to it
    pub height: Option<u32>,
    /// Frames per second (video)
    pub frame_rate: u8,
    /// Delay used for GIF frames that carry none, in milliseconds
    pub frame_delay_ms: u32,
    /// GIF loop count (0 = infinite)
    pub loop_count: u16,
    /// Video bitrate in kbps, used for estimates
    pub bitrate_kbps: u32,
    /// Post-processing applied to every frame
    pub composite: CompositeSettings,
    /// Filename stem of the suggested download name
    pub file_stem: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            quality: 92,
            width: None,
            height: None,
            frame_rate: 10,
            frame_delay_ms: 100,
            loop_count: 0,
            bitrate_kbps: 2_500,
            composite: CompositeSettings::default(),
            file_stem: String::from("mockup"),
        }
    }
}

impl ExportSettings {
    /// Create export settings for a format
    #[must_use]
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Derive export settings from a capture configuration
    #[must_use]
    pub fn from_capture(capture: &CaptureSettings) -> Self {
        Self {
            format: capture.format,
            quality: capture.export_quality(),
            composite: capture.composite_settings(),
            ..Default::default()
        }
    }

    /// Set the format
    #[must_use]
    pub const fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set quality (clamped to 1-100)
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Set both target dimensions
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the target width only (height follows the aspect ratio)
    #[must_use]
    pub const fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the target height only (width follows the aspect ratio)
    #[must_use]
    pub const fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Set frames per second (clamped to 1-60)
    #[must_use]
    pub fn with_frame_rate(mut self, fps: u8) -> Self {
        self.frame_rate = fps.clamp(1, 60);
        self
    }

    /// Set the default GIF frame delay
    #[must_use]
    pub const fn with_frame_delay(mut self, delay_ms: u32) -> Self {
        self.frame_delay_ms = delay_ms;
        self
    }

    /// Set loop count (0 = infinite)
    #[must_use]
    pub const fn with_loop_count(mut self, count: u16) -> Self {
        self.loop_count = count;
        self
    }

    /// Set video bitrate in kbps
    #[must_use]
    pub const fn with_bitrate(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = kbps;
        self
    }

    /// Set the composite step
    #[must_use]
    pub const fn with_composite(mut self, composite: CompositeSettings) -> Self {
        self.composite = composite;
        self
    }

    /// Set the filename stem
    #[must_use]
    pub fn with_file_stem(mut self, stem: impl Into<String>) -> Self {
        self.file_stem = stem.into();
        self
    }

    /// Delay to use for a frame, falling back to `frame_delay_ms`
    #[must_use]
    pub const fn effective_delay(&self, frame_delay_ms: u32) -> u32 {
        if frame_delay_ms == 0 {
            self.frame_delay_ms
        } else {
            frame_delay_ms
        }
    }

    /// Final output size for frames of `width x height` (post-composite).
    /// A single target side keeps the aspect ratio.
    #[must_use]
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, scale_side(height, w, width)),
            (None, Some(h)) => (scale_side(width, h, height), h),
            (None, None) => (width, height),
        }
    }
}

fn scale_side(side: u32, target: u32, reference: u32) -> u32 {
    if reference == 0 {
        return side;
    }
    let scaled = (f64::from(side) * f64::from(target) / f64::from(reference)).round();
    (scaled as u32).max(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod format_tests {
        use super::*;

        #[test]
        fn test_mime_and_extension() {
            assert_eq!(ExportFormat::Png.mime_type(), "image/png");
            assert_eq!(ExportFormat::Jpeg.extension(), "jpg");
            assert_eq!(ExportFormat::Mp4.mime_type(), "video/mp4");
        }

        #[test]
        fn test_animated_and_lossy() {
            assert!(ExportFormat::Gif.is_animated());
            assert!(!ExportFormat::Webp.is_animated());
            assert!(ExportFormat::Jpeg.is_lossy());
            assert!(!ExportFormat::Png.is_lossy());
        }

        #[test]
        fn test_from_extension() {
            assert_eq!(ExportFormat::from_extension("JPEG"), Some(ExportFormat::Jpeg));
            assert_eq!(ExportFormat::from_extension("gif"), Some(ExportFormat::Gif));
            assert_eq!(ExportFormat::from_extension("bmp"), None);
        }

        #[test]
        fn test_serde_lowercase() {
            let json = serde_json::to_string(&ExportFormat::Webp).unwrap();
            assert_eq!(json, "\"webp\"");
        }
    }

    mod composite_settings_tests {
        use super::*;

        #[test]
        fn test_default_is_identity() {
            assert!(CompositeSettings::default().is_identity());
        }

        #[test]
        fn test_negative_values_clamp() {
            let settings = CompositeSettings::new(-10, -4, false);
            assert_eq!(settings.padding_px(), 0);
            assert_eq!(settings.border_radius_px(), 0);
            assert!(settings.is_identity());
            assert_eq!(settings.output_size(50, 60), (50, 60));
        }

        #[test]
        fn test_output_size_with_padding() {
            let settings = CompositeSettings::new(20, 0, false);
            assert_eq!(settings.output_size(200, 200), (240, 240));
        }

        #[test]
        fn test_output_size_with_shadow() {
            let settings = CompositeSettings::new(10, 0, true);
            assert_eq!(
                settings.output_size(100, 50),
                (100 + 20 + crate::composite::SHADOW_MARGIN, 50 + 20 + crate::composite::SHADOW_MARGIN)
            );
        }

        #[test]
        fn test_output_size_saturates() {
            let settings = CompositeSettings::new(i32::MAX, 0, true);
            assert_eq!(settings.output_size(u32::MAX, 1).0, u32::MAX);
        }
    }

    mod capture_settings_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let settings = CaptureSettings::default();
            assert_eq!(settings.scale, 2.0);
            assert!(settings.include_background);
            assert!(settings.composite_settings().is_identity());
        }

        #[test]
        fn test_quality_clamping() {
            assert_eq!(CaptureSettings::new().with_quality(3.0).quality, 1.0);
            assert_eq!(CaptureSettings::new().with_quality(-1.0).quality, 0.0);
            assert_eq!(CaptureSettings::new().with_quality(f32::NAN).quality, 1.0);
        }

        #[test]
        fn test_export_quality_scale() {
            assert_eq!(CaptureSettings::new().with_quality(0.8).export_quality(), 80);
            assert_eq!(CaptureSettings::new().with_quality(0.0).export_quality(), 1);
        }

        #[test]
        fn test_partial_yaml_uses_defaults() {
            let settings: CaptureSettings = serde_yaml_ng::from_str("scale: 3.0\nshadow: true\n").unwrap();
            assert_eq!(settings.scale, 3.0);
            assert!(settings.shadow);
            assert_eq!(settings.format, ExportFormat::Png);
        }
    }

    mod export_settings_tests {
        use super::*;

        #[test]
        fn test_from_capture() {
            let capture = CaptureSettings::new()
                .with_format(ExportFormat::Jpeg)
                .with_quality(0.5)
                .with_padding(12)
                .with_shadow(true);
            let export = ExportSettings::from_capture(&capture);
            assert_eq!(export.format, ExportFormat::Jpeg);
            assert_eq!(export.quality, 50);
            assert_eq!(export.composite, CompositeSettings::new(12, 0, true));
        }

        #[test]
        fn test_frame_rate_clamping() {
            assert_eq!(ExportSettings::default().with_frame_rate(0).frame_rate, 1);
            assert_eq!(ExportSettings::default().with_frame_rate(200).frame_rate, 60);
        }

        #[test]
        fn test_target_size() {
            let settings = ExportSettings::default();
            assert_eq!(settings.target_size(300, 200), (300, 200));
            assert_eq!(settings.clone().with_size(30, 40).target_size(300, 200), (30, 40));
            assert_eq!(settings.clone().with_width(150).target_size(300, 200), (150, 100));
            assert_eq!(settings.with_height(50).target_size(300, 200), (75, 50));
        }

        #[test]
        fn test_effective_delay() {
            let settings = ExportSettings::default().with_frame_delay(80);
            assert_eq!(settings.effective_delay(0), 80);
            assert_eq!(settings.effective_delay(30), 30);
        }
    }
}
