//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```yaml
//! capture_timeout_ms: 5000
//! png_compression: best
//! capture:
//!   scale: 3.0
//!   shadow: true
//! ```

use crate::capture::DEFAULT_CAPTURE_TIMEOUT;
use crate::encode::{CompressionLevel, ImageStillEncoder};
use crate::estimate::DEFAULT_BYTES_DIVISOR;
use crate::export::Exporter;
use crate::result::{MockshotError, MockshotResult};
use crate::settings::{CaptureSettings, ExportSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine-wide defaults and tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockshotConfig {
    /// Wall-clock ceiling for one rasterize call, in milliseconds
    pub capture_timeout_ms: u64,
    /// Divisor of the file-size estimate
    pub size_divisor: f64,
    /// PNG compression level
    pub png_compression: CompressionLevel,
    /// Default capture settings
    pub capture: CaptureSettings,
    /// Default export settings for animations
    pub export: ExportSettings,
}

impl Default for MockshotConfig {
    fn default() -> Self {
        Self {
            capture_timeout_ms: DEFAULT_CAPTURE_TIMEOUT.as_millis() as u64,
            size_divisor: DEFAULT_BYTES_DIVISOR,
            png_compression: CompressionLevel::default(),
            capture: CaptureSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl MockshotConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capture timeout
    #[must_use]
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the estimate divisor
    #[must_use]
    pub const fn with_size_divisor(mut self, divisor: f64) -> Self {
        self.size_divisor = divisor;
        self
    }

    /// Set PNG compression
    #[must_use]
    pub const fn with_png_compression(mut self, level: CompressionLevel) -> Self {
        self.png_compression = level;
        self
    }

    /// Set default capture settings
    #[must_use]
    pub const fn with_capture(mut self, capture: CaptureSettings) -> Self {
        self.capture = capture;
        self
    }

    /// Set default export settings
    #[must_use]
    pub fn with_export(mut self, export: ExportSettings) -> Self {
        self.export = export;
        self
    }

    /// Capture timeout as a duration
    #[must_use]
    pub const fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    /// Exporter using the configured PNG compression
    #[must_use]
    pub fn exporter(&self) -> Exporter {
        Exporter::new(ImageStillEncoder::new().with_compression(self.png_compression))
    }

    /// Reject values no export can work with
    pub fn validate(&self) -> MockshotResult<()> {
        if self.capture_timeout_ms == 0 {
            return Err(MockshotError::config("capture_timeout_ms must be positive"));
        }
        if !self.size_divisor.is_finite() || self.size_divisor <= 0.0 {
            return Err(MockshotError::config(format!(
                "size_divisor must be a positive number, got {}",
                self.size_divisor
            )));
        }
        if !self.capture.scale.is_finite() || self.capture.scale <= 0.0 {
            return Err(MockshotError::config(format!(
                "capture.scale must be positive, got {}",
                self.capture.scale
            )));
        }
        Ok(())
    }

    /// Parse YAML
    pub fn from_yaml(yaml: &str) -> MockshotResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON
    pub fn from_json(json: &str) -> MockshotResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.yaml`, `.yml` or `.json` file
    pub fn load(path: &Path) -> MockshotResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading config");
        match ext.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml(&text),
            Some("json") => Self::from_json(&text),
            _ => Err(MockshotError::config(format!(
                "unsupported config file '{}' (expected .yaml, .yml or .json)",
                path.display()
            ))),
        }
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> MockshotResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
