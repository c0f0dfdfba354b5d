//! Result and error types for Mockshot.
//!
//! Each pipeline stage has its own error enum so the UI can tell a capture
//! problem from an encoder failure; [`MockshotError`] is the umbrella every
//! public entry point returns.

use thiserror::Error;

/// Result type for Mockshot operations
pub type MockshotResult<T> = Result<T, MockshotError>;

/// Errors raised while turning a UI region into a bitmap.
///
/// None of these are retried automatically: the caller has to fix the
/// region (wait for layout, pick another element) and try again.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The region has no layout size
    #[error("Capture target '{region}' is empty ({width}x{height} CSS px)")]
    EmptyTarget {
        /// Region identifier
        region: String,
        /// CSS width
        width: f64,
        /// CSS height
        height: f64,
    },

    /// Device-pixel scale is zero, negative or not finite
    #[error("Invalid capture scale {scale}")]
    InvalidScale {
        /// Requested scale
        scale: f64,
    },

    /// Expected bitmap exceeds the maximum side length
    #[error("Capture of '{region}' would be {width}x{height}px, above the {max}px limit")]
    TooLarge {
        /// Region identifier
        region: String,
        /// Expected pixel width
        width: u32,
        /// Expected pixel height
        height: u32,
        /// Maximum side length
        max: u32,
    },

    /// Rasterizer did not answer within the wall-clock ceiling
    #[error("Rasterizing '{region}' timed out after {ms}ms")]
    Timeout {
        /// Region identifier
        region: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Rasterizer returned a bitmap whose size disagrees with `css * scale`
    #[error(
        "Rasterizer returned {actual_width}x{actual_height}px, expected {expected_width}x{expected_height}px"
    )]
    SizeMismatch {
        /// Expected pixel width
        expected_width: u32,
        /// Expected pixel height
        expected_height: u32,
        /// Actual pixel width
        actual_width: u32,
        /// Actual pixel height
        actual_height: u32,
    },

    /// The external rasterization primitive failed
    #[error("Rasterizer failed: {message}")]
    Rasterizer {
        /// Error message
        message: String,
    },
}

impl CaptureError {
    /// Create a rasterizer error
    #[must_use]
    pub fn rasterizer(message: impl Into<String>) -> Self {
        Self::Rasterizer {
            message: message.into(),
        }
    }
}

/// Errors raised by the composite stage.
///
/// Clamped inputs never fail; only an absurd output size is refused before
/// the canvas is allocated.
#[derive(Debug, Error)]
pub enum CompositeError {
    /// Output canvas would exceed the maximum side length
    #[error("Composite output {width}x{height}px exceeds the {max}px limit")]
    TooLarge {
        /// Requested output width
        width: u64,
        /// Requested output height
        height: u64,
        /// Maximum side length
        max: u32,
    },
}

/// Invalid export requests, detected before any encoder is invoked.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to export
    #[error("Frame sequence is empty")]
    EmptySequence,

    /// Target or frame dimensions are zero or above the size limit
    #[error("Invalid export dimensions {width}x{height}")]
    InvalidDimensions {
        /// Width
        width: u32,
        /// Height
        height: u32,
    },

    /// A still format was asked to hold an animation
    #[error("{format} holds a single image, got {count} frames")]
    TooManyFrames {
        /// Format name
        format: String,
        /// Number of frames supplied
        count: usize,
    },

    /// A frame was requested twice from a consuming source
    #[error("Frame {index} is no longer available")]
    FrameUnavailable {
        /// Frame index
        index: usize,
    },

    /// Export was cancelled between frames
    #[error("Export cancelled after {frames_encoded} frames")]
    Cancelled {
        /// Frames handed to the encoder before cancellation
        frames_encoded: usize,
    },

    /// Session already completed or failed
    #[error("Export session is closed")]
    SessionClosed,
}

/// External encoder failures, normalised into one shape for the UI.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// No encoder handles the request
    #[error("Cannot encode {format}: {reason}")]
    Unsupported {
        /// Format name
        format: String,
        /// Why it is unsupported
        reason: String,
    },

    /// The encoder itself failed
    #[error("Encoder failed: {message}")]
    Encoder {
        /// Error message
        message: String,
    },
}

impl EncodeError {
    /// Create an encoder failure
    #[must_use]
    pub fn encoder(message: impl Into<String>) -> Self {
        Self::Encoder {
            message: message.into(),
        }
    }

    /// Create an unsupported-format error
    #[must_use]
    pub fn unsupported(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            format: format.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur in Mockshot
#[derive(Debug, Error)]
pub enum MockshotError {
    /// Capture stage failure
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Composite stage failure
    #[error(transparent)]
    Composite(#[from] CompositeError),

    /// Invalid export request
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Encoder failure
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl MockshotError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the user can sensibly hit "Retry" without changing anything
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Encode(EncodeError::Encoder { .. }) | Self::Capture(CaptureError::Timeout { .. })
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_message() {
        let err = CaptureError::EmptyTarget {
            region: "#post".to_string(),
            width: 0.0,
            height: 120.0,
        };
        assert!(err.to_string().contains("#post"));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_umbrella_is_transparent() {
        let err: MockshotError = ExportError::EmptySequence.into();
        assert_eq!(err.to_string(), "Frame sequence is empty");
        assert!(matches!(
            err,
            MockshotError::Export(ExportError::EmptySequence)
        ));
    }

    #[test]
    fn test_encoder_failure_is_retriable() {
        let err: MockshotError = EncodeError::encoder("boom").into();
        assert!(err.is_retriable());

        let err: MockshotError = ExportError::EmptySequence.into();
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MockshotError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
