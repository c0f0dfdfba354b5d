//! Encoder collaborators.
//!
//! The export orchestrator talks to bitstream encoders only through the
//! traits in this module. Default implementations sit on `image` (PNG, JPEG,
//! WebP), `png` and `gif`; MP4 output is a Motion-JPEG track in a minimal
//! ISO-BMFF container.

mod gif;
mod mp4;
mod still;

pub use self::gif::GifAnimationEncoder;
pub use self::mp4::MjpegMp4Encoder;
pub use self::still::{CompressionLevel, ImageStillEncoder};

use crate::bitmap::RasterBitmap;
use crate::result::EncodeError;
use crate::settings::{ExportFormat, ExportSettings};
use async_trait::async_trait;

/// Encodes one bitmap into a still-image file
#[async_trait]
pub trait StillEncoder: Send + Sync {
    /// Encode `bitmap` as `format`; `quality` (1-100) is ignored by lossless formats
    async fn encode_still(
        &self,
        bitmap: &RasterBitmap,
        format: ExportFormat,
        quality: u8,
    ) -> Result<Vec<u8>, EncodeError>;
}

/// Parameters fixed for the lifetime of one animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationParams {
    /// GIF or MP4
    pub format: ExportFormat,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frames per second (video)
    pub frame_rate: u8,
    /// Delay for frames that carry none, in milliseconds
    pub default_delay_ms: u32,
    /// Quality / colour depth trade-off (1-100)
    pub quality: u8,
    /// Loop count (0 = infinite)
    pub loop_count: u16,
    /// Target bitrate in kbps
    pub bitrate_kbps: u32,
}

impl AnimationParams {
    /// Derive parameters from export settings and the final frame size
    #[must_use]
    pub fn from_settings(settings: &ExportSettings, width: u32, height: u32) -> Self {
        Self {
            format: settings.format,
            width,
            height,
            frame_rate: settings.frame_rate.max(1),
            default_delay_ms: settings.frame_delay_ms,
            quality: settings.quality.clamp(1, 100),
            loop_count: settings.loop_count,
            bitrate_kbps: settings.bitrate_kbps,
        }
    }
}

/// An open animation, fed frames strictly in display order
#[async_trait]
pub trait AnimationSink: Send {
    /// Append one frame
    async fn push_frame(&mut self, bitmap: &RasterBitmap, delay_ms: u32)
        -> Result<(), EncodeError>;

    /// Frames accepted so far
    fn frames_written(&self) -> usize;

    /// Close the stream and return the encoded file; the sink is spent afterwards
    async fn finish(&mut self) -> Result<Vec<u8>, EncodeError>;
}

/// Factory for [`AnimationSink`]s
pub trait AnimationEncoder: Send + Sync {
    /// Whether this encoder produces `format`
    fn supports(&self, format: ExportFormat) -> bool;

    /// Open a new animation
    fn begin(&self, params: &AnimationParams) -> Result<Box<dyn AnimationSink>, EncodeError>;
}

/// Map quality (1-100) to NeuQuant speed (1-30); higher quality is slower
#[must_use]
pub fn quality_to_speed(quality: u8) -> i32 {
    let normalized = i32::from(100 - quality.clamp(1, 100));
    (normalized * 29 / 100 + 1).clamp(1, 30)
}

fn spent_sink(format: ExportFormat) -> EncodeError {
    EncodeError::encoder(format!("{format} stream already finished"))
}
