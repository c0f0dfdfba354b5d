//! Animated GIF output through the `gif` crate.

use super::{quality_to_speed, spent_sink, AnimationEncoder, AnimationParams, AnimationSink};
use crate::bitmap::RasterBitmap;
use crate::result::EncodeError;
use crate::settings::ExportFormat;
use ::gif::{Encoder, Frame, Repeat};
use async_trait::async_trait;

/// GIF [`AnimationEncoder`]; quality maps to NeuQuant speed
#[derive(Debug, Clone, Copy, Default)]
pub struct GifAnimationEncoder;

impl GifAnimationEncoder {
    /// Create the encoder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AnimationEncoder for GifAnimationEncoder {
    fn supports(&self, format: ExportFormat) -> bool {
        format == ExportFormat::Gif
    }

    fn begin(&self, params: &AnimationParams) -> Result<Box<dyn AnimationSink>, EncodeError> {
        let width = u16::try_from(params.width).map_err(|_| too_large(params))?;
        let height = u16::try_from(params.height).map_err(|_| too_large(params))?;

        let mut encoder = Encoder::new(Vec::new(), width, height, &[])
            .map_err(|e| EncodeError::encoder(format!("Failed to create GIF encoder: {e}")))?;
        let repeat = if params.loop_count == 0 {
            Repeat::Infinite
        } else {
            Repeat::Finite(params.loop_count)
        };
        encoder
            .set_repeat(repeat)
            .map_err(|e| EncodeError::encoder(format!("Failed to set GIF repeat: {e}")))?;

        Ok(Box::new(GifSink {
            encoder: Some(encoder),
            width,
            height,
            speed: quality_to_speed(params.quality),
            default_delay_ms: params.default_delay_ms,
            frames: 0,
        }))
    }
}

fn too_large(params: &AnimationParams) -> EncodeError {
    EncodeError::unsupported(
        "GIF",
        format!("{}x{} exceeds 65535px per side", params.width, params.height),
    )
}

/// Milliseconds to GIF centiseconds, at least one tick
fn delay_cs(delay_ms: u32) -> u16 {
    u16::try_from(delay_ms.saturating_add(5) / 10).unwrap_or(u16::MAX).max(1)
}

struct GifSink {
    encoder: Option<Encoder<Vec<u8>>>,
    width: u16,
    height: u16,
    speed: i32,
    default_delay_ms: u32,
    frames: usize,
}

#[async_trait]
impl AnimationSink for GifSink {
    async fn push_frame(
        &mut self,
        bitmap: &RasterBitmap,
        delay_ms: u32,
    ) -> Result<(), EncodeError> {
        let (width, height) = (u32::from(self.width), u32::from(self.height));
        let mut rgba = if bitmap.dimensions() == (width, height) {
            bitmap.as_raw().to_vec()
        } else {
            bitmap.clone().resized(width, height).into_image().into_raw()
        };

        let encoder = self.encoder.as_mut().ok_or_else(|| spent_sink(ExportFormat::Gif))?;
        let mut frame = Frame::from_rgba_speed(self.width, self.height, &mut rgba, self.speed);
        let delay = if delay_ms == 0 { self.default_delay_ms } else { delay_ms };
        frame.delay = delay_cs(delay);
        encoder
            .write_frame(&frame)
            .map_err(|e| EncodeError::encoder(format!("Failed to write GIF frame: {e}")))?;
        self.frames += 1;
        Ok(())
    }

    fn frames_written(&self) -> usize {
        self.frames
    }

    async fn finish(&mut self) -> Result<Vec<u8>, EncodeError> {
        let encoder = self.encoder.take().ok_or_else(|| spent_sink(ExportFormat::Gif))?;
        encoder
            .into_inner()
            .map_err(|e| EncodeError::encoder(format!("Failed to finish GIF: {e}")))
    }
}
