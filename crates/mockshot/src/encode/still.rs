//! Still-image encoding: PNG, JPEG and WebP.

use super::StillEncoder;
use crate::bitmap::RasterBitmap;
use crate::result::EncodeError;
use crate::settings::ExportFormat;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// PNG compression level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Fastest, largest files
    Fast,
    /// Default compression
    #[default]
    Default,
    /// Smallest files, slowest
    Best,
}

impl CompressionLevel {
    fn to_png_compression(self) -> png::Compression {
        match self {
            Self::Fast => png::Compression::Fast,
            Self::Default => png::Compression::Default,
            Self::Best => png::Compression::Best,
        }
    }
}

/// Default [`StillEncoder`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageStillEncoder {
    compression: CompressionLevel,
}

impl ImageStillEncoder {
    /// Create an encoder with default PNG compression
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set PNG compression
    #[must_use]
    pub const fn with_compression(mut self, compression: CompressionLevel) -> Self {
        self.compression = compression;
        self
    }

    /// PNG compression in use
    #[must_use]
    pub const fn compression(&self) -> CompressionLevel {
        self.compression
    }

    fn encode_png(&self, bitmap: &RasterBitmap) -> Result<Vec<u8>, EncodeError> {
        let mut output = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut output, bitmap.width(), bitmap.height());
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(self.compression.to_png_compression());

            let mut writer = encoder
                .write_header()
                .map_err(|e| EncodeError::encoder(format!("PNG header: {e}")))?;
            writer
                .write_image_data(bitmap.as_raw())
                .map_err(|e| EncodeError::encoder(format!("PNG data: {e}")))?;
        }
        Ok(output)
    }
}

/// Composite straight-alpha pixels onto opaque white
pub(super) fn flatten_onto_white(bitmap: &RasterBitmap) -> RgbImage {
    RgbImage::from_fn(bitmap.width(), bitmap.height(), |x, y| {
        let p = bitmap.as_image().get_pixel(x, y);
        let a = u32::from(p[3]);
        let mix = |c: u8| -> u8 { ((u32::from(c) * a + 255 * (255 - a) + 127) / 255) as u8 };
        image::Rgb([mix(p[0]), mix(p[1]), mix(p[2])])
    })
}

fn encode_jpeg(bitmap: &RasterBitmap, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let rgb = flatten_onto_white(bitmap);
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::encoder(format!("JPEG encoding failed: {e}")))?;
    Ok(buffer.into_inner())
}

fn encode_webp(bitmap: &RasterBitmap) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(&mut buffer)
        .encode(
            bitmap.as_raw(),
            bitmap.width(),
            bitmap.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| EncodeError::encoder(format!("WebP encoding failed: {e}")))?;
    Ok(buffer)
}

#[async_trait]
impl StillEncoder for ImageStillEncoder {
    async fn encode_still(
        &self,
        bitmap: &RasterBitmap,
        format: ExportFormat,
        quality: u8,
    ) -> Result<Vec<u8>, EncodeError> {
        tracing::debug!(%format, quality, width = bitmap.width(), height = bitmap.height(), "encoding still");
        match format {
            ExportFormat::Png => self.encode_png(bitmap),
            ExportFormat::Jpeg => encode_jpeg(bitmap, quality),
            ExportFormat::Webp => encode_webp(bitmap),
            ExportFormat::Gif | ExportFormat::Mp4 => Err(EncodeError::unsupported(
                format.to_string(),
                "animated formats go through an animation encoder",
            )),
        }
    }
}
