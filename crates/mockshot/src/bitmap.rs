//! Raster bitmaps and frame sequences.

use image::{imageops::FilterType, DynamicImage, Rgba, RgbaImage};

/// An owned RGBA8 pixel buffer.
///
/// Produced by capture, consumed by composite and encode. Straight
/// (non-premultiplied) alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBitmap {
    pixels: RgbaImage,
}

impl RasterBitmap {
    /// Create a fully transparent bitmap
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    /// Create a bitmap filled with one colour
    #[must_use]
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba(color)),
        }
    }

    /// Wrap an existing image buffer
    #[must_use]
    pub const fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Build from raw RGBA bytes; `None` when the length does not match
    #[must_use]
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(Self::from_image)
    }

    /// Decode any supported image file (PNG, JPEG, WebP)
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(img.to_rgba8()))
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `(width, height)`
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// True when either side is zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// RGBA value at `(x, y)`, `None` when out of bounds
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.width() && y < self.height() {
            Some(self.pixels.get_pixel(x, y).0)
        } else {
            None
        }
    }

    /// Borrow the underlying image
    #[must_use]
    pub const fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Mutable access for rasterizers
    pub fn as_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Take the underlying image
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    /// Raw RGBA bytes, row-major
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Resize to exact dimensions; returns `self` untouched when already sized
    #[must_use]
    pub fn resized(self, width: u32, height: u32) -> Self {
        if self.dimensions() == (width, height) {
            return self;
        }
        let img = DynamicImage::ImageRgba8(self.pixels);
        Self::from_image(
            img.resize_exact(width, height, FilterType::Triangle)
                .to_rgba8(),
        )
    }

    /// Count pixels with alpha == 0
    #[must_use]
    pub fn transparent_pixel_count(&self) -> usize {
        self.pixels.pixels().filter(|p| p[3] == 0).count()
    }
}

impl From<RgbaImage> for RasterBitmap {
    fn from(pixels: RgbaImage) -> Self {
        Self::from_image(pixels)
    }
}

/// One bitmap of an animated export with its display delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Pixels
    pub bitmap: RasterBitmap,
    /// How long the frame stays on screen, in milliseconds
    pub delay_ms: u32,
}

impl Frame {
    /// Create a new frame
    #[must_use]
    pub const fn new(bitmap: RasterBitmap, delay_ms: u32) -> Self {
        Self { bitmap, delay_ms }
    }
}

/// Ordered frames of a GIF/video export. Order is display order.
///
/// An empty sequence is valid to build; export rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    /// Create an empty sequence
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-frame sequence for still exports
    #[must_use]
    pub fn single(bitmap: RasterBitmap) -> Self {
        Self {
            frames: vec![Frame::new(bitmap, 0)],
        }
    }

    /// Build from bitmaps that share one delay
    #[must_use]
    pub fn from_bitmaps(bitmaps: Vec<RasterBitmap>, delay_ms: u32) -> Self {
        Self {
            frames: bitmaps
                .into_iter()
                .map(|b| Frame::new(b, delay_ms))
                .collect(),
        }
    }

    /// Append a frame
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Append a frame (builder form)
    #[must_use]
    pub fn with_frame(mut self, bitmap: RasterBitmap, delay_ms: u32) -> Self {
        self.push(Frame::new(bitmap, delay_ms));
        self
    }

    /// Number of frames
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterate in display order
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Sum of all delays
    #[must_use]
    pub fn total_duration_ms(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.delay_ms)).sum()
    }

    /// Take the frames out
    #[must_use]
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

impl FromIterator<Frame> for FrameSequence {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    #[test]
    fn test_new_bitmap_is_transparent() {
        let bitmap = RasterBitmap::new(4, 3);
        assert_eq!(bitmap.dimensions(), (4, 3));
        assert_eq!(bitmap.transparent_pixel_count(), 12);
    }

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        assert!(RasterBitmap::from_raw(2, 2, vec![0; 15]).is_none());
        assert!(RasterBitmap::from_raw(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn test_pixel_out_of_bounds() {
        let bitmap = RasterBitmap::filled(2, 2, [1, 2, 3, 4]);
        assert_eq!(bitmap.pixel(1, 1), Some([1, 2, 3, 4]));
        assert_eq!(bitmap.pixel(2, 0), None);
    }

    #[test]
    fn test_decode_png() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let bitmap = RasterBitmap::decode(&png).unwrap();
        assert_eq!(bitmap.dimensions(), (3, 2));
        assert_eq!(bitmap.pixel(0, 0), Some([10, 20, 30, 255]));
    }

    #[test]
    fn test_resized_same_size_is_noop() {
        let bitmap = RasterBitmap::filled(5, 5, [9, 9, 9, 255]);
        let resized = bitmap.clone().resized(5, 5);
        assert_eq!(resized, bitmap);
    }

    #[test]
    fn test_resized_changes_dimensions() {
        let bitmap = RasterBitmap::filled(10, 10, [255, 0, 0, 255]);
        let resized = bitmap.resized(4, 6);
        assert_eq!(resized.dimensions(), (4, 6));
        assert_eq!(resized.pixel(2, 3), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_sequence_order_and_duration() {
        let seq = FrameSequence::new()
            .with_frame(RasterBitmap::filled(1, 1, [1, 0, 0, 255]), 100)
            .with_frame(RasterBitmap::filled(1, 1, [2, 0, 0, 255]), 250);

        assert_eq!(seq.len(), 2);
        assert_eq!(seq.total_duration_ms(), 350);
        let reds: Vec<u8> = seq
            .iter()
            .map(|f| f.bitmap.pixel(0, 0).unwrap()[0])
            .collect();
        assert_eq!(reds, vec![1, 2]);
    }

    #[test]
    fn test_empty_sequence_is_constructible() {
        let seq = FrameSequence::from_bitmaps(Vec::new(), 100);
        assert!(seq.is_empty());
        assert_eq!(seq.total_duration_ms(), 0);
    }
}
