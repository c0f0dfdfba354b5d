//! Composite stage: padding, rounded-corner clip and drop shadow.
//!
//! The exported file matches the preview pixel for pixel:
//!
//! ```text
//! canvas     transparent, (w + 2p + margin) x (h + 2p + margin)
//! shadow     black at 30 %, gaussian blur sigma 20, offset (20, 20)
//! radius > 0 rounded rect at (p, p) filled white, then used as clip
//! source     drawn at (p, p)
//! ```
//!
//! Synchronous and CPU-bound; once started it runs to completion.

use crate::bitmap::RasterBitmap;
use crate::geometry::{blend_over, with_coverage, RoundedRect};
use crate::result::CompositeError;
use crate::settings::CompositeSettings;
use image::{imageops, GrayImage, Luma, Rgba, RgbaImage};

/// Shadow offset on both axes, in pixels
pub const SHADOW_OFFSET: u32 = 20;
/// Shadow blur radius; the Gaussian sigma is half of it
pub const SHADOW_BLUR: f32 = 40.0;
/// Space added once to each output dimension when the shadow is on
pub const SHADOW_MARGIN: u32 = 40;
/// Shadow opacity (black at 30 %)
pub const SHADOW_OPACITY: f32 = 0.3;
/// Largest output side the composite stage will allocate
pub const MAX_DIMENSION: u32 = 32_767;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Composited bitmap with its effective output size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeResult {
    /// Post-processed pixels
    pub bitmap: RasterBitmap,
    /// Output width (source + 2 * padding + shadow margin)
    pub width: u32,
    /// Output height (source + 2 * padding + shadow margin)
    pub height: u32,
}

impl CompositeResult {
    /// Take the bitmap
    #[must_use]
    pub fn into_bitmap(self) -> RasterBitmap {
        self.bitmap
    }
}

/// Apply padding, corner clip and shadow to `source` without mutating it.
///
/// Identity settings return a bit-identical copy. Negative padding or
/// radius behave as zero.
pub fn composite(
    source: &RasterBitmap,
    settings: &CompositeSettings,
) -> Result<CompositeResult, CompositeError> {
    let (src_w, src_h) = source.dimensions();

    if settings.is_identity() {
        return Ok(CompositeResult {
            bitmap: source.clone(),
            width: src_w,
            height: src_h,
        });
    }

    let padding = settings.padding_px();
    let radius = settings.border_radius_px();
    let extra = u64::from(padding) * 2 + u64::from(settings.shadow_margin());
    let out_w = u64::from(src_w) + extra;
    let out_h = u64::from(src_h) + extra;
    if out_w > u64::from(MAX_DIMENSION) || out_h > u64::from(MAX_DIMENSION) {
        return Err(CompositeError::TooLarge {
            width: out_w,
            height: out_h,
            max: MAX_DIMENSION,
        });
    }
    let (out_w, out_h) = (out_w as u32, out_h as u32);

    tracing::debug!(
        src_w,
        src_h,
        out_w,
        out_h,
        padding,
        radius,
        shadow = settings.shadow,
        "compositing"
    );

    let mut canvas = RgbaImage::new(out_w, out_h);
    let clip = (radius > 0).then(|| {
        RoundedRect::new(
            padding as f32,
            padding as f32,
            src_w as f32,
            src_h as f32,
            radius as f32,
        )
    });

    if settings.shadow {
        paint_shadow(&mut canvas, source, clip.as_ref(), padding);
    }

    match clip {
        Some(ref rect) => {
            fill_shape(&mut canvas, rect, WHITE);
            draw_clipped(&mut canvas, source, padding, rect);
        }
        None => draw_source(&mut canvas, source, padding),
    }

    Ok(CompositeResult {
        bitmap: RasterBitmap::from_image(canvas),
        width: out_w,
        height: out_h,
    })
}

/// Composite, or hand the source back untouched when nothing would change
pub fn composite_owned(
    source: RasterBitmap,
    settings: &CompositeSettings,
) -> Result<RasterBitmap, CompositeError> {
    if settings.is_identity() {
        return Ok(source);
    }
    composite(&source, settings).map(CompositeResult::into_bitmap)
}

/// Paint the blurred, offset silhouette of the shape that is drawn next.
///
/// With a clip the silhouette is the rounded rectangle (filled white, hence
/// opaque); without one it is the alpha of the source itself.
fn paint_shadow(
    canvas: &mut RgbaImage,
    source: &RasterBitmap,
    clip: Option<&RoundedRect>,
    padding: u32,
) {
    let (out_w, out_h) = canvas.dimensions();
    let origin = padding + SHADOW_OFFSET;
    let mut mask = GrayImage::new(out_w, out_h);

    match clip {
        Some(rect) => {
            let (x0, y0, x1, y1) = rect.pixel_bounds(out_w, out_h);
            for y in y0..y1 {
                for x in x0..x1 {
                    let (sx, sy) = (x + SHADOW_OFFSET, y + SHADOW_OFFSET);
                    if sx < out_w && sy < out_h {
                        let alpha = (rect.coverage(x, y) * 255.0).round() as u8;
                        mask.put_pixel(sx, sy, Luma([alpha]));
                    }
                }
            }
        }
        None => {
            for (x, y, pixel) in source.as_image().enumerate_pixels() {
                let (sx, sy) = (x + origin, y + origin);
                if sx < out_w && sy < out_h {
                    mask.put_pixel(sx, sy, Luma([pixel[3]]));
                }
            }
        }
    }

    let blurred = imageops::blur(&mask, SHADOW_BLUR / 2.0);
    for (x, y, value) in blurred.enumerate_pixels() {
        let alpha = (f32::from(value[0]) * SHADOW_OPACITY).round() as u8;
        if alpha > 0 {
            canvas.put_pixel(x, y, Rgba([0, 0, 0, alpha]));
        }
    }
}

fn fill_shape(canvas: &mut RgbaImage, rect: &RoundedRect, color: Rgba<u8>) {
    let (out_w, out_h) = canvas.dimensions();
    let (x0, y0, x1, y1) = rect.pixel_bounds(out_w, out_h);
    for y in y0..y1 {
        for x in x0..x1 {
            let coverage = rect.coverage(x, y);
            if coverage > 0.0 {
                let dst = *canvas.get_pixel(x, y);
                canvas.put_pixel(x, y, blend_over(dst, with_coverage(color, coverage)));
            }
        }
    }
}

fn draw_clipped(canvas: &mut RgbaImage, source: &RasterBitmap, offset: u32, rect: &RoundedRect) {
    for (x, y, pixel) in source.as_image().enumerate_pixels() {
        let (cx, cy) = (x + offset, y + offset);
        let coverage = rect.coverage(cx, cy);
        if coverage <= 0.0 {
            continue;
        }
        let dst = *canvas.get_pixel(cx, cy);
        canvas.put_pixel(cx, cy, blend_over(dst, with_coverage(*pixel, coverage)));
    }
}

fn draw_source(canvas: &mut RgbaImage, source: &RasterBitmap, offset: u32) {
    for (x, y, pixel) in source.as_image().enumerate_pixels() {
        let (cx, cy) = (x + offset, y + offset);
        let dst = *canvas.get_pixel(cx, cy);
        canvas.put_pixel(cx, cy, blend_over(dst, *pixel));
    }
}
