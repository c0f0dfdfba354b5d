//! Rounded-rectangle coverage and source-over blending.
//!
//! Shared by the composite stage and the scene rasterizer so a corner
//! painted by either looks the same.

use image::Rgba;

/// Axis-aligned rectangle with uniformly rounded corners, in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    radius: f32,
}

impl RoundedRect {
    /// Create a rounded rectangle; the radius is clamped to half the
    /// shorter side and to `>= 0`.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32, radius: f32) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let radius = radius.max(0.0).min(width.min(height) / 2.0);
        Self {
            x,
            y,
            width,
            height,
            radius,
        }
    }

    /// Effective corner radius after clamping
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Pixel bounds `(x0, y0, x1, y1)` covering the shape, clipped to
    /// `limit_w x limit_h`. End coordinates are exclusive.
    #[must_use]
    pub fn pixel_bounds(&self, limit_w: u32, limit_h: u32) -> (u32, u32, u32, u32) {
        let clamp = |v: f32, limit: u32| -> u32 { v.max(0.0).min(limit as f32) as u32 };
        (
            clamp(self.x.floor(), limit_w),
            clamp(self.y.floor(), limit_h),
            clamp((self.x + self.width).ceil(), limit_w),
            clamp((self.y + self.height).ceil(), limit_h),
        )
    }

    /// Signed distance from `(px, py)` to the outline; negative inside
    fn signed_distance(&self, px: f32, py: f32) -> f32 {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        let qx = (px - (self.x + half_w)).abs() - half_w + self.radius;
        let qy = (py - (self.y + half_h)).abs() - half_h + self.radius;
        let outside = qx.max(0.0).hypot(qy.max(0.0));
        outside + qx.max(qy).min(0.0) - self.radius
    }

    /// Anti-aliased coverage (0.0-1.0) of the pixel whose top-left corner
    /// is `(x, y)`. Straight edges on integer coordinates are exact.
    #[must_use]
    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        if self.width <= 0.0 || self.height <= 0.0 {
            return 0.0;
        }
        let d = self.signed_distance(x as f32 + 0.5, y as f32 + 0.5);
        (0.5 - d).clamp(0.0, 1.0)
    }
}

/// Scale the alpha channel of a pixel by `factor` (0.0-1.0)
#[must_use]
pub fn with_coverage(pixel: Rgba<u8>, factor: f32) -> Rgba<u8> {
    if factor >= 1.0 {
        return pixel;
    }
    let alpha = (f32::from(pixel[3]) * factor.max(0.0)).round() as u8;
    Rgba([pixel[0], pixel[1], pixel[2], alpha])
}

/// Source-over compositing of straight-alpha pixels.
///
/// A transparent destination takes the source verbatim, so drawing onto a
/// cleared canvas reproduces the source bit for bit.
#[must_use]
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3];
    if sa == 255 || dst[3] == 0 {
        return src;
    }
    if sa == 0 {
        return dst;
    }

    let sa = f32::from(sa) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let channel = |s: u8, d: u8| -> u8 {
        let value = (f32::from(s) * sa + f32::from(d) * da * (1.0 - sa)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
