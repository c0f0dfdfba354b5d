//! Capture stage: rasterize a UI region into a [`RasterBitmap`].
//!
//! The actual rasterization is delegated to a [`Rasterizer`]: a browser
//! through CDP, or the in-process [`SceneRasterizer`] for declarative scenes.
//! This module validates the request, bounds the call with a wall-clock
//! timeout and checks that the rasterizer honoured the requested scale.

mod scene;

#[cfg(feature = "browser")]
mod chromium;

#[cfg(feature = "browser")]
pub use chromium::{ChromiumRasterizer, ChromiumRasterizerConfig};
pub use scene::{Scene, SceneElement, SceneRasterizer};

use crate::bitmap::RasterBitmap;
use crate::composite::MAX_DIMENSION;
use crate::result::CaptureError;
use crate::settings::CaptureSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wall-clock ceiling for a single rasterize call
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// A renderable region: identifier plus CSS layout size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// CSS selector or node id
    pub id: String,
    /// Layout width in CSS pixels
    pub width: f64,
    /// Layout height in CSS pixels
    pub height: f64,
}

impl Region {
    /// Create a region
    #[must_use]
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }

    /// No layout area (or a nonsensical one)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    /// Expected bitmap size at `scale`: `round(css * scale)` per side
    #[must_use]
    pub fn pixel_size(&self, scale: f64) -> (u32, u32) {
        let side = |css: f64| -> u32 { (css * scale).round().clamp(0.0, f64::from(u32::MAX)) as u32 };
        (side(self.width), side(self.height))
    }
}

/// External rasterization primitive.
///
/// Implementations must return a bitmap of exactly
/// [`Region::pixel_size`]`(scale)` and, when `transparent_background` is set,
/// leave every unpainted pixel at alpha 0.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Rasterize `region` at `scale` device pixels per CSS pixel
    async fn rasterize(
        &self,
        region: &Region,
        scale: f64,
        transparent_background: bool,
    ) -> Result<RasterBitmap, CaptureError>;
}

/// Rasterize `region` according to `settings`.
///
/// Empty regions, invalid scales and bitmaps above [`MAX_DIMENSION`] are
/// rejected without calling the rasterizer. The rasterizer call is bounded by `timeout`.
#[tracing::instrument(skip_all, fields(region = %region.id, scale = settings.scale))]
pub async fn capture<R>(
    rasterizer: &R,
    region: &Region,
    settings: &CaptureSettings,
    timeout: Duration,
) -> Result<RasterBitmap, CaptureError>
where
    R: Rasterizer + ?Sized,
{
    if region.is_empty() {
        return Err(CaptureError::EmptyTarget {
            region: region.id.clone(),
            width: region.width,
            height: region.height,
        });
    }
    let scale = settings.scale;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CaptureError::InvalidScale { scale });
    }

    let (expected_width, expected_height) = region.pixel_size(scale);
    if expected_width == 0 || expected_height == 0 {
        return Err(CaptureError::EmptyTarget {
            region: region.id.clone(),
            width: region.width,
            height: region.height,
        });
    }
    if expected_width > MAX_DIMENSION || expected_height > MAX_DIMENSION {
        return Err(CaptureError::TooLarge {
            region: region.id.clone(),
            width: expected_width,
            height: expected_height,
            max: MAX_DIMENSION,
        });
    }

    let transparent = !settings.include_background;
    let bitmap = tokio::time::timeout(timeout, rasterizer.rasterize(region, scale, transparent))
        .await
        .map_err(|_| CaptureError::Timeout {
            region: region.id.clone(),
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })??;

    let (actual_width, actual_height) = bitmap.dimensions();
    if (actual_width, actual_height) != (expected_width, expected_height) {
        tracing::warn!(
            actual_width,
            actual_height,
            expected_width,
            expected_height,
            "rasterizer ignored requested scale"
        );
        return Err(CaptureError::SizeMismatch {
            expected_width,
            expected_height,
            actual_width,
            actual_height,
        });
    }

    tracing::debug!(width = actual_width, height = actual_height, transparent, "captured");
    Ok(bitmap)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a red bitmap of the requested size, or a fixed wrong one
    #[derive(Debug, Default)]
    struct StubRasterizer {
        calls: AtomicUsize,
        fixed_size: Option<(u32, u32)>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl Rasterizer for StubRasterizer {
        async fn rasterize(
            &self,
            region: &Region,
            scale: f64,
            transparent_background: bool,
        ) -> Result<RasterBitmap, CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let (w, h) = self.fixed_size.unwrap_or_else(|| region.pixel_size(scale));
            let alpha = if transparent_background { 0 } else { 255 };
            Ok(RasterBitmap::filled(w, h, [255, 0, 0, alpha]))
        }
    }

    mod region_tests {
        use super::*;

        #[test]
        fn test_pixel_size_rounds() {
            let region = Region::new("#a", 100.4, 33.3);
            assert_eq!(region.pixel_size(2.0), (201, 67));
            assert_eq!(region.pixel_size(1.5), (151, 50));
        }

        #[test]
        fn test_is_empty() {
            assert!(Region::new("#a", 0.0, 10.0).is_empty());
            assert!(Region::new("#a", 10.0, -1.0).is_empty());
            assert!(Region::new("#a", f64::NAN, 10.0).is_empty());
            assert!(!Region::new("#a", 1.0, 1.0).is_empty());
        }
    }

    mod capture_tests {
        use super::*;

        #[tokio::test]
        async fn test_scale_two_doubles_size() {
            let rasterizer = StubRasterizer::default();
            let region = Region::new("#post", 100.0, 100.0);
            let settings = CaptureSettings::new().with_scale(2.0);

            let bitmap = capture(&rasterizer, &region, &settings, DEFAULT_CAPTURE_TIMEOUT)
                .await
                .unwrap();
            assert_eq!(bitmap.dimensions(), (200, 200));
        }

        #[tokio::test]
        async fn test_empty_region_skips_rasterizer() {
            let rasterizer = StubRasterizer::default();
            let region = Region::new("#hidden", 0.0, 50.0);

            let err = capture(&rasterizer, &region, &CaptureSettings::new(), DEFAULT_CAPTURE_TIMEOUT)
                .await
                .unwrap_err();
            assert!(matches!(err, CaptureError::EmptyTarget { .. }));
            assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn test_invalid_scale() {
            let rasterizer = StubRasterizer::default();
            let region = Region::new("#post", 10.0, 10.0);
            for scale in [0.0, -1.0, f64::INFINITY] {
                let settings = CaptureSettings::new().with_scale(scale);
                let err = capture(&rasterizer, &region, &settings, DEFAULT_CAPTURE_TIMEOUT)
                    .await
                    .unwrap_err();
                assert!(matches!(err, CaptureError::InvalidScale { .. }));
            }
            assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn test_tiny_region_rounding_to_zero_is_empty() {
            let rasterizer = StubRasterizer::default();
            let region = Region::new("#dot", 0.1, 0.1);
            let err = capture(&rasterizer, &region, &CaptureSettings::new().with_scale(1.0), DEFAULT_CAPTURE_TIMEOUT)
                .await
                .unwrap_err();
            assert!(matches!(err, CaptureError::EmptyTarget { .. }));
        }

        #[tokio::test]
        async fn test_oversized_region_skips_rasterizer() {
            let rasterizer = StubRasterizer::default();
            let settings = CaptureSettings::new().with_scale(1.0).with_background(false);
            let region = Region::new("#big", 5e9, 5e9);
            let err = capture(&rasterizer, &region, &settings, DEFAULT_CAPTURE_TIMEOUT)
                .await
                .unwrap_err();
            assert!(matches!(err, CaptureError::TooLarge { max: MAX_DIMENSION, .. }));

            let region = Region::new("#post", 20_000.0, 10.0);
            let err = capture(&rasterizer, &region, &settings.with_scale(2.0), DEFAULT_CAPTURE_TIMEOUT)
                .await
                .unwrap_err();
            assert!(matches!(err, CaptureError::TooLarge { width: 40_000, height: 20, .. }));
            assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn test_size_mismatch_detected() {
            let rasterizer = StubRasterizer {
                fixed_size: Some((100, 100)),
                ..Default::default()
            };
            let region = Region::new("#post", 100.0, 100.0);
            let err = capture(&rasterizer, &region, &CaptureSettings::new().with_scale(2.0), DEFAULT_CAPTURE_TIMEOUT)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                CaptureError::SizeMismatch {
                    expected_width: 200,
                    actual_width: 100,
                    ..
                }
            ));
        }

        #[tokio::test]
        async fn test_timeout() {
            let rasterizer = StubRasterizer {
                delay: Some(Duration::from_secs(5)),
                ..Default::default()
            };
            let region = Region::new("#slow", 10.0, 10.0);
            let err = capture(&rasterizer, &region, &CaptureSettings::new(), Duration::from_millis(20))
                .await
                .unwrap_err();
            assert!(matches!(err, CaptureError::Timeout { ms: 20, .. }));
        }

        #[tokio::test]
        async fn test_background_flag_reaches_rasterizer() {
            let rasterizer = StubRasterizer::default();
            let region = Region::new("#post", 4.0, 4.0);
            let settings = CaptureSettings::new().with_scale(1.0).with_background(false);

            let bitmap = capture(&rasterizer, &region, &settings, DEFAULT_CAPTURE_TIMEOUT)
                .await
                .unwrap();
            assert_eq!(bitmap.transparent_pixel_count(), 16);
        }
    }
}
