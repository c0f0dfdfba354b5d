//! One-call facade over capture, composite and export.

use crate::bitmap::{FrameSequence, RasterBitmap};
use crate::capture::{capture, Rasterizer, Region, DEFAULT_CAPTURE_TIMEOUT};
use crate::composite::{composite, CompositeResult};
use crate::config::MockshotConfig;
use crate::export::{AnimatedExport, CaptureSequence, ExportArtifact, Exporter, ProgressSink};
use crate::result::MockshotResult;
use crate::settings::{CaptureSettings, ExportSettings};
use std::sync::Arc;
use std::time::Duration;

/// Capture-to-artifact pipeline bound to one rasterizer
#[derive(Debug)]
pub struct MockupPipeline<R: ?Sized> {
    rasterizer: Arc<R>,
    exporter: Exporter,
    timeout: Duration,
}

impl<R: Rasterizer + ?Sized> MockupPipeline<R> {
    /// Pipeline with default encoders and timeout
    #[must_use]
    pub fn new(rasterizer: Arc<R>) -> Self {
        Self {
            rasterizer,
            exporter: Exporter::default(),
            timeout: DEFAULT_CAPTURE_TIMEOUT,
        }
    }

    /// Pipeline configured from `config`
    #[must_use]
    pub fn from_config(rasterizer: Arc<R>, config: &MockshotConfig) -> Self {
        Self {
            rasterizer,
            exporter: config.exporter(),
            timeout: config.capture_timeout(),
        }
    }

    /// Replace the exporter
    #[must_use]
    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = exporter;
        self
    }

    /// Set the capture timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The exporter in use
    #[must_use]
    pub const fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Rasterize `region`
    pub async fn capture(&self, region: &Region, settings: &CaptureSettings) -> MockshotResult<RasterBitmap> {
        Ok(capture(&*self.rasterizer, region, settings, self.timeout).await?)
    }

    /// Rasterize and post-process `region` for preview
    pub async fn preview(&self, region: &Region, settings: &CaptureSettings) -> MockshotResult<CompositeResult> {
        let bitmap = self.capture(region, settings).await?;
        Ok(composite(&bitmap, &settings.composite_settings())?)
    }

    /// Capture `region` and export it as `settings.format`
    pub async fn export_region<P>(
        &self,
        region: &Region,
        settings: &CaptureSettings,
        progress: &mut P,
    ) -> MockshotResult<ExportArtifact>
    where
        P: ProgressSink + ?Sized,
    {
        self.export_region_with(region, settings, &ExportSettings::from_capture(settings), progress)
            .await
    }

    /// Capture `region` and export it with explicit `export` settings
    /// (file stem, target size, format) instead of ones derived from `settings`
    #[tracing::instrument(skip_all, fields(region = %region.id, format = %export.format))]
    pub async fn export_region_with<P>(
        &self,
        region: &Region,
        settings: &CaptureSettings,
        export: &ExportSettings,
        progress: &mut P,
    ) -> MockshotResult<ExportArtifact>
    where
        P: ProgressSink + ?Sized,
    {
        let bitmap = self.capture(region, settings).await?;
        self.exporter
            .export_artifact(FrameSequence::single(bitmap), export, progress)
            .await
    }

    /// Open a cancellable animated export that captures each region on demand
    pub fn animate(
        &self,
        regions: impl IntoIterator<Item = (Region, u32)>,
        capture_settings: CaptureSettings,
        export_settings: ExportSettings,
    ) -> MockshotResult<AnimatedExport<'_, CaptureSequence<R>>> {
        let mut source = CaptureSequence::new(Arc::clone(&self.rasterizer), capture_settings, self.timeout);
        for (region, delay_ms) in regions {
            source.push(region, delay_ms);
        }
        self.exporter.animated(source, export_settings)
    }
}
