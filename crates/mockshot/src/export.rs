//! Export orchestration: composite every frame, encode, report progress.
//!
//! Two entry points share one frame loop:
//!
//! - [`Exporter::export_artifact`] takes a ready [`FrameSequence`] and runs
//!   to completion.
//! - [`AnimatedExport`] pulls frames from any [`FrameSource`] and checks a
//!   [`CancellationToken`] before each one. A cancelled session keeps its
//!   position; the next [`AnimatedExport::run`] resumes with the first frame
//!   that was not yet handed to the encoder.
//!
//! Progress is reported in percent and never decreases within a session:
//! frames account for the first 90 % (50 % for stills), `100` is reported
//! once the artifact is complete.

use crate::bitmap::{Frame, FrameSequence, RasterBitmap};
use crate::capture::{capture, Rasterizer, Region};
use crate::composite::{composite_owned, MAX_DIMENSION};
use crate::encode::{
    AnimationEncoder, AnimationParams, AnimationSink, GifAnimationEncoder, ImageStillEncoder,
    MjpegMp4Encoder, StillEncoder,
};
use crate::result::{EncodeError, ExportError, MockshotResult};
use crate::settings::{CaptureSettings, ExportFormat, ExportSettings};
use async_trait::async_trait;
use base64::Engine;
use chrono::NaiveDateTime;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Receives export progress in percent (0-100)
pub trait ProgressSink {
    /// New progress value
    fn report(&mut self, percent: u8);

    /// The export failed; forget any progress shown so far
    fn reset(&mut self) {}
}

impl<F: FnMut(u8)> ProgressSink for F {
    fn report(&mut self, percent: u8) {
        self(percent);
    }
}

/// Progress sink that drops every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Cooperative cancellation flag, shared between the UI and an export
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect before the next frame
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so a session can be resumed
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Where an export pulls its frames from
#[async_trait]
pub trait FrameSource: Send {
    /// Total number of frames
    fn len(&self) -> usize;

    /// True when there is nothing to export
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produce frame `index`; each index is requested at most once per export
    async fn frame(&mut self, index: usize) -> MockshotResult<Frame>;
}

/// Frames rasterized ahead of time, handed out by value
#[derive(Debug, Clone, Default)]
pub struct PreparedFrames {
    slots: Vec<Option<Frame>>,
}

impl From<FrameSequence> for PreparedFrames {
    fn from(frames: FrameSequence) -> Self {
        Self {
            slots: frames.into_frames().into_iter().map(Some).collect(),
        }
    }
}

#[async_trait]
impl FrameSource for PreparedFrames {
    fn len(&self) -> usize {
        self.slots.len()
    }

    async fn frame(&mut self, index: usize) -> MockshotResult<Frame> {
        self.slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| ExportError::FrameUnavailable { index }.into())
    }
}

/// Frames captured on demand, one region per frame
#[derive(Debug)]
pub struct CaptureSequence<R: ?Sized> {
    rasterizer: Arc<R>,
    regions: Vec<(Region, u32)>,
    settings: CaptureSettings,
    timeout: Duration,
}

impl<R: Rasterizer + ?Sized> CaptureSequence<R> {
    /// Create an empty sequence over `rasterizer`
    #[must_use]
    pub fn new(rasterizer: Arc<R>, settings: CaptureSettings, timeout: Duration) -> Self {
        Self {
            rasterizer,
            regions: Vec::new(),
            settings,
            timeout,
        }
    }

    /// Append a region shown for `delay_ms`
    #[must_use]
    pub fn with_region(mut self, region: Region, delay_ms: u32) -> Self {
        self.regions.push((region, delay_ms));
        self
    }

    /// Append a region shown for `delay_ms`
    pub fn push(&mut self, region: Region, delay_ms: u32) {
        self.regions.push((region, delay_ms));
    }
}

#[async_trait]
impl<R: Rasterizer + ?Sized> FrameSource for CaptureSequence<R> {
    fn len(&self) -> usize {
        self.regions.len()
    }

    async fn frame(&mut self, index: usize) -> MockshotResult<Frame> {
        let (region, delay_ms) = self
            .regions
            .get(index)
            .ok_or(ExportError::FrameUnavailable { index })?;
        let bitmap = capture(&*self.rasterizer, region, &self.settings, self.timeout).await?;
        Ok(Frame::new(bitmap, *delay_ms))
    }
}

/// An encoded file, owned by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Encoded bytes
    pub bytes: Vec<u8>,
    /// Format of `bytes`
    pub format: ExportFormat,
    /// MIME type of `bytes`
    pub mime_type: &'static str,
    /// Suggested download name
    pub filename: String,
    /// Pixel width of the output
    pub width: u32,
    /// Pixel height of the output
    pub height: u32,
    /// Frames in the output
    pub frame_count: usize,
}

impl ExportArtifact {
    /// Encoded size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// `data:` URL for previews and clipboard fallbacks
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Write to `dir/<filename>` and return the path
    pub fn save(&self, dir: &Path) -> MockshotResult<PathBuf> {
        let path = dir.join(&self.filename);
        self.save_as(&path)?;
        Ok(path)
    }

    /// Write to an explicit path
    pub fn save_as(&self, path: &Path) -> MockshotResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// `"{stem}-{YYYYMMDD-HHMMSS}.{ext}"`; unsafe filename characters become `-`
#[must_use]
pub fn suggested_filename(stem: &str, format: ExportFormat, at: NaiveDateTime) -> String {
    let stem: String = stem
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "mockup" } else { stem.as_str() };
    format!(
        "{stem}-{}.{}",
        at.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// How a session run ended
#[derive(Debug)]
pub enum ExportOutcome {
    /// All frames encoded
    Completed(ExportArtifact),
    /// Stopped between frames; the session can be resumed
    Cancelled {
        /// Frames handed to the encoder so far
        frames_encoded: usize,
    },
}

impl ExportOutcome {
    /// The artifact, if the run completed
    #[must_use]
    pub fn into_artifact(self) -> Option<ExportArtifact> {
        match self {
            Self::Completed(artifact) => Some(artifact),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Drives still and animation encoders
pub struct Exporter {
    still: Box<dyn StillEncoder>,
    animation: Vec<Box<dyn AnimationEncoder>>,
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("animation_encoders", &self.animation.len())
            .finish_non_exhaustive()
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(ImageStillEncoder::new())
    }
}

impl Exporter {
    /// Exporter with `still` and the built-in GIF and MP4 encoders
    #[must_use]
    pub fn new(still: impl StillEncoder + 'static) -> Self {
        Self {
            still: Box::new(still),
            animation: vec![
                Box::new(GifAnimationEncoder::new()),
                Box::new(MjpegMp4Encoder::new()),
            ],
        }
    }

    /// Replace the still encoder
    #[must_use]
    pub fn with_still_encoder(mut self, still: impl StillEncoder + 'static) -> Self {
        self.still = Box::new(still);
        self
    }

    /// Add an animation encoder; it takes precedence over the ones already present
    #[must_use]
    pub fn with_animation_encoder(mut self, encoder: impl AnimationEncoder + 'static) -> Self {
        self.animation.insert(0, Box::new(encoder));
        self
    }

    fn animation_encoder(&self, format: ExportFormat) -> Result<&dyn AnimationEncoder, EncodeError> {
        self.animation
            .iter()
            .find(|encoder| encoder.supports(format))
            .map(|encoder| &**encoder)
            .ok_or_else(|| EncodeError::unsupported(format.to_string(), "no encoder registered"))
    }

    /// Composite, encode and package `frames`.
    ///
    /// The request is validated before any encoder call or progress report.
    #[tracing::instrument(skip_all, fields(format = %settings.format, frames = frames.len()))]
    pub async fn export_artifact<P>(
        &self,
        frames: FrameSequence,
        settings: &ExportSettings,
        progress: &mut P,
    ) -> MockshotResult<ExportArtifact>
    where
        P: ProgressSink + ?Sized,
    {
        validate_sequence(&frames, settings)?;
        let mut session = self.animated(PreparedFrames::from(frames), settings.clone())?;
        match session.run(&CancellationToken::new(), progress).await? {
            ExportOutcome::Completed(artifact) => Ok(artifact),
            ExportOutcome::Cancelled { frames_encoded } => {
                Err(ExportError::Cancelled { frames_encoded }.into())
            }
        }
    }

    /// Open a resumable session over `source`
    pub fn animated<S: FrameSource>(
        &self,
        source: S,
        settings: ExportSettings,
    ) -> MockshotResult<AnimatedExport<'_, S>> {
        let count = source.len();
        if count == 0 {
            return Err(ExportError::EmptySequence.into());
        }
        validate_target(&settings)?;
        if !settings.format.is_animated() && count > 1 {
            return Err(ExportError::TooManyFrames {
                format: settings.format.to_string(),
                count,
            }
            .into());
        }
        if settings.format.is_animated() {
            self.animation_encoder(settings.format)?;
        }
        Ok(AnimatedExport {
            exporter: self,
            source,
            settings,
            sink: None,
            still: None,
            size: None,
            next_index: 0,
            closed: false,
        })
    }
}

fn validate_target(settings: &ExportSettings) -> Result<(), ExportError> {
    let out_of_range = |side: Option<u32>| matches!(side, Some(v) if v == 0 || v > MAX_DIMENSION);
    if out_of_range(settings.width) || out_of_range(settings.height) {
        return Err(ExportError::InvalidDimensions {
            width: settings.width.unwrap_or_default(),
            height: settings.height.unwrap_or_default(),
        });
    }
    Ok(())
}

/// One-sided targets scale the other side, so the final size needs its own check
fn validate_output_size(width: u32, height: u32) -> Result<(), ExportError> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ExportError::InvalidDimensions { width, height });
    }
    Ok(())
}

fn validate_sequence(frames: &FrameSequence, settings: &ExportSettings) -> Result<(), ExportError> {
    if frames.is_empty() {
        return Err(ExportError::EmptySequence);
    }
    validate_target(settings)?;
    if let Some(frame) = frames.iter().find(|f| f.bitmap.is_empty()) {
        return Err(ExportError::InvalidDimensions {
            width: frame.bitmap.width(),
            height: frame.bitmap.height(),
        });
    }
    if !settings.format.is_animated() && frames.len() > 1 {
        return Err(ExportError::TooManyFrames {
            format: settings.format.to_string(),
            count: frames.len(),
        });
    }
    Ok(())
}

/// Frame-by-frame export with cooperative cancellation.
///
/// Completed and failed sessions are closed; running them again returns
/// [`ExportError::SessionClosed`].
pub struct AnimatedExport<'e, S> {
    exporter: &'e Exporter,
    source: S,
    settings: ExportSettings,
    sink: Option<Box<dyn AnimationSink>>,
    still: Option<RasterBitmap>,
    size: Option<(u32, u32)>,
    next_index: usize,
    closed: bool,
}

impl<S> fmt::Debug for AnimatedExport<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimatedExport")
            .field("format", &self.settings.format)
            .field("next_index", &self.next_index)
            .field("size", &self.size)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<S: FrameSource> AnimatedExport<'_, S> {
    /// Frames handed to the encoder so far
    #[must_use]
    pub const fn frames_encoded(&self) -> usize {
        self.next_index
    }

    /// Total frames in the source
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.source.len()
    }

    /// Whether the session completed or failed
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Encode frames until done or cancelled
    pub async fn run<P>(
        &mut self,
        token: &CancellationToken,
        progress: &mut P,
    ) -> MockshotResult<ExportOutcome>
    where
        P: ProgressSink + ?Sized,
    {
        if self.closed {
            return Err(ExportError::SessionClosed.into());
        }
        match self.drive(token, progress).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::warn!(error = %err, frame = self.next_index, "export failed");
                self.closed = true;
                progress.reset();
                Err(err)
            }
        }
    }

    async fn drive<P>(
        &mut self,
        token: &CancellationToken,
        progress: &mut P,
    ) -> MockshotResult<ExportOutcome>
    where
        P: ProgressSink + ?Sized,
    {
        let total = self.source.len();
        let span = if self.settings.format.is_animated() { 90 } else { 50 };

        while self.next_index < total {
            if token.is_cancelled() {
                tracing::info!(frames_encoded = self.next_index, total, "export cancelled");
                return Ok(ExportOutcome::Cancelled {
                    frames_encoded: self.next_index,
                });
            }
            self.step(self.next_index).await?;
            self.next_index += 1;
            progress.report((span * self.next_index / total) as u8);
        }

        let artifact = self.finish().await?;
        self.closed = true;
        progress.report(100);
        tracing::info!(
            bytes = artifact.size_bytes(),
            frames = artifact.frame_count,
            filename = %artifact.filename,
            "export complete"
        );
        Ok(ExportOutcome::Completed(artifact))
    }

    async fn step(&mut self, index: usize) -> MockshotResult<()> {
        let frame = self.source.frame(index).await?;
        if frame.bitmap.is_empty() {
            return Err(ExportError::InvalidDimensions {
                width: frame.bitmap.width(),
                height: frame.bitmap.height(),
            }
            .into());
        }

        let composited = composite_owned(frame.bitmap, &self.settings.composite)?;
        let (width, height) = match self.size {
            Some(size) => size,
            None => {
                let (width, height) =
                    self.settings.target_size(composited.width(), composited.height());
                validate_output_size(width, height)?;
                self.size = Some((width, height));
                (width, height)
            }
        };
        let bitmap = composited.resized(width, height);
        let delay = self.settings.effective_delay(frame.delay_ms);

        if !self.settings.format.is_animated() {
            self.still = Some(bitmap);
            return Ok(());
        }

        if self.sink.is_none() {
            let params = AnimationParams::from_settings(&self.settings, width, height);
            let encoder = self.exporter.animation_encoder(self.settings.format)?;
            self.sink = Some(encoder.begin(&params)?);
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.push_frame(&bitmap, delay).await?;
        }
        tracing::debug!(index, width, height, delay, "frame encoded");
        Ok(())
    }

    async fn finish(&mut self) -> MockshotResult<ExportArtifact> {
        let format = self.settings.format;
        let bytes = if format.is_animated() {
            let sink = self
                .sink
                .as_mut()
                .ok_or_else(|| EncodeError::encoder("animation was never started"))?;
            sink.finish().await?
        } else {
            let bitmap = self
                .still
                .take()
                .ok_or(ExportError::FrameUnavailable { index: 0 })?;
            self.exporter
                .still
                .encode_still(&bitmap, format, self.settings.quality)
                .await?
        };
        let (width, height) = self.size.unwrap_or_default();

        Ok(ExportArtifact {
            bytes,
            format,
            mime_type: format.mime_type(),
            filename: suggested_filename(
                &self.settings.file_stem,
                format,
                chrono::Local::now().naive_local(),
            ),
            width,
            height,
            frame_count: self.next_index,
        })
    }
}
