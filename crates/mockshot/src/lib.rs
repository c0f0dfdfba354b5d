//! Mockshot: capture, composite and export engine for chat and social-media
//! mockups.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Rasterizer  │───►│  Composite   │───►│   Encoders   │───►│   Artifact   │
//! │ (scene, CDP) │    │ pad/clip/drop│    │ png jpg webp │    │ bytes + name │
//! │              │    │    shadow    │    │   gif  mp4   │    │  data URL    │
//! └──────────────┘    └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! Capturing is delegated to a [`Rasterizer`]: [`SceneRasterizer`] paints
//! declarative scenes without a browser, `ChromiumRasterizer` (feature
//! `browser`) screenshots DOM elements through the DevTools protocol.
//!
//! ```no_run
//! use mockshot::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo() -> MockshotResult<()> {
//! let rasterizer = SceneRasterizer::new().with_scene("#post", Scene::new(400.0, 300.0));
//! let pipeline = MockupPipeline::new(Arc::new(rasterizer));
//! let settings = CaptureSettings::new().with_padding(32).with_shadow(true);
//!
//! let artifact = pipeline
//!     .export_region(&Region::new("#post", 400.0, 300.0), &settings, &mut NoProgress)
//!     .await?;
//! artifact.save(std::path::Path::new("out"))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Owned RGBA bitmaps and frame sequences
pub mod bitmap;

/// Region capture through pluggable rasterizers
#[allow(clippy::missing_errors_doc)]
pub mod capture;

/// Padding, rounded clip and drop shadow
pub mod composite;

/// Engine configuration files
#[allow(clippy::missing_errors_doc)]
pub mod config;

/// Still and animation encoders
#[allow(clippy::missing_errors_doc)]
pub mod encode;

/// Size and duration estimates
pub mod estimate;

/// Export sessions, progress and cancellation
#[allow(clippy::missing_errors_doc)]
pub mod export;

mod geometry;

/// Capture-composite-export facade
#[allow(clippy::missing_errors_doc)]
pub mod pipeline;

mod result;

/// Capture and export settings
pub mod settings;

pub use bitmap::{Frame, FrameSequence, RasterBitmap};
#[cfg(feature = "browser")]
pub use capture::{ChromiumRasterizer, ChromiumRasterizerConfig};
pub use capture::{
    capture, Rasterizer, Region, Scene, SceneElement, SceneRasterizer, DEFAULT_CAPTURE_TIMEOUT,
};
pub use composite::{composite, composite_owned, CompositeResult, MAX_DIMENSION};
pub use config::MockshotConfig;
pub use encode::{
    AnimationEncoder, AnimationParams, AnimationSink, CompressionLevel, GifAnimationEncoder,
    ImageStillEncoder, MjpegMp4Encoder, StillEncoder,
};
pub use estimate::{
    estimate_file_size, estimate_gif_duration_ms, estimate_video_duration_secs,
    estimate_video_size, format_bytes, ExportEstimate,
};
pub use export::{
    suggested_filename, AnimatedExport, CancellationToken, CaptureSequence, ExportArtifact,
    ExportOutcome, Exporter, FrameSource, NoProgress, PreparedFrames, ProgressSink,
};
pub use pipeline::MockupPipeline;
pub use result::{
    CaptureError, CompositeError, EncodeError, ExportError, MockshotError, MockshotResult,
};
pub use settings::{CaptureSettings, CompositeSettings, ExportFormat, ExportSettings};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::bitmap::*;
    pub use super::capture::*;
    pub use super::composite::{composite, composite_owned, CompositeResult};
    pub use super::config::*;
    pub use super::estimate::*;
    pub use super::export::*;
    pub use super::pipeline::*;
    pub use super::result::*;
    pub use super::settings::*;
}
