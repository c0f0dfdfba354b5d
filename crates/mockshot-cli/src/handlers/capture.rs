//! Capture command handler

use super::{file_stem, resolve_format, write_artifact};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::CaptureArgs;
use mockshot::{
    CaptureSettings, ExportSettings, MockshotConfig, MockupPipeline, Rasterizer, Region, Scene,
    SceneRasterizer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Capture settings from the config defaults overlaid with the flags
#[must_use]
pub fn capture_settings(defaults: CaptureSettings, args: &CaptureArgs) -> CaptureSettings {
    let format = resolve_format(
        args.format.map(Into::into),
        args.output.as_deref(),
        defaults.format,
    );
    let mut settings = defaults.with_format(format);
    if let Some(scale) = args.scale {
        settings = settings.with_scale(scale);
    }
    if let Some(quality) = args.quality {
        settings = settings.with_quality(quality);
    }
    if args.no_background {
        settings = settings.with_background(false);
    }
    let composite = args.composite.apply(settings.composite_settings());
    settings
        .with_padding(composite.padding)
        .with_border_radius(composite.border_radius)
        .with_shadow(composite.shadow)
}

/// Execute the capture command
pub async fn execute_capture(
    engine: &MockshotConfig,
    args: &CaptureArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<PathBuf> {
    #[cfg(feature = "browser")]
    if let Some(url) = args.url.as_deref() {
        return execute_page_capture(engine, args, url, reporter).await;
    }

    let scene_path = args
        .scene
        .as_deref()
        .ok_or_else(|| CliError::invalid_argument("a scene file is required"))?;
    let scene = Scene::load(scene_path)?;
    let stem = file_stem(scene_path);
    let region = scene.region(stem.clone());
    let settings = capture_settings(engine.capture, args);
    tracing::info!(scene = %scene_path.display(), format = %settings.format, scale = settings.scale, "capturing scene");

    let rasterizer = SceneRasterizer::new().with_scene(stem.clone(), scene);
    let pipeline = MockupPipeline::from_config(Arc::new(rasterizer), engine);
    export_capture(&pipeline, &region, &settings, stem, args.output.as_deref(), reporter).await
}

/// Capture the element matching `--selector` on a live page
#[cfg(feature = "browser")]
async fn execute_page_capture(
    engine: &MockshotConfig,
    args: &CaptureArgs,
    url: &str,
    reporter: &mut ProgressReporter,
) -> CliResult<PathBuf> {
    use mockshot::{ChromiumRasterizer, ChromiumRasterizerConfig, MockshotError};

    let selector = args
        .selector
        .as_deref()
        .ok_or_else(|| CliError::invalid_argument("--url needs --selector"))?;
    let settings = capture_settings(engine.capture, args);
    tracing::info!(url, selector, format = %settings.format, scale = settings.scale, "capturing page element");

    let mut config = ChromiumRasterizerConfig::new(url);
    if args.no_sandbox {
        config = config.with_no_sandbox();
    }
    let rasterizer = ChromiumRasterizer::launch(config)
        .await
        .map_err(MockshotError::from)?;
    let region = rasterizer.region(selector).await.map_err(MockshotError::from)?;
    let pipeline = MockupPipeline::from_config(Arc::new(rasterizer), engine);
    export_capture(
        &pipeline,
        &region,
        &settings,
        selector_stem(selector),
        args.output.as_deref(),
        reporter,
    )
    .await
}

/// Filename stem for a CSS selector: `#chat .bubble` becomes `chat-bubble`
#[cfg(feature = "browser")]
fn selector_stem(selector: &str) -> String {
    let stem = selector
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if stem.is_empty() {
        "capture".to_string()
    } else {
        stem
    }
}

async fn export_capture<R>(
    pipeline: &MockupPipeline<R>,
    region: &Region,
    settings: &CaptureSettings,
    stem: String,
    output: Option<&Path>,
    reporter: &mut ProgressReporter,
) -> CliResult<PathBuf>
where
    R: Rasterizer + ?Sized,
{
    reporter.start_progress("Capturing");
    let export = ExportSettings::from_capture(settings).with_file_stem(stem);
    let artifact = match pipeline.export_region_with(region, settings, &export, reporter).await {
        Ok(artifact) => artifact,
        Err(e) => {
            reporter.abandon("failed");
            return Err(e.into());
        }
    };
    reporter.finish("done");

    let path = write_artifact(&artifact, output)?;
    reporter.artifact(&artifact, &path);
    Ok(path)
}
