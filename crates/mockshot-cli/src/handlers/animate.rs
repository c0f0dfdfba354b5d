//! Animate command handler

use super::{file_stem, load_image, resolve_format, write_artifact};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::AnimateArgs;
use mockshot::{
    CancellationToken, ExportFormat, ExportOutcome, ExportSettings, Frame, FrameSequence,
    MockshotConfig, PreparedFrames,
};
use std::path::PathBuf;

/// Export settings from the config defaults overlaid with the flags
pub fn animation_settings(engine: &MockshotConfig, args: &AnimateArgs) -> CliResult<ExportSettings> {
    let fallback = if engine.export.format.is_animated() {
        engine.export.format
    } else {
        ExportFormat::Gif
    };
    let format = resolve_format(args.format.map(Into::into), args.output.as_deref(), fallback);
    if !format.is_animated() {
        return Err(CliError::invalid_argument(format!(
            "animate writes GIF or MP4, not {format}"
        )));
    }

    let mut settings = engine
        .export
        .clone()
        .with_format(format)
        .with_composite(args.composite.apply(engine.export.composite));
    if let Some(stem) = args.frames.first() {
        settings = settings.with_file_stem(file_stem(stem));
    }
    if let Some(fps) = args.fps {
        settings = settings.with_frame_rate(fps);
    }
    if let Some(delay) = args.delay {
        settings = settings.with_frame_delay(delay);
    }
    if let Some(count) = args.loop_count {
        settings = settings.with_loop_count(count);
    }
    if let Some(quality) = args.quality {
        settings = settings.with_quality(quality);
    }
    if let Some(width) = args.width {
        settings = settings.with_width(width);
    }
    if let Some(height) = args.height {
        settings = settings.with_height(height);
    }
    Ok(settings)
}

/// Execute the animate command.
///
/// Ctrl-C cancels between frames; nothing is written for a cancelled export.
pub async fn execute_animate(
    engine: &MockshotConfig,
    args: &AnimateArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<PathBuf> {
    let settings = animation_settings(engine, args)?;
    let frames = args
        .frames
        .iter()
        .map(|path| load_image(path).map(|bitmap| Frame::new(bitmap, 0)))
        .collect::<CliResult<FrameSequence>>()?;
    tracing::info!(frames = frames.len(), format = %settings.format, "exporting animation");

    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling export");
                token.cancel();
            }
        })
    };

    let exporter = engine.exporter();
    reporter.start_progress(&format!("Encoding {}", settings.format));
    let (outcome, total) = match exporter.animated(PreparedFrames::from(frames), settings) {
        Ok(mut session) => {
            let total = session.total_frames();
            (session.run(&token, reporter).await, total)
        }
        Err(e) => (Err(e), 0),
    };
    watcher.abort();

    match outcome {
        Ok(ExportOutcome::Completed(artifact)) => {
            reporter.finish("done");
            let path = write_artifact(&artifact, args.output.as_deref())?;
            reporter.artifact(&artifact, &path);
            Ok(path)
        }
        Ok(ExportOutcome::Cancelled { frames_encoded }) => {
            reporter.abandon("cancelled");
            Err(CliError::export(format!(
                "cancelled after {frames_encoded} of {total} frames"
            )))
        }
        Err(e) => {
            reporter.abandon("failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::{AnimationFormatArg, CompositeOpts};
    use mockshot::{ImageStillEncoder, RasterBitmap, StillEncoder};
    use std::path::Path;

    fn args(frames: Vec<PathBuf>, output: Option<PathBuf>) -> AnimateArgs {
        AnimateArgs {
            frames,
            output,
            format: None,
            fps: None,
            delay: None,
            loop_count: None,
            quality: None,
            width: None,
            height: None,
            composite: CompositeOpts::default(),
        }
    }

    async fn write_frames(dir: &Path, count: u8) -> Vec<PathBuf> {
        let encoder = ImageStillEncoder::new();
        let mut paths = Vec::new();
        for i in 0..count {
            let bitmap = RasterBitmap::filled(32, 24, [i.wrapping_mul(40), 100, 200, 255]);
            let bytes = encoder.encode_still(&bitmap, ExportFormat::Png, 100).await.unwrap();
            let path = dir.join(format!("frame-{i}.png"));
            std::fs::write(&path, bytes).unwrap();
            paths.push(path);
        }
        paths
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_format_from_output_extension() {
            let a = args(vec![PathBuf::from("a.png")], Some(PathBuf::from("out.mp4")));
            let settings = animation_settings(&MockshotConfig::default(), &a).unwrap();
            assert_eq!(settings.format, ExportFormat::Mp4);
            assert_eq!(settings.file_stem, "a");
        }

        #[test]
        fn test_still_output_rejected() {
            let a = args(vec![PathBuf::from("a.png")], Some(PathBuf::from("out.png")));
            assert!(matches!(
                animation_settings(&MockshotConfig::default(), &a),
                Err(CliError::InvalidArgument { .. })
            ));
        }

        #[test]
        fn test_flags_override_config() {
            let mut a = args(vec![PathBuf::from("a.png")], None);
            a.format = Some(AnimationFormatArg::Gif);
            a.delay = Some(250);
            a.loop_count = Some(3);
            a.width = Some(100);
            let settings = animation_settings(&MockshotConfig::default(), &a).unwrap();
            assert_eq!(settings.format, ExportFormat::Gif);
            assert_eq!(settings.frame_delay_ms, 250);
            assert_eq!(settings.loop_count, 3);
            assert_eq!(settings.width, Some(100));
            assert_eq!(settings.height, None);
        }
    }

    mod export_tests {
        use super::*;

        #[tokio::test]
        async fn test_gif_from_frames() {
            let dir = tempfile::tempdir().unwrap();
            let frames = write_frames(dir.path(), 4).await;
            let output = dir.path().join("anim.gif");

            let mut reporter = ProgressReporter::new(false, true);
            let path = execute_animate(&MockshotConfig::default(), &args(frames, Some(output.clone())), &mut reporter)
                .await
                .unwrap();
            assert_eq!(path, output);

            let bytes = std::fs::read(&output).unwrap();
            assert_eq!(&bytes[..6], b"GIF89a");
        }

        #[tokio::test]
        async fn test_mp4_from_frames() {
            let dir = tempfile::tempdir().unwrap();
            let frames = write_frames(dir.path(), 3).await;
            let output = dir.path().join("anim.mp4");

            let mut reporter = ProgressReporter::new(false, true);
            execute_animate(&MockshotConfig::default(), &args(frames, Some(output.clone())), &mut reporter)
                .await
                .unwrap();

            let bytes = std::fs::read(&output).unwrap();
            assert_eq!(&bytes[4..8], b"ftyp");
        }

        #[tokio::test]
        async fn test_unreadable_frame_fails_before_encoding() {
            let dir = tempfile::tempdir().unwrap();
            let output = dir.path().join("anim.gif");
            let missing = vec![dir.path().join("missing.png")];

            let mut reporter = ProgressReporter::new(false, true);
            let err = execute_animate(&MockshotConfig::default(), &args(missing, Some(output.clone())), &mut reporter)
                .await
                .unwrap_err();
            assert!(matches!(err, CliError::Io(_)));
            assert!(!output.exists());
        }
    }
}
