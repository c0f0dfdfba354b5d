//! Composite command handler

use super::{file_stem, load_image, resolve_format, write_artifact};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::CompositeArgs;
use mockshot::{ExportFormat, ExportSettings, FrameSequence, MockshotConfig};
use std::path::PathBuf;

/// Export settings for compositing one image
pub fn composite_export_settings(
    engine: &MockshotConfig,
    args: &CompositeArgs,
) -> CliResult<ExportSettings> {
    let format = resolve_format(
        args.format.map(Into::into),
        args.output.as_deref(),
        ExportFormat::Png,
    );
    if format.is_animated() {
        return Err(CliError::invalid_argument(format!(
            "composite writes still images; use `animate` for {format}"
        )));
    }
    let mut settings = ExportSettings::new(format)
        .with_quality(engine.capture.export_quality())
        .with_composite(args.composite.apply(engine.capture.composite_settings()))
        .with_file_stem(file_stem(&args.input));
    if let Some(quality) = args.quality {
        settings = settings.with_quality(quality);
    }
    Ok(settings)
}

/// Execute the composite command
pub async fn execute_composite(
    engine: &MockshotConfig,
    args: &CompositeArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<PathBuf> {
    let settings = composite_export_settings(engine, args)?;
    let bitmap = load_image(&args.input)?;
    tracing::info!(input = %args.input.display(), width = bitmap.width(), height = bitmap.height(), "compositing image");

    reporter.start_progress("Compositing");
    let result = engine
        .exporter()
        .export_artifact(FrameSequence::single(bitmap), &settings, reporter)
        .await;
    let artifact = match result {
        Ok(artifact) => artifact,
        Err(e) => {
            reporter.abandon("failed");
            return Err(e.into());
        }
    };
    reporter.finish("done");

    let path = write_artifact(&artifact, args.output.as_deref())?;
    reporter.artifact(&artifact, &path);
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::{CompositeOpts, FormatArg};
    use mockshot::RasterBitmap;

    fn args(input: PathBuf, output: PathBuf) -> CompositeArgs {
        CompositeArgs {
            input,
            output: Some(output),
            format: None,
            quality: None,
            composite: CompositeOpts {
                padding: Some(20),
                radius: None,
                shadow: false,
            },
        }
    }

    fn write_png(path: &std::path::Path, width: u32, height: u32) {
        let bitmap = RasterBitmap::filled(width, height, [200, 30, 30, 255]);
        let mut bytes = std::io::Cursor::new(Vec::new());
        bitmap
            .as_image()
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        std::fs::write(path, bytes.into_inner()).unwrap();
    }

    #[tokio::test]
    async fn test_padding_offsets_content() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("shot.png");
        write_png(&input, 200, 200);
        let output = dir.path().join("framed.png");

        let mut reporter = ProgressReporter::new(false, true);
        execute_composite(&MockshotConfig::default(), &args(input, output.clone()), &mut reporter)
            .await
            .unwrap();

        let bitmap = RasterBitmap::decode(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(bitmap.dimensions(), (240, 240));
        assert_eq!(bitmap.pixel(0, 0).unwrap()[3], 0);
        assert_eq!(bitmap.pixel(20, 20).unwrap(), [200, 30, 30, 255]);
    }

    #[test]
    fn test_animated_format_rejected() {
        let mut a = args(PathBuf::from("in.png"), PathBuf::from("out.gif"));
        assert!(matches!(
            composite_export_settings(&MockshotConfig::default(), &a),
            Err(CliError::InvalidArgument { .. })
        ));
        a.format = Some(FormatArg::Jpeg);
        let settings = composite_export_settings(&MockshotConfig::default(), &a).unwrap();
        assert_eq!(settings.format, ExportFormat::Jpeg);
        assert_eq!(settings.file_stem, "in");
        assert_eq!(settings.composite.padding, 20);
    }
}
