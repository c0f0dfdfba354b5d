//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use mockshot::{CompositeSettings, ExportFormat};
use std::path::PathBuf;

/// Mockshot: render, composite and export chat and social-media mockups
#[derive(Parser, Debug)]
#[command(name = "mockshot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Engine config file (.yaml, .yml or .json)
    #[arg(long, global = true, env = "MOCKSHOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a scene file and export it as an image
    Capture(CaptureArgs),

    /// Pad, round and shadow an existing image
    Composite(CompositeArgs),

    /// Export image files as an animated GIF or MP4
    Animate(AnimateArgs),

    /// Estimate output size and duration
    Estimate(EstimateArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Post-processing flags shared by every export command
#[derive(Args, Debug, Clone, Default)]
pub struct CompositeOpts {
    /// Padding around the image in pixels
    #[arg(long)]
    pub padding: Option<i32>,

    /// Corner radius in pixels
    #[arg(long)]
    pub radius: Option<i32>,

    /// Add a drop shadow
    #[arg(long)]
    pub shadow: bool,
}

impl CompositeOpts {
    /// Overlay these flags on `base`
    #[must_use]
    pub fn apply(&self, base: CompositeSettings) -> CompositeSettings {
        let mut settings = base;
        if let Some(padding) = self.padding {
            settings = settings.with_padding(padding);
        }
        if let Some(radius) = self.radius {
            settings = settings.with_border_radius(radius);
        }
        if self.shadow {
            settings = settings.with_shadow(true);
        }
        settings
    }
}

/// Arguments for the capture command
#[derive(Parser, Debug, Default)]
pub struct CaptureArgs {
    /// Scene file (.yaml, .yml or .json)
    #[cfg_attr(not(feature = "browser"), arg(required = true))]
    #[cfg_attr(feature = "browser", arg(required_unless_present = "url", conflicts_with = "url"))]
    pub scene: Option<PathBuf>,

    /// Capture an element of a live page through Chromium
    #[cfg(feature = "browser")]
    #[arg(long, requires = "selector")]
    pub url: Option<String>,

    /// CSS selector of the element to capture
    #[cfg(feature = "browser")]
    #[arg(long, requires = "url")]
    pub selector: Option<String>,

    /// Launch Chromium without its sandbox (containers/CI)
    #[cfg(feature = "browser")]
    #[arg(long, requires = "url")]
    pub no_sandbox: bool,

    /// Output file or directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to the output extension, then the config)
    #[arg(short, long)]
    pub format: Option<FormatArg>,

    /// Device-pixel scale
    #[arg(long)]
    pub scale: Option<f64>,

    /// Quality for lossy formats (0.0-1.0)
    #[arg(long)]
    pub quality: Option<f32>,

    /// Leave the page background transparent
    #[arg(long)]
    pub no_background: bool,

    /// Post-processing
    #[command(flatten)]
    pub composite: CompositeOpts,
}

/// Arguments for the composite command
#[derive(Parser, Debug)]
pub struct CompositeArgs {
    /// Input image (PNG, JPEG, WebP or GIF)
    pub input: PathBuf,

    /// Output file or directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to the output extension, then PNG)
    #[arg(short, long)]
    pub format: Option<FormatArg>,

    /// Quality for lossy formats (1-100)
    #[arg(long)]
    pub quality: Option<u8>,

    /// Post-processing
    #[command(flatten)]
    pub composite: CompositeOpts,
}

/// Arguments for the animate command
#[derive(Parser, Debug)]
pub struct AnimateArgs {
    /// Frame images, in order
    #[arg(required = true)]
    pub frames: Vec<PathBuf>,

    /// Output file or directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to the output extension, then GIF)
    #[arg(short, long)]
    pub format: Option<AnimationFormatArg>,

    /// Frame rate for MP4
    #[arg(long)]
    pub fps: Option<u8>,

    /// Delay between GIF frames in milliseconds
    #[arg(long)]
    pub delay: Option<u32>,

    /// GIF loop count (0 = infinite)
    #[arg(long)]
    pub loop_count: Option<u16>,

    /// Quality (1-100)
    #[arg(long)]
    pub quality: Option<u8>,

    /// Output width; height follows unless also given
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height; width follows unless also given
    #[arg(long)]
    pub height: Option<u32>,

    /// Post-processing
    #[command(flatten)]
    pub composite: CompositeOpts,
}

/// Arguments for the estimate command
#[derive(Parser, Debug)]
pub struct EstimateArgs {
    /// Frame width in pixels
    #[arg(long)]
    pub width: u32,

    /// Frame height in pixels
    #[arg(long)]
    pub height: u32,

    /// Output format
    #[arg(short, long, default_value = "png")]
    pub format: FormatArg,

    /// Number of frames
    #[arg(long, default_value = "1")]
    pub frames: usize,

    /// Quality (1-100)
    #[arg(long)]
    pub quality: Option<u8>,

    /// Frame rate for MP4
    #[arg(long)]
    pub fps: Option<u8>,

    /// Delay between GIF frames in milliseconds
    #[arg(long)]
    pub delay: Option<u32>,

    /// Video bitrate in kbps
    #[arg(long)]
    pub bitrate: Option<u32>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print only where the configuration comes from
    #[arg(long)]
    pub path: bool,

    /// Print JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

/// Output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    /// PNG image
    Png,
    /// JPEG image
    #[value(alias = "jpg")]
    Jpeg,
    /// WebP image
    Webp,
    /// Animated GIF
    Gif,
    /// MP4 video
    Mp4,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => Self::Png,
            FormatArg::Jpeg => Self::Jpeg,
            FormatArg::Webp => Self::Webp,
            FormatArg::Gif => Self::Gif,
            FormatArg::Mp4 => Self::Mp4,
        }
    }
}

/// Animation output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AnimationFormatArg {
    /// Animated GIF
    #[default]
    Gif,
    /// MP4 video
    Mp4,
}

impl From<AnimationFormatArg> for ExportFormat {
    fn from(arg: AnimationFormatArg) -> Self {
        match arg {
            AnimationFormatArg::Gif => Self::Gif,
            AnimationFormatArg::Mp4 => Self::Mp4,
        }
    }
}

/// Color output argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
