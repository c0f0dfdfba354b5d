//! Output formatting and progress reporting

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use mockshot::{format_bytes, ExportArtifact, ProgressSink};
use std::path::Path;

/// Progress and status reporter writing to stderr
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a percent progress bar
    pub fn start_progress(&mut self, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Current bar position, if a bar is shown
    #[must_use]
    pub fn position(&self) -> Option<u64> {
        self.progress_bar.as_ref().map(ProgressBar::position)
    }

    /// Finish progress bar
    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    /// Drop the progress bar, leaving it where it stopped
    pub fn abandon(&mut self, message: &str) {
        if let Some(pb) = self.progress_bar.take() {
            pb.abandon_with_message(message.to_string());
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always printed, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Report a written artifact
    pub fn artifact(&self, artifact: &ExportArtifact, path: &Path) {
        self.success(&artifact_summary(artifact, path));
    }
}

impl ProgressSink for ProgressReporter {
    fn report(&mut self, percent: u8) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_position(u64::from(percent.min(100)));
        }
    }

    fn reset(&mut self) {
        if let Some(ref pb) = self.progress_bar {
            pb.reset();
        }
    }
}

/// One-line description of a written artifact
#[must_use]
pub fn artifact_summary(artifact: &ExportArtifact, path: &Path) -> String {
    let frames = if artifact.frame_count > 1 {
        format!(", {} frames", artifact.frame_count)
    } else {
        String::new()
    };
    format!(
        "Wrote {} ({}x{} {}, {}{frames})",
        path.display(),
        artifact.width,
        artifact.height,
        artifact.format,
        format_bytes(artifact.size_bytes() as u64),
    )
}
