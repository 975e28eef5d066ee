//! Terminal progress bar for background removal

use crate::{
    services::{ConsoleProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate},
    types::ProcessingTimings,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Progress reporter that drives an `indicatif` bar from 0 to 100
pub struct IndicatifProgressReporter {
    bar: ProgressBar,
    verbose: bool,
}

impl IndicatifProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self::with_bar(ProgressBar::new(100), verbose)
    }

    /// Wrap an existing bar (hidden bars are used in tests)
    #[must_use]
    pub fn with_bar(bar: ProgressBar, verbose: bool) -> Self {
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar, verbose }
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressReporter for IndicatifProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.bar.set_position(u64::from(update.progress));
        self.bar.set_message(update.description);
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        self.bar
            .finish_with_message(format!("Completed in {}ms", timings.total_ms));
        if self.verbose {
            log::info!("{}", timings.summary());
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.bar
            .abandon_with_message(format!("Failed during {}: {}", stage.description(), error));
    }
}

/// Pick the reporter matching the `--progress` flag
#[must_use]
pub fn create_cli_progress_reporter(enable_progress: bool, verbose: bool) -> Arc<dyn ProgressReporter> {
    if enable_progress {
        Arc::new(IndicatifProgressReporter::new(verbose))
    } else {
        Arc::new(ConsoleProgressReporter::new(verbose))
    }
}
