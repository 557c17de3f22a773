//! # Terminal Progress
//!
//! An `indicatif` bar standing in as the import's progress channel. The bar
//! has one step per stage and names the stage about to run.

use indicatif::{ProgressBar, ProgressStyle};
use quarry_core::primitives::STAGE_COUNT;
use quarry_core::{ProgressChannel, Stage};
use std::time::Duration;

const TEMPLATE: &str = "{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    /// A visible bar on stderr.
    #[must_use]
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        Self {
            bar: ProgressBar::new(STAGE_COUNT).with_style(style),
        }
    }

    /// A bar that draws nothing (quiet and JSON modes).
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Visible unless `hidden` is set.
    #[must_use]
    pub fn for_terminal(hidden: bool) -> Self {
        if hidden { Self::hidden() } else { Self::new() }
    }

    /// Stages started so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressChannel for BarProgress {
    fn start(&mut self, estimated_seconds: u64) {
        self.bar.set_length(STAGE_COUNT);
        self.bar.set_position(0);
        self.bar
            .set_message(format!("starting (about {estimated_seconds}s)"));
        self.bar.enable_steady_tick(Duration::from_millis(120));
    }

    fn tick(&mut self) {
        let index = usize::try_from(self.bar.position()).unwrap_or(usize::MAX);
        if let Some(stage) = Stage::ALL.get(index) {
            self.bar.set_message(stage.name());
        }
        self.bar.inc(1);
    }

    fn finish(&mut self) {
        self.bar.finish_with_message("done");
    }
}
