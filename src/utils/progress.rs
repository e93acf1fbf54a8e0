//! Terminal progress for block copies and mosaic pieces

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, log_enabled, Level};

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Counts finished units of work on stderr
///
/// The bar stays hidden unless info logging is on, so `--quiet` runs and
/// tests print nothing.
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    pub fn new(total: u64, description: &str) -> Self {
        let target = if log_enabled!(Level::Info) {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(Some(total), target);
        match ProgressStyle::with_template(TEMPLATE) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => debug!("Falling back to the default progress style: {}", e),
        }
        bar.set_message(description.to_string());
        ProgressTracker { bar }
    }

    pub fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    /// Replaces the trailing message, e.g. with the current column
    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    pub fn finish(&self) {
        let done = self.bar.position();
        self.bar.finish_with_message(format!("{} done", done));
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_increments() {
        let progress = ProgressTracker::new(10, "pieces");
        progress.increment(3);
        progress.increment(4);
        progress.set_message("column 2/3");
        assert_eq!(progress.position(), 7);
        progress.finish();
        assert_eq!(progress.position(), 7);
    }
}
