//! Progress Bar Module
//!
//! One bar per batch run. The bar's position is driven by the processed count
//! reported by the scheduler, so it never advances past the batch total.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const BATCH_TEMPLATE: &str =
    "{spinner:.cyan} {prefix:.bold} [{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} ({eta}) {msg}";
const PROGRESS_CHARS: &str = "█▓░";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

pub fn create_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);

    match ProgressStyle::default_bar().template(BATCH_TEMPLATE) {
        Ok(style) => pb.set_style(
            style
                .progress_chars(PROGRESS_CHARS)
                .tick_chars(SPINNER_CHARS),
        ),
        Err(_) => pb.set_draw_target(ProgressDrawTarget::hidden()),
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

pub struct BatchProgress {
    pub total: u64,
    pub processed: u64,
    bar: ProgressBar,
    /// Keep stdout free for machine-readable output
    log_to_stderr: bool,
}

impl BatchProgress {
    pub fn new(total: u64, prefix: &str) -> Self {
        Self {
            total,
            processed: 0,
            bar: create_progress_bar(total, prefix),
            log_to_stderr: false,
        }
    }

    /// Hidden bar for machine-readable runs; log lines go to stderr.
    pub fn hidden(total: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden());
        Self {
            total,
            processed: 0,
            bar,
            log_to_stderr: true,
        }
    }

    /// Jump to an absolute processed count. Counts never move backwards.
    pub fn set_processed(&mut self, processed: u64) {
        self.processed = self.processed.max(processed.min(self.total));
        self.bar.set_position(self.processed);
    }

    /// Print a log line above the bar without tearing it.
    pub fn println(&self, line: &str) {
        if self.logs_to_stderr() {
            eprintln!("{}", line);
        } else if self.bar.is_hidden() {
            println!("{}", line);
        } else {
            self.bar.println(line);
        }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    pub fn logs_to_stderr(&self) -> bool {
        self.log_to_stderr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 05s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 02m 05s");
    }

    #[test]
    fn test_batch_progress_is_monotonic_and_capped() {
        let mut progress = BatchProgress::hidden(6);
        progress.set_processed(2);
        progress.set_processed(1);
        assert_eq!(progress.processed, 2);
        progress.set_processed(9);
        assert_eq!(progress.processed, 6);
        assert_eq!(progress.bar().position(), 6);
    }

    #[test]
    fn test_hidden_bar_keeps_stdout_clean() {
        assert!(BatchProgress::hidden(3).logs_to_stderr());
        assert!(!BatchProgress::new(3, "Converting").logs_to_stderr());
    }
}
