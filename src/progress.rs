//! Progress reporting for long passes
//!
//! Aggregation passes call [`ProgressReporter::report`] once per accepted timestep
//! with the running count and the total planned for the whole pass. Reporters must be
//! `Sync` because per-file parallel passes report from worker threads.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives `(current, total)` after each accepted timestep
pub trait ProgressReporter: Send + Sync {
    fn report(&self, current: usize, total: usize);
}

/// Width of the console bar in characters
pub const BAR_WIDTH: usize = 60;

/// Draws a `[#####.....] current/total` bar on stderr
#[derive(Debug, Clone)]
pub struct ConsoleProgress {
    label: String,
}

impl ConsoleProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new("Processing")
    }
}

/// Render one bar line, without the carriage return
#[must_use]
pub fn render_bar(label: &str, current: usize, total: usize) -> String {
    let filled = if total == 0 {
        BAR_WIDTH
    } else {
        (current.min(total) * BAR_WIDTH) / total
    };
    format!(
        "{label}: [{}{}] {current}/{total}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled)
    )
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, current: usize, total: usize) {
        let mut err = io::stderr().lock();
        let _ = write!(err, "\r{}", render_bar(&self.label, current, total));
        if current >= total {
            let _ = writeln!(err);
        }
        let _ = err.flush();
    }
}

/// Shared counter that turns per-step ticks into `(current, total)` reports
pub(crate) struct ProgressTracker<'a> {
    reporter: Option<&'a dyn ProgressReporter>,
    done: AtomicUsize,
    total: usize,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(reporter: Option<&'a dyn ProgressReporter>, total: usize) -> Self {
        Self {
            reporter,
            done: AtomicUsize::new(0),
            total,
        }
    }

    pub(crate) fn tick(&self) {
        let current = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(reporter) = self.reporter {
            reporter.report(current, self.total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(usize, usize)>>);

    impl ProgressReporter for Recorder {
        fn report(&self, current: usize, total: usize) {
            self.0.lock().unwrap().push((current, total));
        }
    }

    #[test]
    fn bar_fills_proportionally() {
        let half = render_bar("Mean", 5, 10);
        assert!(half.starts_with("Mean: ["));
        assert_eq!(half.matches('#').count(), BAR_WIDTH / 2);
        assert!(half.ends_with("5/10"));
        assert_eq!(render_bar("Mean", 10, 10).matches('#').count(), BAR_WIDTH);
        assert_eq!(render_bar("Mean", 0, 0).matches('#').count(), BAR_WIDTH);
    }

    #[test]
    fn tracker_counts_up_to_total() {
        let recorder = Recorder::default();
        let tracker = ProgressTracker::new(Some(&recorder), 3);
        for _ in 0..3 {
            tracker.tick();
        }
        assert_eq!(*recorder.0.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }
}
