//! Time-window selection of timesteps
//!
//! Two inclusion rules are used:
//!
//! - [`TimeWindow::contains`] / [`TimeWindow::select`]: the closed interval
//!   `start <= t <= end`, used when a single file is filtered on its own.
//! - [`WindowCursor`]: the continuation rule used by every aggregation pass. The
//!   lower bound starts at `start - WINDOW_EPSILON` and is moved up to each accepted
//!   timestamp, so `lower < t <= end`. A cursor lives for a whole pass, which means a
//!   timestamp written at the end of one file and again at the start of the next is
//!   counted once. For a single file the two rules select the same indices.

use serde::Serialize;

/// Slack subtracted from the window start so a timestamp equal to it is not lost to
/// floating-point representation error.
pub const WINDOW_EPSILON: f64 = 1.0e-10;

/// Inclusive time interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    #[must_use]
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// True when no timestamp can satisfy the window
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Closed-interval membership
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    /// Indices of `times` inside the closed interval
    #[must_use]
    pub fn select(&self, times: &[f64]) -> Vec<usize> {
        times
            .iter()
            .enumerate()
            .filter(|(_, &t)| self.contains(t))
            .map(|(i, _)| i)
            .collect()
    }

    /// Start a continuation cursor for a (possibly multi-file) pass
    #[must_use]
    pub fn cursor(&self) -> WindowCursor {
        WindowCursor {
            lower: self.start - WINDOW_EPSILON,
            upper: self.end,
        }
    }
}

/// Stateful filter carrying the last accepted timestamp across files
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowCursor {
    lower: f64,
    upper: f64,
}

impl WindowCursor {
    /// Accept `t` if it lies strictly above the last accepted time and within the
    /// window end; on acceptance the lower bound advances to `t`.
    pub fn accept(&mut self, t: f64) -> bool {
        if self.lower < t && t <= self.upper {
            self.lower = t;
            true
        } else {
            false
        }
    }

    /// Run one file's time vector through the cursor, returning the accepted
    /// `(timestep index, time)` pairs in file order.
    pub fn plan(&mut self, times: &[f64]) -> Vec<(usize, f64)> {
        times
            .iter()
            .enumerate()
            .filter(|(_, &t)| self.accept(t))
            .map(|(i, &t)| (i, t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(plan: &[(usize, f64)]) -> Vec<usize> {
        plan.iter().map(|&(i, _)| i).collect()
    }

    #[test]
    fn closed_rule_on_single_file() {
        let times = [0.0, 1.0, 2.0, 3.0, 4.0];
        let window = TimeWindow::new(1.0, 3.0);
        assert_eq!(window.select(&times), vec![1, 2, 3]);
        assert_eq!(indices(&window.cursor().plan(&times)), vec![1, 2, 3]);
    }

    #[test]
    fn reversed_window_selects_nothing() {
        let times = [0.0, 1.0, 2.0, 3.0, 4.0];
        let window = TimeWindow::new(3.0, 1.0);
        assert!(window.is_empty());
        assert!(window.select(&times).is_empty());
        assert!(window.cursor().plan(&times).is_empty());
    }

    #[test]
    fn shared_boundary_counted_once() {
        let window = TimeWindow::new(0.0, 4.0);
        let mut cursor = window.cursor();
        let first = cursor.plan(&[0.0, 1.0, 2.0]);
        let second = cursor.plan(&[2.0, 3.0, 4.0]);
        assert_eq!(indices(&first), vec![0, 1, 2]);
        assert_eq!(indices(&second), vec![1, 2]);
        assert_eq!(first.len() + second.len(), 5);
    }

    #[test]
    fn epsilon_keeps_inexact_start() {
        // 0.1 + 0.2 lands just above 0.3
        let start = 0.1 + 0.2;
        let times = [0.2, 0.3, 0.4];
        let mut cursor = TimeWindow::new(start, 0.4).cursor();
        assert_eq!(indices(&cursor.plan(&times)), vec![1, 2]);
    }

    #[test]
    fn cursor_tracks_last_accepted() {
        let mut cursor = TimeWindow::new(0.0, 10.0).cursor();
        assert!(cursor.accept(0.5));
        assert!(cursor.accept(0.6));
        assert!(!cursor.accept(0.5));
        assert!(!cursor.accept(11.0));
    }
}
