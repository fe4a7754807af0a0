use std::time::{Duration, Instant};

/// Totals for one headless run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RunTotals {
    pub(crate) ticks: u64,
    /// Ticks whose snapshot carried no input at all.
    pub(crate) idle_ticks: u64,
    pub(crate) resets: u32,
}

/// Wall-clock tick rate over one reporting window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MetricsWindow {
    pub(crate) ticks: u32,
    pub(crate) ticks_per_second: f32,
}

#[derive(Debug)]
pub(crate) struct MetricsRecorder {
    totals: RunTotals,
    window: Duration,
    window_start: Instant,
    window_ticks: u32,
}

impl MetricsRecorder {
    pub(crate) fn new(window: Duration, start: Instant) -> Self {
        Self {
            totals: RunTotals::default(),
            window,
            window_start: start,
            window_ticks: 0,
        }
    }

    pub(crate) fn record_tick(&mut self, idle: bool) {
        self.totals.ticks = self.totals.ticks.saturating_add(1);
        if idle {
            self.totals.idle_ticks = self.totals.idle_ticks.saturating_add(1);
        }
        self.window_ticks = self.window_ticks.saturating_add(1);
    }

    pub(crate) fn record_reset(&mut self) {
        self.totals.resets = self.totals.resets.saturating_add(1);
    }

    pub(crate) fn totals(&self) -> RunTotals {
        self.totals
    }

    /// Closes the window once `window` has elapsed and starts the next one.
    pub(crate) fn poll_window(&mut self, now: Instant) -> Option<MetricsWindow> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }
        let report = MetricsWindow {
            ticks: self.window_ticks,
            ticks_per_second: self.window_ticks as f32 / elapsed.as_secs_f32().max(f32::EPSILON),
        };
        self.window_start = now;
        self.window_ticks = 0;
        Some(report)
    }
}
