// SPDX-License-Identifier: MIT
//! Scroll-depth milestones, scoped to a single page load.
//!
//! Milestones are monotonic: once a depth has been reported it never re-fires,
//! even when the scroll position oscillates back below it. Evaluation is
//! throttled so a burst of scroll callbacks costs at most one pass per
//! ~100 ms; the caller supplies `now`, which keeps the throttle deterministic
//! under test.

use serde_json::json;
use std::time::{Duration, Instant};

use super::sink::AnalyticsEvent;
use super::EVENT_SCROLL_DEPTH;

pub const SCROLL_MILESTONES: [u8; 4] = [25, 50, 75, 100];

/// Minimum spacing between scroll evaluations.
const THROTTLE_WINDOW: Duration = Duration::from_millis(100);

/// Per-page-load scroll state. Create a fresh scope on every full navigation;
/// dropping it abandons any pending throttle state.
#[derive(Debug)]
pub struct PageLoadScope {
    path: String,
    reported: [bool; SCROLL_MILESTONES.len()],
    last_eval: Option<Instant>,
}

impl PageLoadScope {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reported: [false; SCROLL_MILESTONES.len()],
            last_eval: None,
        }
    }

    /// Feed one scroll observation. Returns the `scroll_depth` events for
    /// every milestone newly crossed, in ascending order.
    ///
    /// Observations landing inside the throttle window are coalesced away
    /// without evaluation.
    pub fn observe_scroll(
        &mut self,
        scroll_top: f64,
        document_height: f64,
        window_height: f64,
        now: Instant,
    ) -> Vec<AnalyticsEvent> {
        if let Some(last) = self.last_eval {
            if now.duration_since(last) < THROTTLE_WINDOW {
                return Vec::new();
            }
        }
        self.last_eval = Some(now);

        let percent = scroll_percent(scroll_top, document_height, window_height);

        let mut events = Vec::new();
        for (i, milestone) in SCROLL_MILESTONES.iter().enumerate() {
            if percent >= *milestone && !self.reported[i] {
                self.reported[i] = true;
                events.push(AnalyticsEvent::new(
                    EVENT_SCROLL_DEPTH,
                    json!({ "depth": milestone, "path": self.path }),
                ));
            }
        }
        events
    }
}

/// `round(scroll_top / (document_height - window_height) * 100)`, clamped to
/// 0–100. A page shorter than the viewport has no scrollable range and counts
/// as fully read.
fn scroll_percent(scroll_top: f64, document_height: f64, window_height: f64) -> u8 {
    let scrollable = document_height - window_height;
    if scrollable <= 0.0 {
        return 100;
    }
    let pct = (scroll_top / scrollable * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_page_counts_as_fully_read() {
        assert_eq!(scroll_percent(0.0, 500.0, 800.0), 100);
        assert_eq!(scroll_percent(0.0, 800.0, 800.0), 100);
    }

    #[test]
    fn percent_is_clamped() {
        // Overscroll (rubber-banding) can push scroll_top past the range.
        assert_eq!(scroll_percent(1200.0, 1800.0, 800.0), 100);
        assert_eq!(scroll_percent(-50.0, 1800.0, 800.0), 0);
    }
}
