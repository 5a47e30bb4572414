// SPDX-License-Identifier: MIT
//! Client event tracking engine — page views, scroll depth, and experiment
//! exposures, with explicit per-scope dedup state.
//!
//! Dedup state is never ambient module state: scroll milestones live in a
//! [`PageLoadScope`] (fresh per navigation), experiment exposures in a
//! [`TabSessionScope`] (one per tab session). Scope methods are pure — they
//! return the events they produce — and the [`Tracker`] façade forwards them
//! to the analytics sender. Emission is fire-and-forget: nothing here blocks
//! or returns an error to the caller.

pub mod experiment;
pub mod scroll;
pub mod sink;

pub use experiment::TabSessionScope;
pub use scroll::PageLoadScope;
pub use sink::{AnalyticsEvent, AnalyticsSender};

use serde_json::{json, Value};
use std::time::Instant;

pub const EVENT_PAGE_VIEW: &str = "page_view";
pub const EVENT_SCROLL_DEPTH: &str = "scroll_depth";
pub const EVENT_EXPERIMENT_VIEWED: &str = "experiment_viewed";
pub const EVENT_LESSON_HINT_OPENED: &str = "lesson_hint_opened";

/// One tracker per browsing context. Owns the tab-session scope and the
/// current page-load scope, and wires every sub-behavior to the sender.
pub struct Tracker {
    sender: AnalyticsSender,
    experiment_keys: Vec<String>,
    tab_session: TabSessionScope,
    page_load: Option<PageLoadScope>,
    last_path: Option<String>,
}

impl Tracker {
    pub fn new(sender: AnalyticsSender, experiment_keys: Vec<String>) -> Self {
        Self {
            sender,
            experiment_keys,
            tab_session: TabSessionScope::new(),
            page_load: None,
            last_path: None,
        }
    }

    /// Handle a navigation (full or client-side).
    ///
    /// Emits one `page_view` per route change — a remount on the same path
    /// does not re-fire — starts a fresh scroll scope for the new page, and
    /// reports any unseen experiment exposures from the cookie header.
    pub fn navigate(&mut self, path: &str, title: &str, cookie_header: &str) {
        if self.last_path.as_deref() != Some(path) {
            self.last_path = Some(path.to_string());
            self.page_load = Some(PageLoadScope::new(path));
            self.sender.send(AnalyticsEvent::new(
                EVENT_PAGE_VIEW,
                json!({ "path": path, "title": title }),
            ));
        }

        for event in
            self.tab_session
                .observe_experiments(&self.experiment_keys, cookie_header, path)
        {
            self.sender.send(event);
        }
    }

    /// Feed a scroll observation for the current page load. A no-op before
    /// the first navigation.
    pub fn observe_scroll(
        &mut self,
        scroll_top: f64,
        document_height: f64,
        window_height: f64,
        now: Instant,
    ) {
        if let Some(scope) = self.page_load.as_mut() {
            for event in scope.observe_scroll(scroll_top, document_height, window_height, now) {
                self.sender.send(event);
            }
        }
    }

    /// Emit an ad-hoc event (e.g. `lesson_hint_opened`) with arbitrary
    /// properties.
    pub fn track(&self, event: &str, properties: Value) {
        self.sender.send(AnalyticsEvent::new(event, properties));
    }
}
