// SPDX-License-Identifier: MIT
//! Experiment-exposure reporting, deduplicated per tab session.
//!
//! Variant assignment happens upstream (an edge function sets one cookie per
//! experiment); this module only reports that the caller saw an assigned
//! variant. At most one `experiment_viewed` fires per `(experiment, variant)`
//! within a tab session, however many times components remount.

use serde_json::json;
use std::collections::HashSet;

use super::sink::AnalyticsEvent;
use super::EVENT_EXPERIMENT_VIEWED;
use crate::identity::cookie_value;

/// Per-tab-session exposure state. Lives as long as the tab session does;
/// a new tab starts from an empty scope.
#[derive(Debug, Default)]
pub struct TabSessionScope {
    reported: HashSet<(String, String)>,
}

impl TabSessionScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report exposures for every tracked experiment whose variant cookie is
    /// present and not yet reported in this tab session.
    pub fn observe_experiments(
        &mut self,
        experiment_keys: &[String],
        cookie_header: &str,
        page: &str,
    ) -> Vec<AnalyticsEvent> {
        let mut events = Vec::new();
        for key in experiment_keys {
            let Some(variant) = cookie_value(cookie_header, key) else {
                continue;
            };
            let dedup_key = (key.clone(), variant.clone());
            if self.reported.contains(&dedup_key) {
                continue;
            }
            self.reported.insert(dedup_key);
            events.push(AnalyticsEvent::new(
                EVENT_EXPERIMENT_VIEWED,
                json!({ "experiment": key, "variant": variant, "page": page }),
            ));
        }
        events
    }
}
