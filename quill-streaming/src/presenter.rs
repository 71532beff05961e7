// File: quill-streaming/src/presenter.rs

use std::sync::Arc;

use tracing::debug;

use quill_common::traits::StreamIndicator;

const INDICATOR_TITLE: &str = "Quill";
const INDICATOR_BODY: &str = "Timeline streaming is running";

/// Derives the user-visible "streaming active" signal from the number
/// of live sessions. The registry calls `refresh` after every mutation
/// that can change emptiness, while still holding its lock.
pub struct StatePresenter {
    indicator: Arc<dyn StreamIndicator>,
}

impl StatePresenter {
    pub fn new(indicator: Arc<dyn StreamIndicator>) -> Self {
        Self { indicator }
    }

    pub fn refresh(&self, active_sessions: usize) {
        if active_sessions > 0 {
            debug!(active_sessions, "showing streaming indicator");
            self.indicator.show(INDICATOR_TITLE, INDICATOR_BODY);
        } else {
            debug!("hiding streaming indicator");
            self.indicator.hide();
        }
    }
}
