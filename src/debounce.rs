use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::timer::DelayedTask;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Turns raw search keystrokes into a delayed, coalesced search term.
///
/// `term` follows every keystroke; the debounced term only moves once input
/// has been quiet for the full period, and only notifies subscribers when
/// the value actually changed.
#[derive(Debug)]
pub struct SearchDebouncer {
    term: String,
    quiet: Duration,
    timer: DelayedTask,
    debounced: Arc<watch::Sender<String>>,
}

impl SearchDebouncer {
    pub fn new(quiet: Duration) -> Self {
        let (tx, _rx) = watch::channel(String::new());
        Self {
            term: String::new(),
            quiet,
            timer: DelayedTask::new(),
            debounced: Arc::new(tx),
        }
    }

    /// Record a keystroke. Clearing the box is a keystroke like any other.
    pub fn input(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.term.clone_from(&text);

        let tx = Arc::clone(&self.debounced);
        self.timer.schedule(self.quiet, move || {
            let settled = text.clone();
            let changed = tx.send_if_modified(|current| {
                if *current == text {
                    false
                } else {
                    *current = text;
                    true
                }
            });
            if changed {
                debug!(term = %settled, "debounced search term settled");
            }
        });
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn debounced(&self) -> String {
        self.debounced.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// Receiver notified on every debounced transition.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.debounced.subscribe()
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}
