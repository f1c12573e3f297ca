use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::debug;

use crate::timer::DelayedTask;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
            Severity::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<Notification>,
    generation: u64,
}

/// Single-slot toast holder. A new notification overwrites the current one
/// and restarts the auto-dismiss timer; nothing is queued.
#[derive(Debug)]
pub struct Notifier {
    slot: Arc<Mutex<Slot>>,
    timer: Mutex<DelayedTask>,
    ttl: Duration,
    events: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            timer: Mutex::new(DelayedTask::new()),
            ttl,
            events,
        }
    }

    pub fn show(&self, message: impl Into<String>, severity: Severity) {
        let notification = Notification {
            message: message.into(),
            severity,
        };
        debug!(%severity, message = %notification.message, "notification");

        let generation = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.generation += 1;
            slot.current = Some(notification.clone());
            slot.generation
        };

        let slot = Arc::clone(&self.slot);
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .schedule(self.ttl, move || {
                let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.generation == generation {
                    slot.current = None;
                }
            });

        // No subscribers is fine; the slot is the source of truth.
        let _ = self.events.send(notification);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(message, Severity::Success);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(message, Severity::Error);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.show(message, Severity::Info);
    }

    /// Manual dismissal.
    pub fn dismiss(&self) {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.current = None;
    }

    pub fn current(&self) -> Option<Notification> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    /// Stream of every notification shown from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_show_then_auto_dismiss() {
        let notifier = Notifier::new(Duration::from_millis(1000));
        notifier.success("Task created successfully");
        assert_eq!(
            notifier.current(),
            Some(Notification {
                message: "Task created successfully".into(),
                severity: Severity::Success,
            })
        );

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(notifier.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_restarts_timer() {
        let notifier = Notifier::new(Duration::from_millis(1000));
        let mut rx = notifier.subscribe();

        notifier.error("first");
        tokio::time::sleep(Duration::from_millis(800)).await;
        notifier.info("second");

        tokio::time::sleep(Duration::from_millis(800)).await;
        let current = notifier.current().unwrap();
        assert_eq!(current.message, "second");
        assert_eq!(current.severity, Severity::Info);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(notifier.current(), None);

        assert_eq!(rx.try_recv().unwrap().message, "first");
        assert_eq!(rx.try_recv().unwrap().message, "second");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_manual_dismiss() {
        let notifier = Notifier::default();
        notifier.info("hello");
        notifier.dismiss();
        assert_eq!(notifier.current(), None);
    }
}
