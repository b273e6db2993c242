use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::task::ScopedTask;

/// How long a notification stays visible unless dismissed earlier.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(4);

/// State of the single notification slot.
///
/// `id` increases with every shown message; the message text is kept after
/// the slot is hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub visible: bool,
}

/// Single-slot transient message with auto-dismiss.
///
/// Showing a message while another is visible replaces it; there is no queue.
/// Any pending auto-dismiss timer is cancelled on replacement, on manual
/// dismissal and when the channel is dropped.
#[derive(Debug)]
pub struct NotificationChannel {
    slot: Arc<watch::Sender<Notification>>,
    ttl: Duration,
    dismiss_timer: Mutex<Option<ScopedTask>>,
}

impl NotificationChannel {
    pub fn new(ttl: Duration) -> Self {
        let (slot, _) = watch::channel(Notification::default());
        Self {
            slot: Arc::new(slot),
            ttl,
            dismiss_timer: Mutex::new(None),
        }
    }

    /// Shows `message`, replacing whatever is visible. Returns its id.
    pub fn show(&self, message: impl Into<String>) -> u64 {
        let message = message.into();
        let mut timer = self
            .dismiss_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        timer.take();

        let mut id = 0;
        self.slot.send_modify(|slot| {
            slot.id += 1;
            slot.message = message;
            slot.visible = true;
            id = slot.id;
        });
        debug!(id, "notification shown");

        let slot = Arc::clone(&self.slot);
        *timer = Some(ScopedTask::after(self.ttl, async move {
            slot.send_if_modified(|current| hide_if_current(current, id));
        }));
        id
    }

    /// Hides the visible message and cancels its auto-dismiss timer.
    pub fn dismiss(&self) {
        let mut timer = self
            .dismiss_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        timer.take();
        self.slot.send_if_modified(|current| {
            let id = current.id;
            hide_if_current(current, id)
        });
    }

    pub fn current(&self) -> Notification {
        self.slot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Notification> {
        self.slot.subscribe()
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

fn hide_if_current(slot: &mut Notification, id: u64) -> bool {
    if slot.id != id || !slot.visible {
        return false;
    }
    slot.visible = false;
    true
}
