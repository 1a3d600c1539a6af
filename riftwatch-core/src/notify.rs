//! The transient notification slot.
//!
//! There is exactly one slot. Showing a notification replaces whatever was
//! there and re-arms a single auto-clear timer. The timer is a spawned task
//! that sleeps and then posts [`SessionUpdate::NotificationExpired`] back to
//! the session loop; the notifier only honors the expiry whose token matches
//! the timer it currently holds, so an expiry already queued by a cancelled
//! timer is ignored.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::session::{SessionUpdate, UpdateSender};
use crate::types::{Notification, NotificationLevel};

/// The armed auto-clear timer.
struct PendingClear {
    token: u64,
    handle: JoinHandle<()>,
}

/// Owner of the notification slot and its timer.
pub struct TransientNotifier {
    current: Option<Notification>,
    pending: Option<PendingClear>,
    next_token: u64,
    updates: UpdateSender,
}

impl TransientNotifier {
    pub fn new(updates: UpdateSender) -> Self {
        Self {
            current: None,
            pending: None,
            next_token: 0,
            updates,
        }
    }

    /// Replace the notification and re-arm the auto-clear timer.
    ///
    /// `duration_ms <= 0` keeps the notification until [`clear`](Self::clear)
    /// or the next `show`. Must be called from within a tokio runtime when a
    /// positive duration is given.
    pub fn show(&mut self, text: impl Into<String>, level: NotificationLevel, duration_ms: i64) {
        self.cancel_pending();

        let text = text.into();
        tracing::debug!(?level, duration_ms, text = %text, "Showing notification");

        // Out-of-range durations leave no display deadline; the timer still runs.
        let expires_at = (duration_ms > 0)
            .then(|| chrono::Duration::try_milliseconds(duration_ms))
            .flatten()
            .and_then(|d| Utc::now().checked_add_signed(d));
        self.current = Some(Notification {
            text,
            level,
            expires_at,
        });

        if duration_ms > 0 {
            self.next_token += 1;
            let token = self.next_token;
            let updates = self.updates.clone();
            let delay = Duration::from_millis(duration_ms as u64);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = updates.send(SessionUpdate::NotificationExpired { token });
            });
            self.pending = Some(PendingClear { token, handle });
        }
    }

    /// Cancel any timer and empty the slot.
    pub fn clear(&mut self) {
        self.cancel_pending();
        self.current = None;
    }

    /// Apply a timer expiry. Returns false for a token that is no longer armed.
    pub fn expire(&mut self, token: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.token == token => {
                self.pending = None;
                self.current = None;
                true
            }
            _ => {
                tracing::trace!(token, "Ignoring stale notification expiry");
                false
            }
        }
    }

    /// The visible notification, if any.
    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// Whether an auto-clear timer is armed.
    pub fn has_pending_timer(&self) -> bool {
        self.pending.is_some()
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }
}

impl Drop for TransientNotifier {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
