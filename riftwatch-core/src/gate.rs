//! Connection state and the gate in front of privileged commands.

use crate::classify::{classify, Category, Classification, Severity};
use crate::notify::TransientNotifier;
use crate::types::{ConnectionState, NotificationLevel};

/// Tracks the game-client connection as reported by status messages.
///
/// The state changes only when a connection-category message arrives; there
/// is no timeout back to `Unknown`.
#[derive(Debug)]
pub struct ConnectionGate {
    state: ConnectionState,
    last_message: Option<String>,
    notice_duration_ms: i64,
    refusal_duration_ms: i64,
}

impl ConnectionGate {
    pub fn new(notice_duration_ms: i64, refusal_duration_ms: i64) -> Self {
        Self {
            state: ConnectionState::Unknown,
            last_message: None,
            notice_duration_ms,
            refusal_duration_ms,
        }
    }

    /// Handle one status message.
    ///
    /// Connection messages move the state; operational ones leave it alone
    /// and are shown through `notifier` instead.
    pub fn on_status_message(
        &mut self,
        raw: &str,
        notifier: &mut TransientNotifier,
    ) -> Classification {
        let classification = classify(raw);

        match classification.category {
            Category::Connection => {
                let next = match classification.severity {
                    Severity::Positive => ConnectionState::Connected,
                    Severity::Negative => ConnectionState::Failed,
                    Severity::Neutral => ConnectionState::Connecting,
                };
                if next != self.state {
                    tracing::info!(from = %self.state, to = %next, message = raw, "Connection state changed");
                }
                self.state = next;
                self.last_message = Some(raw.to_string());
            }
            Category::Operational => {
                let level = match classification.severity {
                    Severity::Positive => NotificationLevel::Success,
                    Severity::Negative => NotificationLevel::Danger,
                    Severity::Neutral => NotificationLevel::Warning,
                };
                notifier.show(raw, level, self.notice_duration_ms);
            }
        }

        classification
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Check whether `action` may be sent upstream.
    ///
    /// When not connected the action is refused and a danger notification
    /// explains why.
    pub fn authorize(&self, action: &str, notifier: &mut TransientNotifier) -> bool {
        if self.is_connected() {
            return true;
        }
        tracing::warn!(action, state = %self.state, "Refusing action while not connected");
        notifier.show(
            format!("Cannot {}: game client is not connected", action),
            NotificationLevel::Danger,
            self.refusal_duration_ms,
        );
        false
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The last connection-category message received.
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn setup() -> (ConnectionGate, TransientNotifier) {
        let (tx, _rx) = mpsc::unbounded_channel();
        (ConnectionGate::new(0, 0), TransientNotifier::new(tx))
    }

    #[test]
    fn test_starts_unknown() {
        let (gate, _) = setup();
        assert_eq!(gate.state(), ConnectionState::Unknown);
        assert!(!gate.is_connected());
        assert!(gate.last_message().is_none());
    }

    #[test]
    fn test_connection_transitions() {
        let (mut gate, mut notifier) = setup();

        gate.on_status_message("正在自动检测英雄联盟客户端 (进程和凭证)...", &mut notifier);
        assert_eq!(gate.state(), ConnectionState::Connecting);

        gate.on_status_message("LCU 连接成功", &mut notifier);
        assert_eq!(gate.state(), ConnectionState::Connected);
        assert!(gate.is_connected());
        assert_eq!(gate.last_message(), Some("LCU 连接成功"));

        gate.on_status_message("❌ 连接 LCU 失败。", &mut notifier);
        assert_eq!(gate.state(), ConnectionState::Failed);
        assert!(notifier.current().is_none());
    }

    #[test]
    fn test_operational_message_goes_to_notifier() {
        let (mut gate, mut notifier) = setup();
        gate.on_status_message("LCU 连接成功", &mut notifier);

        let c = gate.on_status_message("⚠️ 敌我分析功能已在运行中", &mut notifier);
        assert_eq!(c.category, Category::Operational);
        assert_eq!(gate.state(), ConnectionState::Connected);
        assert_eq!(gate.last_message(), Some("LCU 连接成功"));

        let shown = notifier.current().unwrap();
        assert_eq!(shown.text, "⚠️ 敌我分析功能已在运行中");
        assert_eq!(shown.level, NotificationLevel::Warning);
    }

    #[test]
    fn test_authorize_refuses_when_not_connected() {
        let (gate, mut notifier) = setup();
        assert!(!gate.authorize("start auto-accept", &mut notifier));
        let shown = notifier.current().unwrap();
        assert_eq!(shown.level, NotificationLevel::Danger);
        assert!(shown.text.contains("start auto-accept"));
    }

    #[test]
    fn test_authorize_allows_when_connected() {
        let (mut gate, mut notifier) = setup();
        gate.on_status_message("✅ LCU 连接成功！端口: 1234。", &mut notifier);
        assert!(gate.authorize("start auto-accept", &mut notifier));
        assert!(notifier.current().is_none());
    }
}
