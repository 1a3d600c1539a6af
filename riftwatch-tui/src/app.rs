//! Application state for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use riftwatch_core::backend::AutodetectResponse;
use riftwatch_core::lookup::{HistorySource, LookupCoordinator};
use riftwatch_core::push::ChannelEvent;
use riftwatch_core::session::UpdateSender;
use riftwatch_core::{
    config::NotificationConfig, NotificationLevel, PushCommand, PushEventRouter, SessionState,
    SessionUpdate,
};
use tokio::sync::mpsc;

/// Main application state.
pub struct App<S> {
    pub session: SessionState,
    router: PushEventRouter<S>,
    /// Backend address, shown in the header
    pub backend_url: String,
    pub should_quit: bool,
}

impl<S: HistorySource> App<S> {
    pub fn new(
        source: S,
        notifications: &NotificationConfig,
        backend_url: impl Into<String>,
        updates: UpdateSender,
        commands: mpsc::UnboundedSender<PushCommand>,
    ) -> Self {
        let coordinator = LookupCoordinator::new(source);
        Self {
            session: SessionState::new(notifications, updates.clone()),
            router: PushEventRouter::new(coordinator, updates, commands),
            backend_url: backend_url.into(),
            should_quit: false,
        }
    }

    /// Handle keyboard input.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('a') => {
                self.router
                    .request(&mut self.session, PushCommand::StartAutoAccept);
            }
            KeyCode::Char('z') => {
                self.router
                    .request(&mut self.session, PushCommand::StartAutoAnalyze);
            }
            KeyCode::Char('c') => {
                self.session.notifier.clear();
            }
            _ => {}
        }
    }

    pub fn on_channel_event(&mut self, event: ChannelEvent) {
        self.router.route_channel(&mut self.session, event);
    }

    pub fn on_update(&mut self, update: SessionUpdate) {
        self.session.apply(update);
    }

    /// Report the startup client detection. Only a notice is shown; the
    /// connection state still follows status messages.
    pub fn on_autodetect(&mut self, result: riftwatch_core::Result<AutodetectResponse>) {
        match result {
            Ok(response) if response.success => {
                let text = match response.port {
                    Some(port) => format!("Game client detected on port {}", port),
                    None => "Game client detected".to_string(),
                };
                self.session.notice(text, NotificationLevel::Success);
            }
            Ok(response) => {
                let reason = response
                    .message
                    .unwrap_or_else(|| "client not found".to_string());
                self.session.notice(
                    format!("Auto-detect failed: {}", reason),
                    NotificationLevel::Danger,
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Autodetect request failed");
                self.session.notice(
                    format!("Backend unreachable: {}", e),
                    NotificationLevel::Danger,
                );
            }
        }
    }

    /// Whether a command was already sent this session, for the footer.
    pub fn is_requested(&self, command: PushCommand) -> bool {
        self.session.is_requested(command)
    }
}
