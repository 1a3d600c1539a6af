//! Push event schema and dispatch.
//!
//! The backend pushes three named events. Each is decoded into a typed
//! [`PushEvent`] and routed: status text goes to the connection gate, rosters
//! start a lookup batch. Outgoing [`PushCommand`]s are privileged and only
//! leave when the gate reports a live client connection.

use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::lookup::{HistorySource, LookupCoordinator};
use crate::push::ChannelEvent;
use crate::session::{SessionState, UpdateSender};
use crate::types::{NotificationLevel, PlayerIdentity, RosterBatch, RosterEntry, RosterRole};

/// A decoded push event.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    StatusUpdate { message: String },
    Roster(RosterBatch),
}

/// `status_update` payload. `data` is accepted in place of `message`.
#[derive(Debug, Deserialize)]
struct StatusPayload {
    #[serde(alias = "data")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TeammatesPayload {
    teammates: Vec<WirePlayer>,
}

#[derive(Debug, Deserialize)]
struct EnemiesPayload {
    enemies: Vec<WirePlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePlayer {
    game_name: String,
    tag_line: String,
    #[serde(default)]
    champion_id: Option<serde_json::Value>,
}

impl WirePlayer {
    fn into_entry(self) -> RosterEntry {
        let champion = match self.champion_id {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
        .filter(|c| !c.is_empty() && c != "Unknown");

        RosterEntry {
            identity: PlayerIdentity::new(self.game_name, self.tag_line),
            champion,
        }
    }
}

impl PushEvent {
    /// Decode a named event. Unknown names yield `Ok(None)`.
    pub fn decode(name: &str, payload: serde_json::Value) -> Result<Option<PushEvent>> {
        let malformed = |e: serde_json::Error| Error::MalformedEvent {
            event: name.to_string(),
            message: e.to_string(),
        };

        let event = match name {
            "status_update" => {
                let p: StatusPayload = serde_json::from_value(payload).map_err(malformed)?;
                PushEvent::StatusUpdate { message: p.message }
            }
            "teammates_found" => {
                let p: TeammatesPayload = serde_json::from_value(payload).map_err(malformed)?;
                PushEvent::Roster(roster(RosterRole::Teammates, p.teammates))
            }
            "enemies_found" => {
                let p: EnemiesPayload = serde_json::from_value(payload).map_err(malformed)?;
                PushEvent::Roster(roster(RosterRole::Enemies, p.enemies))
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn roster(role: RosterRole, players: Vec<WirePlayer>) -> RosterBatch {
    RosterBatch::new(role, players.into_iter().map(WirePlayer::into_entry).collect())
}

/// Commands sent upstream on the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushCommand {
    StartAutoAccept,
    StartAutoAnalyze,
}

impl PushCommand {
    /// Socket.IO event name
    pub fn event_name(&self) -> &'static str {
        match self {
            PushCommand::StartAutoAccept => "start_auto_accept",
            PushCommand::StartAutoAnalyze => "start_auto_analyze",
        }
    }

    /// Human-readable action, used in notices
    pub fn label(&self) -> &'static str {
        match self {
            PushCommand::StartAutoAccept => "start auto-accept",
            PushCommand::StartAutoAnalyze => "start auto-analyze",
        }
    }
}

/// Top-level dispatcher between the push channel and the session.
pub struct PushEventRouter<S> {
    coordinator: LookupCoordinator<S>,
    updates: UpdateSender,
    commands: mpsc::UnboundedSender<PushCommand>,
}

impl<S: HistorySource> PushEventRouter<S> {
    pub fn new(
        coordinator: LookupCoordinator<S>,
        updates: UpdateSender,
        commands: mpsc::UnboundedSender<PushCommand>,
    ) -> Self {
        Self {
            coordinator,
            updates,
            commands,
        }
    }

    /// Route one decoded push event into the session.
    pub fn route(&mut self, state: &mut SessionState, event: PushEvent) {
        match event {
            PushEvent::StatusUpdate { message } => {
                tracing::debug!(message = %message, "Status update");
                state.gate.on_status_message(&message, &mut state.notifier);
            }
            PushEvent::Roster(batch) => {
                let generation = self.coordinator.dispatch(batch.clone(), self.updates.clone());
                state.begin_roster(batch, generation);
            }
        }
    }

    /// Route a transport-level event.
    ///
    /// Losing the push channel is reported but does not change the connection
    /// state, which only follows status messages.
    pub fn route_channel(&mut self, state: &mut SessionState, event: ChannelEvent) {
        match event {
            ChannelEvent::Event(event) => self.route(state, event),
            ChannelEvent::Connected => {
                tracing::info!("Push channel connected");
                state.notice("Connected to companion backend", NotificationLevel::Info);
            }
            ChannelEvent::Disconnected { reason } => {
                tracing::warn!(reason = %reason, "Push channel lost");
                state.notice(
                    format!("Lost connection to companion backend: {}", reason),
                    NotificationLevel::Danger,
                );
            }
        }
    }

    /// Send a privileged command upstream if the gate allows it.
    ///
    /// Returns true if the command was handed to the push client, which holds
    /// it until the socket is connected.
    pub fn request(&mut self, state: &mut SessionState, command: PushCommand) -> bool {
        if state.is_requested(command) {
            state.notice(
                format!("Already requested: {}", command.label()),
                NotificationLevel::Info,
            );
            return false;
        }

        if !state.gate.authorize(command.label(), &mut state.notifier) {
            return false;
        }

        if self.commands.send(command).is_err() {
            tracing::warn!(command = command.event_name(), "Push channel closed, command dropped");
            state.notice(
                format!("Cannot {}: push channel unavailable", command.label()),
                NotificationLevel::Danger,
            );
            return false;
        }

        tracing::info!(command = command.event_name(), "Sent command");
        state.mark_requested(command);
        state.notice(
            format!("Sent {}, waiting for game events...", command.label()),
            NotificationLevel::Info,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_status_update() {
        let event = PushEvent::decode("status_update", json!({"message": "LCU 连接成功"}))
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            PushEvent::StatusUpdate {
                message: "LCU 连接成功".to_string()
            }
        );
    }

    #[test]
    fn test_decode_status_update_data_alias() {
        let event = PushEvent::decode("status_update", json!({"data": "正在自动检测..."}))
            .unwrap()
            .unwrap();
        assert!(matches!(event, PushEvent::StatusUpdate { message } if message == "正在自动检测..."));
    }

    #[test]
    fn test_decode_status_update_missing_message_is_malformed() {
        let err = PushEvent::decode("status_update", json!({"text": "hi"})).unwrap_err();
        assert!(matches!(err, Error::MalformedEvent { ref event, .. } if event == "status_update"));
    }

    #[test]
    fn test_decode_teammates() {
        let event = PushEvent::decode(
            "teammates_found",
            json!({"teammates": [
                {"gameName": "A", "tagLine": "1"},
                {"gameName": "B", "tagLine": "2"}
            ]}),
        )
        .unwrap()
        .unwrap();
        let PushEvent::Roster(batch) = event else {
            panic!("expected roster");
        };
        assert_eq!(batch.role, RosterRole::Teammates);
        assert_eq!(batch.entries[1].identity, PlayerIdentity::new("B", "2"));
    }

    #[test]
    fn test_decode_enemies_champion() {
        let event = PushEvent::decode(
            "enemies_found",
            json!({"enemies": [
                {"gameName": "A", "tagLine": "1", "championId": "Ahri"},
                {"gameName": "B", "tagLine": "2", "championId": "Unknown"},
                {"gameName": "C", "tagLine": "3", "championId": 103},
                {"gameName": "D", "tagLine": "4"}
            ]}),
        )
        .unwrap()
        .unwrap();
        let PushEvent::Roster(batch) = event else {
            panic!("expected roster");
        };
        assert_eq!(batch.role, RosterRole::Enemies);
        let champs: Vec<_> = batch.entries.iter().map(|e| e.champion.clone()).collect();
        assert_eq!(
            champs,
            vec![Some("Ahri".to_string()), None, Some("103".to_string()), None]
        );
    }

    #[test]
    fn test_decode_roster_missing_tag_is_malformed() {
        let err = PushEvent::decode("enemies_found", json!({"enemies": [{"gameName": "A"}]}))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedEvent { .. }));
    }

    #[test]
    fn test_decode_unknown_event() {
        assert!(PushEvent::decode("vision_frame", json!({})).unwrap().is_none());
    }

    #[test]
    fn test_command_names() {
        assert_eq!(PushCommand::StartAutoAccept.event_name(), "start_auto_accept");
        assert_eq!(PushCommand::StartAutoAnalyze.event_name(), "start_auto_analyze");
    }
}
