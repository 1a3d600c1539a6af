//! Session state: everything the companion currently shows.
//!
//! [`SessionState`] is the single mutable state object. Background work never
//! touches it directly; lookup tasks and notification timers post
//! [`SessionUpdate`]s to a channel and the event loop applies them with
//! [`SessionState::apply`]. Rendering reads the state through
//! [`crate::view::render`].

use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::config::NotificationConfig;
use crate::gate::ConnectionGate;
use crate::lookup::LookupResult;
use crate::notify::TransientNotifier;
use crate::router::PushCommand;
use crate::types::{
    Aggregate, NotificationLevel, PlayerIdentity, PlayerSummary, RosterBatch, RosterEntry,
    RosterRole,
};

/// Messages posted back to the event loop by background work.
#[derive(Debug)]
pub enum SessionUpdate {
    /// One player's lookup settled
    ItemSettled {
        role: RosterRole,
        generation: u64,
        identity: PlayerIdentity,
        result: LookupResult,
    },
    /// Every lookup of a batch has settled
    BatchComplete { role: RosterRole, generation: u64 },
    /// A notification auto-clear timer fired
    NotificationExpired { token: u64 },
}

/// Sending half of the session update channel.
pub type UpdateSender = mpsc::UnboundedSender<SessionUpdate>;

/// What a player's stats slot currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    Loading,
    Ready(PlayerSummary),
    NoData,
    Failed(String),
}

/// One row of a roster panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    pub entry: RosterEntry,
    pub slot: SlotState,
}

/// The display for one side of the lobby.
#[derive(Debug, Clone)]
pub struct RosterPanel {
    pub role: RosterRole,
    /// Generation of the batch this panel belongs to; 0 before any roster
    pub generation: u64,
    pub rows: Vec<PlayerRow>,
    pub complete: bool,
}

impl RosterPanel {
    fn new(role: RosterRole) -> Self {
        Self {
            role,
            generation: 0,
            rows: Vec::new(),
            complete: false,
        }
    }

    fn reset(&mut self, batch: RosterBatch, generation: u64) {
        self.generation = generation;
        self.complete = false;
        self.rows = batch
            .entries
            .into_iter()
            .map(|entry| PlayerRow {
                entry,
                slot: SlotState::Loading,
            })
            .collect();
    }

    /// Number of rows still waiting on a lookup.
    pub fn loading(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.slot == SlotState::Loading)
            .count()
    }
}

/// The real-time status line above the panels.
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub text: String,
    pub level: NotificationLevel,
}

/// Everything the companion currently knows and shows.
pub struct SessionState {
    pub gate: ConnectionGate,
    pub notifier: TransientNotifier,
    pub banner: Option<Banner>,
    pub teammates: RosterPanel,
    pub enemies: RosterPanel,
    /// Commands already sent upstream this session
    requested: HashSet<PushCommand>,
    notice_duration_ms: i64,
}

impl SessionState {
    pub fn new(config: &NotificationConfig, updates: UpdateSender) -> Self {
        Self {
            gate: ConnectionGate::new(config.duration_ms, config.refusal_duration_ms),
            notifier: TransientNotifier::new(updates),
            banner: None,
            teammates: RosterPanel::new(RosterRole::Teammates),
            enemies: RosterPanel::new(RosterRole::Enemies),
            requested: HashSet::new(),
            notice_duration_ms: config.duration_ms,
        }
    }

    pub fn panel(&self, role: RosterRole) -> &RosterPanel {
        match role {
            RosterRole::Teammates => &self.teammates,
            RosterRole::Enemies => &self.enemies,
        }
    }

    fn panel_mut(&mut self, role: RosterRole) -> &mut RosterPanel {
        match role {
            RosterRole::Teammates => &mut self.teammates,
            RosterRole::Enemies => &mut self.enemies,
        }
    }

    /// Replace a panel with a freshly dispatched roster.
    pub fn begin_roster(&mut self, batch: RosterBatch, generation: u64) {
        let role = batch.role;
        self.banner = Some(Banner {
            text: format!(
                "Found {} {}, analysing history...",
                batch.len(),
                role.noun()
            ),
            level: match role {
                RosterRole::Teammates => NotificationLevel::Info,
                RosterRole::Enemies => NotificationLevel::Danger,
            },
        });
        self.panel_mut(role).reset(batch, generation);
    }

    /// Show a notice using the configured duration.
    pub fn notice(&mut self, text: impl Into<String>, level: NotificationLevel) {
        let duration = self.notice_duration_ms;
        self.notifier.show(text, level, duration);
    }

    pub fn is_requested(&self, command: PushCommand) -> bool {
        self.requested.contains(&command)
    }

    pub fn mark_requested(&mut self, command: PushCommand) {
        self.requested.insert(command);
    }

    /// Apply one background update. Returns true if anything visible changed.
    pub fn apply(&mut self, update: SessionUpdate) -> bool {
        match update {
            SessionUpdate::ItemSettled {
                role,
                generation,
                identity,
                result,
            } => self.apply_item(role, generation, &identity, result),
            SessionUpdate::BatchComplete { role, generation } => {
                self.apply_complete(role, generation)
            }
            SessionUpdate::NotificationExpired { token } => self.notifier.expire(token),
        }
    }

    fn apply_item(
        &mut self,
        role: RosterRole,
        generation: u64,
        identity: &PlayerIdentity,
        result: LookupResult,
    ) -> bool {
        let panel = self.panel_mut(role);
        if panel.generation != generation {
            tracing::debug!(
                role = role.noun(),
                generation,
                current = panel.generation,
                player = %identity,
                "Dropping result from superseded roster"
            );
            return false;
        }

        // The same player may be listed twice; fill the first open slot.
        let Some(row) = panel
            .rows
            .iter_mut()
            .find(|r| r.slot == SlotState::Loading && &r.entry.identity == identity)
        else {
            tracing::warn!(player = %identity, "No open slot for lookup result");
            return false;
        };

        row.slot = match result {
            Ok(Aggregate::Summary(summary)) => SlotState::Ready(summary),
            Ok(Aggregate::Empty) => SlotState::NoData,
            Err(e) => SlotState::Failed(e.to_string()),
        };
        true
    }

    fn apply_complete(&mut self, role: RosterRole, generation: u64) -> bool {
        let panel = self.panel_mut(role);
        if panel.generation != generation {
            return false;
        }
        panel.complete = true;

        tracing::info!(role = role.noun(), generation, "Roster analysis complete");
        self.banner = Some(Banner {
            text: match role {
                RosterRole::Teammates => {
                    "Teammate analysis complete, waiting for game start".to_string()
                }
                RosterRole::Enemies => "Enemy analysis complete".to_string(),
            },
            level: NotificationLevel::Success,
        });
        true
    }
}
