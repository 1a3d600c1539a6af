//! Core domain types for riftwatch
//!
//! These types describe what the companion knows about a live session: who
//! is in the lobby, what their recent matches look like, and what the user
//! is currently being told.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Identity** | A player's Riot ID, `gameName#tagLine` |
//! | **Roster** | One pushed set of identities (teammates or enemies) |
//! | **Batch** | The lookups fanned out for one roster |
//! | **Summary** | Aggregated statistics over a player's recent matches |
//! | **Notification** | The single transient message slot |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================
// Players
// ============================================

/// A player's Riot ID.
///
/// Equality is an exact, case-sensitive match on both parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerIdentity {
    name: String,
    tag: String,
}

impl PlayerIdentity {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Game name (the part before `#`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag line (the part after `#`)
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Full Riot ID, `name#tag`
    pub fn riot_id(&self) -> String {
        format!("{}#{}", self.name, self.tag)
    }

    /// Path of the per-player detail page on the backend.
    pub fn detail_path(&self) -> String {
        format!("/summoner/{}", urlencoding::encode(&self.riot_id()))
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.tag)
    }
}

// ============================================
// Matches and summaries
// ============================================

/// One match from a player's history, most recent first in any sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub champion_id: String,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub win: bool,
    pub mode: String,
    /// When the match was created, if the backend reported it
    pub played_at: Option<DateTime<Utc>>,
}

impl MatchRecord {
    /// The match line as `k/d/a`.
    pub fn kda_text(&self) -> String {
        format!("{}/{}/{}", self.kills, self.deaths, self.assists)
    }
}

/// Average KDA over a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Kda {
    /// `(kills + assists) / deaths`, rounded to two decimals
    Ratio(f64),
    /// No deaths across the whole sample
    Perfect,
}

impl fmt::Display for Kda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kda::Ratio(value) => write!(f, "{:.2}", value),
            Kda::Perfect => f.write_str("Perfect"),
        }
    }
}

/// Aggregated statistics over a player's recent matches.
///
/// `wins + losses == sample_size` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub identity: PlayerIdentity,
    pub sample_size: usize,
    pub wins: usize,
    pub losses: usize,
    /// Win rate in percent, rounded to one decimal
    pub win_rate_pct: f64,
    pub avg_kda: Kda,
    pub last_match: Option<MatchRecord>,
}

/// Outcome of aggregating one player's history.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Summary(PlayerSummary),
    /// The player has no matches; displayed as "no data", not as an error
    Empty,
}

// ============================================
// Rosters
// ============================================

/// Which side of the lobby a roster describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterRole {
    Teammates,
    Enemies,
}

impl RosterRole {
    /// Plural noun used in banners ("teammates", "enemies")
    pub fn noun(&self) -> &'static str {
        match self {
            RosterRole::Teammates => "teammates",
            RosterRole::Enemies => "enemies",
        }
    }
}

/// One player in a roster.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub identity: PlayerIdentity,
    /// Champion the player has locked in, when the push event carried one
    pub champion: Option<String>,
}

/// One received roster, rendered as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterBatch {
    pub role: RosterRole,
    pub entries: Vec<RosterEntry>,
}

impl RosterBatch {
    pub fn new(role: RosterRole, entries: Vec<RosterEntry>) -> Self {
        Self { role, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identities in roster order.
    pub fn identities(&self) -> impl Iterator<Item = &PlayerIdentity> {
        self.entries.iter().map(|e| &e.identity)
    }
}

// ============================================
// Connection and notifications
// ============================================

/// Connection state of the game client as reported over the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unknown,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Unknown => "unknown",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tone of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Danger,
}

/// The content of the notification slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub text: String,
    pub level: NotificationLevel,
    /// `None` means the notification stays until cleared
    pub expires_at: Option<DateTime<Utc>>,
}
