//! Pure rendering of [`SessionState`] into display data.
//!
//! The view carries text and tone only; a front end maps tones to colors.
//! `now` is passed in so rendering is deterministic.

use chrono::{DateTime, Utc};

use crate::format::format_relative_time_opt;
use crate::session::{PlayerRow, RosterPanel, SessionState, SlotState};
use crate::stats::WinRateTier;
use crate::types::{ConnectionState, NotificationLevel, PlayerSummary, RosterRole};

/// Display tone of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Muted,
    Info,
    Success,
    Warning,
    Danger,
}

impl From<NotificationLevel> for Tone {
    fn from(level: NotificationLevel) -> Self {
        match level {
            NotificationLevel::Info => Tone::Info,
            NotificationLevel::Success => Tone::Success,
            NotificationLevel::Warning => Tone::Warning,
            NotificationLevel::Danger => Tone::Danger,
        }
    }
}

/// Text with a tone.
#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub text: String,
    pub tone: Tone,
}

impl Badge {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

/// One player line in a panel.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub riot_id: String,
    pub link: String,
    pub champion: Option<String>,
    pub headline: Badge,
    pub detail: Option<String>,
}

/// One roster panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub title: String,
    pub tone: Tone,
    pub rows: Vec<RowView>,
}

/// Everything a front end needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub connection: Badge,
    pub banner: Option<Badge>,
    pub notification: Option<Badge>,
    pub teammates: PanelView,
    pub enemies: PanelView,
}

/// Render the session.
pub fn render(state: &SessionState, now: DateTime<Utc>) -> SessionView {
    SessionView {
        connection: connection_badge(state),
        banner: state
            .banner
            .as_ref()
            .map(|b| Badge::new(b.text.clone(), b.level.into())),
        notification: state
            .notifier
            .current()
            .map(|n| Badge::new(n.text.clone(), n.level.into())),
        teammates: render_panel(&state.teammates, now),
        enemies: render_panel(&state.enemies, now),
    }
}

fn connection_badge(state: &SessionState) -> Badge {
    let gate = &state.gate;
    let tone = match gate.state() {
        ConnectionState::Unknown => Tone::Muted,
        ConnectionState::Connecting => Tone::Info,
        ConnectionState::Connected => Tone::Success,
        ConnectionState::Failed => Tone::Danger,
    };
    let text = gate
        .last_message()
        .map(str::to_string)
        .unwrap_or_else(|| "Waiting for client status...".to_string());
    Badge::new(text, tone)
}

fn render_panel(panel: &RosterPanel, now: DateTime<Utc>) -> PanelView {
    let (noun, tone) = match panel.role {
        RosterRole::Teammates => ("Teammates", Tone::Info),
        RosterRole::Enemies => ("Enemies", Tone::Danger),
    };

    let title = if panel.generation == 0 {
        noun.to_string()
    } else if panel.complete {
        format!("{} ({})", noun, panel.rows.len())
    } else {
        format!(
            "{} ({}, {} loading)",
            noun,
            panel.rows.len(),
            panel.loading()
        )
    };

    PanelView {
        title,
        tone,
        rows: panel.rows.iter().map(|row| render_row(row, now)).collect(),
    }
}

fn render_row(row: &PlayerRow, now: DateTime<Utc>) -> RowView {
    let identity = &row.entry.identity;
    let (headline, detail) = match &row.slot {
        SlotState::Loading => (Badge::new("Loading...", Tone::Muted), None),
        SlotState::NoData => (Badge::new("No match data", Tone::Warning), None),
        SlotState::Failed(message) => (
            Badge::new(format!("Lookup failed: {}", message), Tone::Danger),
            None,
        ),
        SlotState::Ready(summary) => (summary_headline(summary), summary_detail(summary, now)),
    };

    RowView {
        riot_id: identity.riot_id(),
        link: identity.detail_path(),
        champion: row.entry.champion.clone(),
        headline,
        detail,
    }
}

fn summary_headline(summary: &PlayerSummary) -> Badge {
    let tone = match WinRateTier::from_pct(summary.win_rate_pct) {
        WinRateTier::Strong => Tone::Success,
        WinRateTier::Even => Tone::Warning,
        WinRateTier::Weak => Tone::Danger,
    };
    Badge::new(
        format!(
            "Last {}: {}W {}L ({:.1}%)  KDA {}",
            summary.sample_size, summary.wins, summary.losses, summary.win_rate_pct, summary.avg_kda
        ),
        tone,
    )
}

fn summary_detail(summary: &PlayerSummary, now: DateTime<Utc>) -> Option<String> {
    summary.last_match.as_ref().map(|m| {
        format!(
            "Last game: {} {} {} | {} | {}",
            if m.win { "Win" } else { "Loss" },
            m.champion_id,
            m.kda_text(),
            m.mode,
            format_relative_time_opt(m.played_at, now)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationConfig;
    use crate::types::{Kda, MatchRecord, PlayerIdentity, RosterBatch, RosterEntry};
    use crate::session::SessionUpdate;
    use chrono::TimeZone;
    use tokio::sync::mpsc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn state() -> SessionState {
        let (tx, _rx) = mpsc::unbounded_channel();
        SessionState::new(&NotificationConfig::default(), tx)
    }

    #[test]
    fn test_initial_view() {
        let view = render(&state(), now());
        assert_eq!(view.connection.tone, Tone::Muted);
        assert!(view.banner.is_none());
        assert!(view.notification.is_none());
        assert_eq!(view.teammates.title, "Teammates");
        assert!(view.enemies.rows.is_empty());
    }

    #[test]
    fn test_rows_render_each_slot_state() {
        let mut s = state();
        let entries = ["A", "B", "C", "D"]
            .iter()
            .map(|n| RosterEntry {
                identity: PlayerIdentity::new(*n, "1"),
                champion: (*n == "A").then(|| "Ahri".to_string()),
            })
            .collect();
        s.begin_roster(RosterBatch::new(RosterRole::Enemies, entries), 1);

        let summary = PlayerSummary {
            identity: PlayerIdentity::new("A", "1"),
            sample_size: 5,
            wins: 3,
            losses: 2,
            win_rate_pct: 60.0,
            avg_kda: Kda::Ratio(2.5),
            last_match: Some(MatchRecord {
                champion_id: "Ahri".to_string(),
                kills: 10,
                deaths: 2,
                assists: 7,
                win: true,
                mode: "ARAM".to_string(),
                played_at: Some(now() - chrono::Duration::hours(2)),
            }),
        };
        let updates = vec![
            ("A", Ok(crate::types::Aggregate::Summary(summary))),
            ("B", Ok(crate::types::Aggregate::Empty)),
            (
                "C",
                Err(crate::error::Error::Backend("timeout".to_string())),
            ),
        ];
        for (name, result) in updates {
            s.apply(SessionUpdate::ItemSettled {
                role: RosterRole::Enemies,
                generation: 1,
                identity: PlayerIdentity::new(name, "1"),
                result,
            });
        }

        let view = render(&s, now());
        assert_eq!(view.enemies.title, "Enemies (4, 1 loading)");
        let rows = &view.enemies.rows;

        assert_eq!(rows[0].riot_id, "A#1");
        assert_eq!(rows[0].link, "/summoner/A%231");
        assert_eq!(rows[0].champion.as_deref(), Some("Ahri"));
        assert_eq!(rows[0].headline.text, "Last 5: 3W 2L (60.0%)  KDA 2.50");
        assert_eq!(rows[0].headline.tone, Tone::Success);
        assert_eq!(
            rows[0].detail.as_deref(),
            Some("Last game: Win Ahri 10/2/7 | ARAM | 2h ago")
        );

        assert_eq!(rows[1].headline, Badge::new("No match data", Tone::Warning));
        assert_eq!(rows[2].headline.tone, Tone::Danger);
        assert!(rows[2].headline.text.contains("timeout"));
        assert_eq!(rows[3].headline, Badge::new("Loading...", Tone::Muted));
    }
}
