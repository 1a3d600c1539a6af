//! Per-player statistics over recent match history.

use crate::types::{Aggregate, Kda, MatchRecord, PlayerIdentity, PlayerSummary};

/// Aggregate a player's matches into a summary.
///
/// `matches` must already be ordered most recent first; the first entry
/// becomes `last_match`. An empty history yields [`Aggregate::Empty`].
pub fn aggregate(identity: &PlayerIdentity, matches: &[MatchRecord]) -> Aggregate {
    if matches.is_empty() {
        return Aggregate::Empty;
    }

    let sample_size = matches.len();
    let wins = matches.iter().filter(|m| m.win).count();
    let losses = sample_size - wins;

    let (kills, deaths, assists) = matches.iter().fold((0u64, 0u64, 0u64), |acc, m| {
        (
            acc.0 + u64::from(m.kills),
            acc.1 + u64::from(m.deaths),
            acc.2 + u64::from(m.assists),
        )
    });

    let avg_kda = if deaths == 0 {
        Kda::Perfect
    } else {
        Kda::Ratio(round_to((kills + assists) as f64 / deaths as f64, 2))
    };

    Aggregate::Summary(PlayerSummary {
        identity: identity.clone(),
        sample_size,
        wins,
        losses,
        win_rate_pct: round_to(wins as f64 / sample_size as f64 * 100.0, 1),
        avg_kda,
        last_match: matches.first().cloned(),
    })
}

/// Parse a textual `k/d/a` line.
///
/// Missing or non-numeric parts count as zero. Never fails.
pub fn parse_kda(text: &str) -> (u32, u32, u32) {
    let mut parts = text.split('/');
    let kills = parse_count(parts.next().unwrap_or(""));
    let deaths = parse_count(parts.next().unwrap_or(""));
    let assists = parse_count(parts.next().unwrap_or(""));
    (kills, deaths, assists)
}

/// Leading-digit integer parse: `" 12x"` is 12, `"abc"` and `"-3"` are 0.
fn parse_count(part: &str) -> u32 {
    let digits: String = part
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// How a player's win rate reads at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinRateTier {
    /// 60% and above
    Strong,
    /// 50% up to 60%
    Even,
    /// Below 50%
    Weak,
}

impl WinRateTier {
    pub fn from_pct(pct: f64) -> Self {
        if pct >= 60.0 {
            WinRateTier::Strong
        } else if pct >= 50.0 {
            WinRateTier::Even
        } else {
            WinRateTier::Weak
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
