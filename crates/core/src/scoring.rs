//! Pure scoring logic: result tiers, timed scores, leaderboard aggregation.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{GameSession, SessionStatus};
use crate::types::{Id, Timestamp};

/// Result tier for a completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Perfect,
    Expert,
    Buff,
    Novice,
}

/// Classify a score into a tier.
///
/// The 100% check takes precedence over the >= 80% band so a flawless
/// round is always `Perfect`, never just `Expert`.
pub fn classify_tier(score: i32, total_questions: i32) -> Tier {
    let percentage = percentage(score, total_questions);
    if percentage == 100.0 {
        Tier::Perfect
    } else if percentage >= 80.0 {
        Tier::Expert
    } else if percentage >= 60.0 {
        Tier::Buff
    } else {
        Tier::Novice
    }
}

/// Score as a percentage of the total. Zero-question sessions score 0.
pub fn percentage(score: i32, total_questions: i32) -> f64 {
    if total_questions <= 0 {
        return 0.0;
    }
    f64::from(score) / f64::from(total_questions) * 100.0
}

/// Timed score: correctness percentage minus a completion-time penalty of
/// one point per ten seconds, capped at 20, floored at zero.
pub fn calculate_timed_score(correct: i32, total_questions: i32, elapsed_secs: f64) -> i32 {
    let base = percentage(correct, total_questions);
    let penalty = (elapsed_secs / 10.0).min(20.0);
    (base - penalty).round().max(0.0) as i32
}

/// Leaderboard time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "all-time")]
    AllTime,
}

impl Period {
    /// Inclusive lower bound on `created_at` for sessions counted in this
    /// window, or `None` for all-time.
    pub fn cutoff(self, now: Timestamp) -> Option<Timestamp> {
        match self {
            Period::Daily => Some(
                now.date_naive()
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight is always a valid time")
                    .and_utc(),
            ),
            Period::Weekly => Some(now - Duration::days(7)),
            Period::AllTime => None,
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::AllTime
    }
}

/// One ranked leaderboard row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub user_id: Id,
    pub display_name: String,
    pub total_score: i64,
    pub games_played: i64,
    pub average_score: i64,
}

/// Aggregate completed sessions into ranked leaderboard rows.
///
/// Groups by host user, sums scores, and sorts by total score descending
/// with an alphabetical tie-break on display name so equal scores order
/// deterministically regardless of insertion order. Non-completed sessions
/// are skipped defensively even though callers pre-filter.
pub fn aggregate_leaderboard(
    sessions: &[GameSession],
    display_names: &HashMap<Id, String>,
    limit: usize,
) -> Vec<LeaderboardRow> {
    let mut stats: HashMap<&str, (i64, i64)> = HashMap::new();
    for session in sessions {
        if session.status != SessionStatus::Completed {
            continue;
        }
        let entry = stats.entry(session.host_user_id.as_str()).or_insert((0, 0));
        entry.0 += i64::from(session.score);
        entry.1 += 1;
    }

    let mut rows: Vec<LeaderboardRow> = stats
        .into_iter()
        .map(|(user_id, (total_score, games_played))| {
            let display_name = display_names
                .get(user_id)
                .cloned()
                .unwrap_or_else(|| fallback_display_name(user_id));
            LeaderboardRow {
                user_id: user_id.to_string(),
                display_name,
                total_score,
                games_played,
                average_score: (total_score as f64 / games_played as f64).round() as i64,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    rows.truncate(limit);
    rows
}

/// Display name used when the user record is unavailable.
pub fn fallback_display_name(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(8).collect();
    format!("Player {prefix}")
}

/// Convenience for "now" based cutoffs at call sites.
pub fn now() -> Timestamp {
    Utc::now()
}
