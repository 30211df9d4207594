//! Interest-based matchmaking over the queue.
//!
//! Poll-driven: clients call [`MatchmakingEngine::find_match`] every couple
//! of seconds until matched or abandoned. Groups are 2 to 3 players; a
//! quality match requires at least one shared interest, and after the
//! timeout the engine falls back to pairing with whoever is waiting.
//!
//! Any participant of a forming group may be the one whose poll completes
//! the match, so the `waiting -> matched` transition goes through
//! [`Storage::try_claim_for_match`]. Exactly one claimant wins and
//! publishes the session linkage; losers re-read their own entry and
//! return the winner's result.

use std::sync::Arc;

use chrono::{Duration, Utc};

use krossfire_core::error::CoreError;
use krossfire_core::interests;
use krossfire_core::queue::{MatchResult, NewQueueEntry, QueueEntry, QueueEntryPatch, QueueStatus};
use krossfire_core::session::{NewGameSession, SessionStatus};
use krossfire_core::storage::Storage;
use krossfire_core::types::{new_id, Id};

/// Tuning knobs for the matchmaking engine.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// How long a caller waits for a quality match before the random
    /// fallback kicks in. Also the queue-entry TTL refreshed on join.
    pub timeout: Duration,
    /// Total group size cap, requester included.
    pub max_players: usize,
    /// Expired entries survive this long past `expires_at` before cleanup
    /// deletes them.
    pub cleanup_grace: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::seconds(15),
            max_players: 3,
            cleanup_grace: Duration::seconds(60),
        }
    }
}

pub struct MatchmakingEngine {
    storage: Arc<dyn Storage>,
    config: MatchConfig,
}

impl MatchmakingEngine {
    pub fn new(storage: Arc<dyn Storage>, config: MatchConfig) -> Self {
        Self { storage, config }
    }

    /// Join the queue, or refresh the expiry of an existing active entry.
    ///
    /// Interests are normalized (trim, lowercase, dedup) before storage;
    /// an effectively empty set is rejected without touching the store.
    pub async fn join_queue(
        &self,
        user_id: &str,
        raw_interests: &[String],
    ) -> Result<QueueEntry, CoreError> {
        let interests = interests::normalize(raw_interests);
        if interests.is_empty() {
            return Err(CoreError::Validation(
                "at least one non-empty interest is required".into(),
            ));
        }

        let expires_at = Utc::now() + self.config.timeout;
        if let Some(existing) = self.storage.get_active_queue_entry(user_id).await? {
            tracing::debug!(user_id, entry_id = %existing.id, "refreshing queue entry");
            return self
                .storage
                .update_queue_entry(
                    &existing.id,
                    QueueEntryPatch {
                        expires_at: Some(expires_at),
                        ..Default::default()
                    },
                )
                .await;
        }

        let entry = self
            .storage
            .create_queue_entry(NewQueueEntry {
                user_id: user_id.to_string(),
                interests,
                expires_at,
            })
            .await?;
        tracing::info!(user_id, entry_id = %entry.id, "joined matchmaking queue");
        Ok(entry)
    }

    /// One matchmaking poll for this user.
    pub async fn find_match(&self, user_id: &str) -> Result<MatchResult, CoreError> {
        let Some(entry) = self.storage.get_active_queue_entry(user_id).await? else {
            return Ok(MatchResult::not_in_queue());
        };

        if let Some(result) = Self::existing_match(&entry) {
            return Ok(result);
        }

        let elapsed = (Utc::now() - entry.created_at).num_milliseconds();
        let timed_out = elapsed >= self.config.timeout.num_milliseconds();
        let waiting = self.storage.get_waiting_players(user_id).await?;

        if waiting.is_empty() {
            if timed_out {
                self.storage
                    .update_queue_entry(
                        &entry.id,
                        QueueEntryPatch {
                            status: Some(QueueStatus::Expired),
                            ..Default::default()
                        },
                    )
                    .await?;
                tracing::info!(user_id, elapsed_ms = elapsed, "queue entry expired unmatched");
            }
            return Ok(MatchResult::waiting(elapsed));
        }

        let max_partners = self.config.max_players.saturating_sub(1);
        let quality = rank_candidates(&entry.interests, waiting.clone(), max_partners);

        let partners = if !quality.is_empty() {
            quality
        } else if timed_out {
            // Random fallback: whoever has waited longest, interests ignored.
            waiting.into_iter().take(max_partners).collect()
        } else {
            return Ok(MatchResult::waiting(elapsed));
        };

        self.create_match(&entry, &partners, elapsed).await
    }

    /// Transition a `waiting` entry to `expired`. A no-op for entries that
    /// are already matched or gone, including a leave racing a concurrent
    /// match completion.
    pub async fn leave_queue(&self, user_id: &str) -> Result<(), CoreError> {
        if let Some(entry) = self.storage.get_active_queue_entry(user_id).await? {
            if entry.status == QueueStatus::Waiting {
                self.storage
                    .update_queue_entry(
                        &entry.id,
                        QueueEntryPatch {
                            status: Some(QueueStatus::Expired),
                            ..Default::default()
                        },
                    )
                    .await?;
                tracing::info!(user_id, "left matchmaking queue");
            }
        }
        Ok(())
    }

    /// Delete rows past expiry plus the configured grace period. Idempotent
    /// and safe under concurrent invocation.
    pub async fn cleanup_expired_entries(&self) -> Result<u64, CoreError> {
        let removed = self
            .storage
            .delete_expired_queue_entries(Utc::now(), self.config.cleanup_grace)
            .await?;
        if removed > 0 {
            tracing::info!(removed, "cleaned up expired queue entries");
        }
        Ok(removed)
    }

    fn existing_match(entry: &QueueEntry) -> Option<MatchResult> {
        if entry.status != QueueStatus::Matched {
            return None;
        }
        match (&entry.matched_with, &entry.game_session_id) {
            (Some(players), Some(session_id)) => Some(MatchResult::matched(
                players.clone(),
                session_id.clone(),
                None,
            )),
            _ => None,
        }
    }

    async fn create_match(
        &self,
        requester: &QueueEntry,
        partners: &[QueueEntry],
        elapsed: i64,
    ) -> Result<MatchResult, CoreError> {
        let mut player_ids: Vec<Id> = Vec::with_capacity(partners.len() + 1);
        player_ids.push(requester.user_id.clone());
        player_ids.extend(partners.iter().map(|p| p.user_id.clone()));

        let mut entry_ids: Vec<Id> = Vec::with_capacity(partners.len() + 1);
        entry_ids.push(requester.id.clone());
        entry_ids.extend(partners.iter().map(|p| p.id.clone()));

        // Claim first with a pre-generated session id; only the winner
        // creates the session, so a lost race leaves no orphan row.
        let session_id = new_id();
        if self
            .storage
            .try_claim_for_match(&entry_ids, &player_ids, &session_id)
            .await?
        {
            let session = self
                .storage
                .create_game_session(NewGameSession {
                    id: session_id,
                    host_user_id: requester.user_id.clone(),
                    movie_id: None,
                    total_questions: 5,
                    mode: "krossfire".into(),
                    status: SessionStatus::Lobby,
                })
                .await?;
            tracing::info!(
                host = %requester.user_id,
                players = player_ids.len(),
                session_id = %session.id,
                "match created"
            );
            return Ok(MatchResult::matched(player_ids, session.id, Some(elapsed)));
        }

        // Lost the claim race. Re-read our own entry: the winner may have
        // matched us into their group.
        tracing::debug!(user_id = %requester.user_id, "lost match claim, re-reading entry");
        match self.storage.get_active_queue_entry(&requester.user_id).await? {
            Some(current) => Ok(Self::existing_match(&current)
                .unwrap_or_else(|| MatchResult::waiting(elapsed))),
            None => Ok(MatchResult::not_in_queue()),
        }
    }
}

/// Rank waiting candidates for a quality match.
///
/// Scores each candidate by interest overlap with the requester, keeps
/// those sharing at least one tag, orders by score descending with a FIFO
/// tiebreak on `created_at`, and truncates to the group's free slots.
fn rank_candidates(
    requester_interests: &[String],
    candidates: Vec<QueueEntry>,
    max_partners: usize,
) -> Vec<QueueEntry> {
    let mut scored: Vec<(usize, QueueEntry)> = candidates
        .into_iter()
        .map(|c| (interests::overlap(requester_interests, &c.interests), c))
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .cmp(score_a)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    scored
        .into_iter()
        .take(max_partners)
        .map(|(_, c)| c)
        .collect()
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
