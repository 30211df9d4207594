//! Integration tests for the matchmaking engine over in-memory storage.
//!
//! Timeout paths are exercised by backdating entries instead of sleeping.

use std::sync::Arc;

use chrono::{Duration, Utc};

use krossfire_core::error::CoreError;
use krossfire_core::queue::QueueStatus;
use krossfire_core::session::SessionStatus;
use krossfire_core::storage::Storage;
use krossfire_db::memory::MemoryStorage;
use krossfire_engine::{MatchConfig, MatchmakingEngine};

fn engine(storage: &Arc<MemoryStorage>) -> MatchmakingEngine {
    MatchmakingEngine::new(storage.clone(), MatchConfig::default())
}

fn duo_engine(storage: &Arc<MemoryStorage>) -> MatchmakingEngine {
    MatchmakingEngine::new(
        storage.clone(),
        MatchConfig {
            max_players: 2,
            ..MatchConfig::default()
        },
    )
}

fn tags(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

/// Backdate a user's entry so the engine sees it as older than the timeout.
async fn age_entry(storage: &Arc<MemoryStorage>, user_id: &str, secs: i64) {
    let entry = storage
        .get_active_queue_entry(user_id)
        .await
        .unwrap()
        .unwrap();
    storage.backdate_entry(&entry.id, Utc::now() - Duration::seconds(secs));
}

// ---------------------------------------------------------------------------
// Joining
// ---------------------------------------------------------------------------

/// Re-joining refreshes the existing entry instead of creating a duplicate.
#[tokio::test]
async fn rejoin_refreshes_instead_of_duplicating() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    let first = engine.join_queue("u1", &tags(&["sci-fi"])).await.unwrap();
    let second = engine.join_queue("u1", &tags(&["sci-fi"])).await.unwrap();

    assert_eq!(first.id, second.id);
    assert!(second.expires_at >= first.expires_at);
    // Only one waiting entry exists from any other user's perspective.
    assert_eq!(storage.get_waiting_players("someone-else").await.unwrap().len(), 1);
}

#[tokio::test]
async fn join_normalizes_interests() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    let entry = engine
        .join_queue("u1", &tags(&["  Sci-Fi ", "COMEDY", "sci-fi"]))
        .await
        .unwrap();
    assert_eq!(entry.interests, tags(&["sci-fi", "comedy"]));
}

#[tokio::test]
async fn join_rejects_effectively_empty_interests() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    let err = engine.join_queue("u1", &tags(&["", "   "])).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert!(storage.get_active_queue_entry("u1").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Quality matching
// ---------------------------------------------------------------------------

/// A successful match includes the requester and has 2 or 3 players.
#[tokio::test]
async fn match_includes_requester_and_is_bounded() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    for user in ["u1", "u2", "u3", "u4"] {
        engine.join_queue(user, &tags(&["sci-fi"])).await.unwrap();
    }

    let result = engine.find_match("u1").await.unwrap();
    assert!(result.matched);
    let players = result.matched_players.unwrap();
    assert_eq!(players.len(), 3);
    assert!(players.contains(&"u1".to_string()));
    assert!(result.game_session_id.is_some());
}

/// With room for one partner, the higher-overlap candidate wins.
#[tokio::test]
async fn prefers_candidate_with_more_shared_interests() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = duo_engine(&storage);

    engine.join_queue("req", &tags(&["a", "b"])).await.unwrap();
    engine.join_queue("x", &tags(&["a", "b"])).await.unwrap();
    engine.join_queue("y", &tags(&["a"])).await.unwrap();

    let result = engine.find_match("req").await.unwrap();
    assert!(result.matched);
    assert_eq!(
        result.matched_players.unwrap(),
        vec!["req".to_string(), "x".to_string()]
    );
}

/// Equal overlap scores fall back to FIFO order on join time.
#[tokio::test]
async fn equal_scores_match_oldest_candidate_first() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = duo_engine(&storage);

    engine.join_queue("req", &tags(&["a"])).await.unwrap();
    engine.join_queue("newer", &tags(&["a"])).await.unwrap();
    engine.join_queue("older", &tags(&["a"])).await.unwrap();
    age_entry(&storage, "older", 10).await;

    let result = engine.find_match("req").await.unwrap();
    assert_eq!(
        result.matched_players.unwrap(),
        vec!["req".to_string(), "older".to_string()]
    );
}

/// The winning claim creates a lobby session hosted by the requester.
#[tokio::test]
async fn match_opens_lobby_session_hosted_by_requester() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    engine.join_queue("u1", &tags(&["a"])).await.unwrap();
    engine.join_queue("u2", &tags(&["a"])).await.unwrap();

    let result = engine.find_match("u2").await.unwrap();
    let session_id = result.game_session_id.unwrap();
    let session = storage.get_game_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Lobby);
    assert_eq!(session.host_user_id, "u2");
}

// ---------------------------------------------------------------------------
// Timeout and fallback
// ---------------------------------------------------------------------------

/// Before the timeout, zero shared interests means keep waiting.
#[tokio::test]
async fn no_shared_interests_waits_before_timeout() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    engine.join_queue("u1", &tags(&["sci-fi"])).await.unwrap();
    engine.join_queue("u2", &tags(&["horror"])).await.unwrap();

    let result = engine.find_match("u1").await.unwrap();
    assert!(!result.matched);
    assert!(result.wait_time_ms.is_some());
    // Both entries stay waiting.
    let entry = storage.get_active_queue_entry("u1").await.unwrap().unwrap();
    assert_eq!(entry.status, QueueStatus::Waiting);
}

/// After the timeout the engine pairs with anyone waiting at all.
#[tokio::test]
async fn random_fallback_after_timeout() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    engine.join_queue("u1", &tags(&["sci-fi"])).await.unwrap();
    engine.join_queue("u2", &tags(&["horror"])).await.unwrap();
    age_entry(&storage, "u1", 16).await;

    let result = engine.find_match("u1").await.unwrap();
    assert!(result.matched);
    let players = result.matched_players.unwrap();
    assert_eq!(players.len(), 2);
    assert!(players.contains(&"u2".to_string()));
}

/// With nobody else waiting, a timed-out poll expires the entry.
#[tokio::test]
async fn lonely_timeout_expires_the_entry() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    engine.join_queue("u1", &tags(&["sci-fi"])).await.unwrap();
    age_entry(&storage, "u1", 16).await;

    let result = engine.find_match("u1").await.unwrap();
    assert!(!result.matched);
    // Entry is no longer active; the next poll reports not-in-queue.
    assert!(storage.get_active_queue_entry("u1").await.unwrap().is_none());
    let next = engine.find_match("u1").await.unwrap();
    assert!(!next.matched);
    assert!(next.wait_time_ms.is_none());
}

// ---------------------------------------------------------------------------
// Convergence and races
// ---------------------------------------------------------------------------

/// Both members of a formed group converge on the same session id.
#[tokio::test]
async fn partner_poll_returns_the_same_session() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    engine.join_queue("u1", &tags(&["a"])).await.unwrap();
    engine.join_queue("u2", &tags(&["a"])).await.unwrap();

    let first = engine.find_match("u1").await.unwrap();
    let second = engine.find_match("u2").await.unwrap();

    assert!(first.matched && second.matched);
    assert_eq!(first.game_session_id, second.game_session_id);
    assert_eq!(
        first.matched_players.as_ref().map(|p| {
            let mut sorted = p.clone();
            sorted.sort();
            sorted
        }),
        second.matched_players.map(|mut p| {
            p.sort();
            p
        })
    );
}

/// Storage wrapper that yields to the scheduler after the waiting-list
/// read, so two concurrent polls both compute a pairing before either
/// reaches the claim.
struct YieldingStorage {
    inner: MemoryStorage,
}

#[async_trait::async_trait]
impl Storage for YieldingStorage {
    async fn create_queue_entry(
        &self,
        entry: krossfire_core::queue::NewQueueEntry,
    ) -> Result<krossfire_core::queue::QueueEntry, CoreError> {
        self.inner.create_queue_entry(entry).await
    }

    async fn get_active_queue_entry(
        &self,
        user_id: &str,
    ) -> Result<Option<krossfire_core::queue::QueueEntry>, CoreError> {
        self.inner.get_active_queue_entry(user_id).await
    }

    async fn get_waiting_players(
        &self,
        exclude_user_id: &str,
    ) -> Result<Vec<krossfire_core::queue::QueueEntry>, CoreError> {
        let waiting = self.inner.get_waiting_players(exclude_user_id).await?;
        tokio::task::yield_now().await;
        Ok(waiting)
    }

    async fn update_queue_entry(
        &self,
        id: &str,
        patch: krossfire_core::queue::QueueEntryPatch,
    ) -> Result<krossfire_core::queue::QueueEntry, CoreError> {
        self.inner.update_queue_entry(id, patch).await
    }

    async fn try_claim_for_match(
        &self,
        entry_ids: &[String],
        matched_with: &[String],
        game_session_id: &str,
    ) -> Result<bool, CoreError> {
        self.inner
            .try_claim_for_match(entry_ids, matched_with, game_session_id)
            .await
    }

    async fn delete_expired_queue_entries(
        &self,
        now: chrono::DateTime<Utc>,
        grace: Duration,
    ) -> Result<u64, CoreError> {
        self.inner.delete_expired_queue_entries(now, grace).await
    }

    async fn reserve_questions(
        &self,
        user_id: &str,
        movie_id: &str,
        count: usize,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Vec<krossfire_core::trivia::TriviaQuestion>, CoreError> {
        self.inner
            .reserve_questions(user_id, movie_id, count, category, difficulty)
            .await
    }

    async fn get_seen_question_ids(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> Result<Vec<String>, CoreError> {
        self.inner.get_seen_question_ids(user_id, movie_id).await
    }

    async fn clear_seen_questions(
        &self,
        user_id: &str,
        movie_id: &str,
        category: Option<&str>,
    ) -> Result<u64, CoreError> {
        self.inner
            .clear_seen_questions(user_id, movie_id, category)
            .await
    }

    async fn upsert_question(
        &self,
        question: krossfire_core::trivia::NewTriviaQuestion,
    ) -> Result<krossfire_core::trivia::TriviaQuestion, CoreError> {
        self.inner.upsert_question(question).await
    }

    async fn questions_by_filter(
        &self,
        movie_id: &str,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Vec<krossfire_core::trivia::TriviaQuestion>, CoreError> {
        self.inner
            .questions_by_filter(movie_id, category, difficulty)
            .await
    }

    async fn get_movie(
        &self,
        id: &str,
    ) -> Result<Option<krossfire_core::movie::Movie>, CoreError> {
        self.inner.get_movie(id).await
    }

    async fn create_game_session(
        &self,
        session: krossfire_core::session::NewGameSession,
    ) -> Result<krossfire_core::session::GameSession, CoreError> {
        self.inner.create_game_session(session).await
    }

    async fn get_game_session(
        &self,
        id: &str,
    ) -> Result<Option<krossfire_core::session::GameSession>, CoreError> {
        self.inner.get_game_session(id).await
    }

    async fn update_game_session(
        &self,
        id: &str,
        patch: krossfire_core::session::GameSessionPatch,
    ) -> Result<krossfire_core::session::GameSession, CoreError> {
        self.inner.update_game_session(id, patch).await
    }

    async fn sessions_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<krossfire_core::session::GameSession>, CoreError> {
        self.inner.sessions_by_user(user_id).await
    }

    async fn completed_sessions_by_mode(
        &self,
        mode: &str,
        since: Option<chrono::DateTime<Utc>>,
    ) -> Result<Vec<krossfire_core::session::GameSession>, CoreError> {
        self.inner.completed_sessions_by_mode(mode, since).await
    }

    async fn create_answer(
        &self,
        answer: krossfire_core::session::NewAnswer,
    ) -> Result<krossfire_core::session::Answer, CoreError> {
        self.inner.create_answer(answer).await
    }

    async fn answers_by_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<krossfire_core::session::Answer>, CoreError> {
        self.inner.answers_by_session(session_id).await
    }

    async fn display_name(&self, user_id: &str) -> Result<String, CoreError> {
        self.inner.display_name(user_id).await
    }
}

/// Two interleaved polls for the same pair race on the claim; both converge
/// on the winner's session and only the winner creates one.
#[tokio::test]
async fn interleaved_polls_create_exactly_one_session() {
    let storage = Arc::new(YieldingStorage {
        inner: MemoryStorage::new(),
    });
    let engine = MatchmakingEngine::new(storage.clone(), MatchConfig::default());

    engine.join_queue("u1", &tags(&["a"])).await.unwrap();
    engine.join_queue("u2", &tags(&["a"])).await.unwrap();

    let (first, second) = tokio::join!(engine.find_match("u1"), engine.find_match("u2"));
    let first = first.unwrap();
    let second = second.unwrap();

    assert!(first.matched && second.matched);
    assert_eq!(first.game_session_id, second.game_session_id);

    // The claim loser backed off without inserting a session.
    let sessions = [
        storage.sessions_by_user("u1").await.unwrap(),
        storage.sessions_by_user("u2").await.unwrap(),
    ]
    .concat();
    assert_eq!(sessions.len(), 1);
    assert_eq!(
        Some(sessions[0].id.clone()),
        first.game_session_id
    );
}

/// Repeated polls after a match are idempotent reads.
#[tokio::test]
async fn find_match_is_idempotent_once_matched() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    engine.join_queue("u1", &tags(&["a"])).await.unwrap();
    engine.join_queue("u2", &tags(&["a"])).await.unwrap();

    let first = engine.find_match("u1").await.unwrap();
    let again = engine.find_match("u1").await.unwrap();
    assert_eq!(first.game_session_id, again.game_session_id);
}

/// Leaving after being matched is a tolerated no-op.
#[tokio::test]
async fn leave_is_noop_on_matched_entry() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    engine.join_queue("u1", &tags(&["a"])).await.unwrap();
    engine.join_queue("u2", &tags(&["a"])).await.unwrap();
    engine.find_match("u1").await.unwrap();

    engine.leave_queue("u2").await.unwrap();
    let entry = storage.get_active_queue_entry("u2").await.unwrap().unwrap();
    assert_eq!(entry.status, QueueStatus::Matched);
}

#[tokio::test]
async fn leave_expires_a_waiting_entry() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = engine(&storage);

    engine.join_queue("u1", &tags(&["a"])).await.unwrap();
    engine.leave_queue("u1").await.unwrap();
    assert!(storage.get_active_queue_entry("u1").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

/// Cleanup removes entries past expiry plus grace, and is idempotent.
#[tokio::test]
async fn cleanup_deletes_only_past_grace() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = MatchmakingEngine::new(
        storage.clone(),
        MatchConfig {
            cleanup_grace: Duration::seconds(60),
            ..MatchConfig::default()
        },
    );

    let entry = engine.join_queue("u1", &tags(&["a"])).await.unwrap();
    storage
        .update_queue_entry(
            &entry.id,
            krossfire_core::queue::QueueEntryPatch {
                expires_at: Some(Utc::now() - Duration::seconds(120)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    engine.join_queue("u2", &tags(&["a"])).await.unwrap();

    assert_eq!(engine.cleanup_expired_entries().await.unwrap(), 1);
    assert_eq!(engine.cleanup_expired_entries().await.unwrap(), 0);
    assert!(storage.get_active_queue_entry("u2").await.unwrap().is_some());
}
