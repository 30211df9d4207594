//! In-memory storage, used by tests and local development.
//!
//! All state lives in explicit per-process maps behind one mutex, with
//! index-based lookup for the hash-dedup and seen-record paths. Holding a
//! single lock for every operation makes `try_claim_for_match` and
//! `reserve_questions` genuinely atomic, so engine tests exercise the same
//! contract the PostgreSQL adapter provides.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use krossfire_core::error::CoreError;
use krossfire_core::movie::Movie;
use krossfire_core::queue::{NewQueueEntry, QueueEntry, QueueEntryPatch, QueueStatus};
use krossfire_core::scoring::fallback_display_name;
use krossfire_core::session::{
    Answer, GameSession, GameSessionPatch, NewAnswer, NewGameSession, SessionStatus,
};
use krossfire_core::storage::Storage;
use krossfire_core::trivia::{NewTriviaQuestion, TriviaQuestion};
use krossfire_core::types::{new_id, Id, Timestamp};

#[derive(Default)]
struct State {
    queue: HashMap<Id, QueueEntry>,
    questions: HashMap<Id, TriviaQuestion>,
    /// content hash -> question id (dedup index).
    question_by_hash: HashMap<String, Id>,
    /// Insertion order of question ids, for deterministic selection.
    question_order: Vec<Id>,
    /// (user id, movie id) -> seen question ids.
    seen: HashMap<(Id, Id), HashSet<Id>>,
    movies: HashMap<Id, Movie>,
    sessions: HashMap<Id, GameSession>,
    answers: HashMap<Id, Answer>,
    display_names: HashMap<Id, String>,
}

/// In-memory implementation of the [`Storage`] port.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked; the
        // state itself is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -----------------------------------------------------------------------
    // Seeding helpers (not part of the port)
    // -----------------------------------------------------------------------

    pub fn seed_movie(&self, movie: Movie) {
        self.lock().movies.insert(movie.id.clone(), movie);
    }

    pub fn set_display_name(&self, user_id: &str, name: &str) {
        self.lock()
            .display_names
            .insert(user_id.to_string(), name.to_string());
    }

    /// Rewrite an entry's `created_at`, so timeout paths can be tested
    /// without sleeping.
    pub fn backdate_entry(&self, entry_id: &str, created_at: Timestamp) {
        if let Some(entry) = self.lock().queue.get_mut(entry_id) {
            entry.created_at = created_at;
        }
    }

    fn insert_question_locked(state: &mut State, question: NewTriviaQuestion) -> TriviaQuestion {
        let stored = TriviaQuestion {
            id: new_id(),
            movie_id: question.movie_id,
            question: question.question,
            options: question.options,
            correct_answer: question.correct_answer,
            category: question.category,
            difficulty: question.difficulty,
            content_hash: question.content_hash,
            created_at: Utc::now(),
        };
        state
            .question_by_hash
            .insert(stored.content_hash.clone(), stored.id.clone());
        state.question_order.push(stored.id.clone());
        state.questions.insert(stored.id.clone(), stored.clone());
        stored
    }

    fn matches_filter(
        question: &TriviaQuestion,
        movie_id: &str,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> bool {
        if question.movie_id != movie_id {
            return false;
        }
        if let Some(category) = category {
            if question.category.as_deref() != Some(category) {
                return false;
            }
        }
        if let Some(difficulty) = difficulty {
            if question.difficulty != difficulty {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    // -----------------------------------------------------------------------
    // Matchmaking queue
    // -----------------------------------------------------------------------

    async fn create_queue_entry(&self, entry: NewQueueEntry) -> Result<QueueEntry, CoreError> {
        let mut state = self.lock();
        let created = QueueEntry {
            id: new_id(),
            user_id: entry.user_id,
            interests: entry.interests,
            status: QueueStatus::Waiting,
            matched_with: None,
            game_session_id: None,
            created_at: Utc::now(),
            expires_at: entry.expires_at,
        };
        state.queue.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_active_queue_entry(
        &self,
        user_id: &str,
    ) -> Result<Option<QueueEntry>, CoreError> {
        let state = self.lock();
        Ok(state
            .queue
            .values()
            .find(|e| e.user_id == user_id && e.status.is_active())
            .cloned())
    }

    async fn get_waiting_players(
        &self,
        exclude_user_id: &str,
    ) -> Result<Vec<QueueEntry>, CoreError> {
        let state = self.lock();
        let mut waiting: Vec<QueueEntry> = state
            .queue
            .values()
            .filter(|e| e.status == QueueStatus::Waiting && e.user_id != exclude_user_id)
            .cloned()
            .collect();
        waiting.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(waiting)
    }

    async fn update_queue_entry(
        &self,
        id: &str,
        patch: QueueEntryPatch,
    ) -> Result<QueueEntry, CoreError> {
        let mut state = self.lock();
        let entry = state.queue.get_mut(id).ok_or_else(|| CoreError::NotFound {
            entity: "QueueEntry",
            id: id.to_string(),
        })?;
        if let Some(status) = patch.status {
            entry.status = status;
        }
        if let Some(matched_with) = patch.matched_with {
            entry.matched_with = Some(matched_with);
        }
        if let Some(game_session_id) = patch.game_session_id {
            entry.game_session_id = Some(game_session_id);
        }
        if let Some(expires_at) = patch.expires_at {
            entry.expires_at = expires_at;
        }
        Ok(entry.clone())
    }

    async fn try_claim_for_match(
        &self,
        entry_ids: &[Id],
        matched_with: &[Id],
        game_session_id: &str,
    ) -> Result<bool, CoreError> {
        let mut state = self.lock();
        let all_waiting = entry_ids.iter().all(|id| {
            state
                .queue
                .get(id)
                .map(|e| e.status == QueueStatus::Waiting)
                .unwrap_or(false)
        });
        if !all_waiting {
            return Ok(false);
        }
        for id in entry_ids {
            // Presence was just verified above.
            if let Some(entry) = state.queue.get_mut(id) {
                entry.status = QueueStatus::Matched;
                entry.matched_with = Some(matched_with.to_vec());
                entry.game_session_id = Some(game_session_id.to_string());
            }
        }
        Ok(true)
    }

    async fn delete_expired_queue_entries(
        &self,
        now: Timestamp,
        grace: Duration,
    ) -> Result<u64, CoreError> {
        let mut state = self.lock();
        let cutoff = now - grace;
        let before = state.queue.len();
        state.queue.retain(|_, e| e.expires_at >= cutoff);
        Ok((before - state.queue.len()) as u64)
    }

    // -----------------------------------------------------------------------
    // Trivia pool
    // -----------------------------------------------------------------------

    /// Selects unseen questions in insertion order. The PostgreSQL adapter
    /// randomizes the pick instead; tests rely on this store being
    /// deterministic, and the no-repeat contract is unaffected by order.
    async fn reserve_questions(
        &self,
        user_id: &str,
        movie_id: &str,
        count: usize,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Vec<TriviaQuestion>, CoreError> {
        let mut state = self.lock();
        let seen_key = (user_id.to_string(), movie_id.to_string());
        let seen = state.seen.get(&seen_key).cloned().unwrap_or_default();

        let selected: Vec<TriviaQuestion> = state
            .question_order
            .iter()
            .filter_map(|id| state.questions.get(id))
            .filter(|q| Self::matches_filter(q, movie_id, category, difficulty))
            .filter(|q| !seen.contains(&q.id))
            .take(count)
            .cloned()
            .collect();

        // Mark as seen in the same locked step; durable before returning.
        let seen_set = state.seen.entry(seen_key).or_default();
        for question in &selected {
            seen_set.insert(question.id.clone());
        }
        Ok(selected)
    }

    async fn get_seen_question_ids(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> Result<Vec<Id>, CoreError> {
        let state = self.lock();
        Ok(state
            .seen
            .get(&(user_id.to_string(), movie_id.to_string()))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear_seen_questions(
        &self,
        user_id: &str,
        movie_id: &str,
        category: Option<&str>,
    ) -> Result<u64, CoreError> {
        let mut state = self.lock();
        let key = (user_id.to_string(), movie_id.to_string());
        match category {
            None => Ok(state
                .seen
                .remove(&key)
                .map(|set| set.len() as u64)
                .unwrap_or(0)),
            Some(category) => {
                let matching: HashSet<Id> = state
                    .questions
                    .values()
                    .filter(|q| q.movie_id == movie_id && q.category.as_deref() == Some(category))
                    .map(|q| q.id.clone())
                    .collect();
                let Some(seen_set) = state.seen.get_mut(&key) else {
                    return Ok(0);
                };
                let before = seen_set.len();
                seen_set.retain(|id| !matching.contains(id));
                Ok((before - seen_set.len()) as u64)
            }
        }
    }

    async fn upsert_question(
        &self,
        question: NewTriviaQuestion,
    ) -> Result<TriviaQuestion, CoreError> {
        let mut state = self.lock();
        if let Some(existing_id) = state.question_by_hash.get(&question.content_hash) {
            let existing = state
                .questions
                .get(existing_id)
                .cloned()
                .ok_or_else(|| CoreError::Internal("hash index out of sync".into()))?;
            return Ok(existing);
        }
        Ok(Self::insert_question_locked(&mut state, question))
    }

    async fn questions_by_filter(
        &self,
        movie_id: &str,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Vec<TriviaQuestion>, CoreError> {
        let state = self.lock();
        Ok(state
            .question_order
            .iter()
            .filter_map(|id| state.questions.get(id))
            .filter(|q| Self::matches_filter(q, movie_id, category, difficulty))
            .cloned()
            .collect())
    }

    // -----------------------------------------------------------------------
    // Movies
    // -----------------------------------------------------------------------

    async fn get_movie(&self, id: &str) -> Result<Option<Movie>, CoreError> {
        Ok(self.lock().movies.get(id).cloned())
    }

    // -----------------------------------------------------------------------
    // Game sessions and answers
    // -----------------------------------------------------------------------

    async fn create_game_session(
        &self,
        session: NewGameSession,
    ) -> Result<GameSession, CoreError> {
        let mut state = self.lock();
        let created = GameSession {
            id: session.id,
            host_user_id: session.host_user_id,
            movie_id: session.movie_id,
            score: 0,
            total_questions: session.total_questions,
            mode: session.mode,
            status: session.status,
            created_at: Utc::now(),
            completed_at: None,
        };
        state.sessions.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_game_session(&self, id: &str) -> Result<Option<GameSession>, CoreError> {
        Ok(self.lock().sessions.get(id).cloned())
    }

    async fn update_game_session(
        &self,
        id: &str,
        patch: GameSessionPatch,
    ) -> Result<GameSession, CoreError> {
        let mut state = self.lock();
        let session = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "GameSession",
                id: id.to_string(),
            })?;
        if let Some(movie_id) = patch.movie_id {
            session.movie_id = Some(movie_id);
        }
        if let Some(score) = patch.score {
            session.score = score;
        }
        if let Some(total_questions) = patch.total_questions {
            session.total_questions = total_questions;
        }
        if let Some(status) = patch.status {
            if status == SessionStatus::Completed && session.status != SessionStatus::Completed {
                session.completed_at = Some(Utc::now());
            }
            session.status = status;
        }
        Ok(session.clone())
    }

    async fn sessions_by_user(&self, user_id: &str) -> Result<Vec<GameSession>, CoreError> {
        let state = self.lock();
        let mut sessions: Vec<GameSession> = state
            .sessions
            .values()
            .filter(|s| s.host_user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn completed_sessions_by_mode(
        &self,
        mode: &str,
        since: Option<Timestamp>,
    ) -> Result<Vec<GameSession>, CoreError> {
        let state = self.lock();
        Ok(state
            .sessions
            .values()
            .filter(|s| s.mode == mode && s.status == SessionStatus::Completed)
            .filter(|s| since.map(|cutoff| s.created_at >= cutoff).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn create_answer(&self, answer: NewAnswer) -> Result<Answer, CoreError> {
        let mut state = self.lock();
        let created = Answer {
            id: new_id(),
            session_id: answer.session_id,
            question_id: answer.question_id,
            user_answer: answer.user_answer,
            is_correct: answer.is_correct,
            answered_at: Utc::now(),
        };
        state.answers.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn answers_by_session(&self, session_id: &str) -> Result<Vec<Answer>, CoreError> {
        let state = self.lock();
        let mut answers: Vec<Answer> = state
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| a.answered_at.cmp(&b.answered_at).then(a.id.cmp(&b.id)));
        Ok(answers)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    async fn display_name(&self, user_id: &str) -> Result<String, CoreError> {
        let state = self.lock();
        Ok(state
            .display_names
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| fallback_display_name(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krossfire_core::trivia::NewTriviaQuestion;

    fn new_question(movie_id: &str, text: &str) -> NewTriviaQuestion {
        NewTriviaQuestion::new(
            movie_id.into(),
            text.into(),
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            "A".into(),
            None,
            "medium".into(),
        )
    }

    fn new_entry(user_id: &str) -> NewQueueEntry {
        NewQueueEntry {
            user_id: user_id.into(),
            interests: vec!["sci-fi".into()],
            expires_at: Utc::now() + Duration::seconds(15),
        }
    }

    // -----------------------------------------------------------------------
    // Queue
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn active_entry_lookup_ignores_expired() {
        let store = MemoryStorage::new();
        let entry = store.create_queue_entry(new_entry("u1")).await.unwrap();
        store
            .update_queue_entry(
                &entry.id,
                QueueEntryPatch {
                    status: Some(QueueStatus::Expired),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(store.get_active_queue_entry("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_succeeds_once_then_fails() {
        let store = MemoryStorage::new();
        let a = store.create_queue_entry(new_entry("u1")).await.unwrap();
        let b = store.create_queue_entry(new_entry("u2")).await.unwrap();
        let ids = vec![a.id.clone(), b.id.clone()];
        let group = vec!["u1".to_string(), "u2".to_string()];

        assert!(store.try_claim_for_match(&ids, &group, "s1").await.unwrap());
        // Second claim for the same group must lose.
        assert!(!store.try_claim_for_match(&ids, &group, "s2").await.unwrap());

        let entry = store.get_active_queue_entry("u2").await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Matched);
        assert_eq!(entry.game_session_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn failed_claim_leaves_entries_untouched() {
        let store = MemoryStorage::new();
        let a = store.create_queue_entry(new_entry("u1")).await.unwrap();
        let b = store.create_queue_entry(new_entry("u2")).await.unwrap();
        store
            .update_queue_entry(
                &b.id,
                QueueEntryPatch {
                    status: Some(QueueStatus::Expired),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ids = vec![a.id.clone(), b.id.clone()];
        let group = vec!["u1".to_string(), "u2".to_string()];
        assert!(!store.try_claim_for_match(&ids, &group, "s1").await.unwrap());

        let a_after = store.get_active_queue_entry("u1").await.unwrap().unwrap();
        assert_eq!(a_after.status, QueueStatus::Waiting);
        assert!(a_after.game_session_id.is_none());
    }

    #[tokio::test]
    async fn cleanup_respects_grace_period() {
        let store = MemoryStorage::new();
        let entry = store.create_queue_entry(new_entry("u1")).await.unwrap();
        store
            .update_queue_entry(
                &entry.id,
                QueueEntryPatch {
                    expires_at: Some(Utc::now() - Duration::seconds(30)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Expired 30s ago but grace is 60s: kept.
        let removed = store
            .delete_expired_queue_entries(Utc::now(), Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(removed, 0);

        // Grace of 10s: removed. A second run is a no-op.
        let removed = store
            .delete_expired_queue_entries(Utc::now(), Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        let removed = store
            .delete_expired_queue_entries(Utc::now(), Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    // -----------------------------------------------------------------------
    // Trivia pool
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn reservation_marks_seen_immediately() {
        let store = MemoryStorage::new();
        for i in 0..4 {
            store
                .upsert_question(new_question("m1", &format!("q{i}")))
                .await
                .unwrap();
        }

        let first = store
            .reserve_questions("u1", "m1", 2, None, None)
            .await
            .unwrap();
        let second = store
            .reserve_questions("u1", "m1", 2, None, None)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        for q in &second {
            assert!(!first.iter().any(|f| f.id == q.id));
        }
        assert_eq!(
            store.get_seen_question_ids("u1", "m1").await.unwrap().len(),
            4
        );
    }

    #[tokio::test]
    async fn reservation_is_scoped_per_user() {
        let store = MemoryStorage::new();
        store.upsert_question(new_question("m1", "q0")).await.unwrap();

        let u1 = store
            .reserve_questions("u1", "m1", 1, None, None)
            .await
            .unwrap();
        let u2 = store
            .reserve_questions("u2", "m1", 1, None, None)
            .await
            .unwrap();
        assert_eq!(u1.len(), 1);
        assert_eq!(u2.len(), 1);
        assert_eq!(u1[0].id, u2[0].id);
    }

    #[tokio::test]
    async fn upsert_dedupes_by_content_hash() {
        let store = MemoryStorage::new();
        let first = store.upsert_question(new_question("m1", "q0")).await.unwrap();
        let second = store.upsert_question(new_question("m1", "q0")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(
            store.questions_by_filter("m1", None, None).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn clear_seen_narrowed_by_category() {
        let store = MemoryStorage::new();
        let mut plot = new_question("m1", "plot question");
        plot.category = Some("plot".into());
        let mut cast = new_question("m1", "cast question");
        cast.category = Some("cast".into());
        let plot = store.upsert_question(plot).await.unwrap();
        let cast = store.upsert_question(cast).await.unwrap();

        store
            .reserve_questions("u1", "m1", 2, None, None)
            .await
            .unwrap();
        let cleared = store
            .clear_seen_questions("u1", "m1", Some("plot"))
            .await
            .unwrap();
        assert_eq!(cleared, 1);

        let seen = store.get_seen_question_ids("u1", "m1").await.unwrap();
        assert!(seen.contains(&cast.id));
        assert!(!seen.contains(&plot.id));
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn completing_a_session_sets_completed_at() {
        let store = MemoryStorage::new();
        let session = store
            .create_game_session(NewGameSession {
                id: new_id(),
                host_user_id: "u1".into(),
                movie_id: None,
                total_questions: 5,
                mode: "krossfire".into(),
                status: SessionStatus::Lobby,
            })
            .await
            .unwrap();
        assert!(session.completed_at.is_none());

        let updated = store
            .update_game_session(
                &session.id,
                GameSessionPatch {
                    score: Some(4),
                    status: Some(SessionStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.score, 4);
        assert!(updated.completed_at.is_some());
    }

    #[tokio::test]
    async fn display_name_falls_back_to_id_prefix() {
        let store = MemoryStorage::new();
        store.set_display_name("u1", "Alice");
        assert_eq!(store.display_name("u1").await.unwrap(), "Alice");
        assert_eq!(
            store.display_name("abcdefgh-rest").await.unwrap(),
            "Player abcdefgh"
        );
    }
}
