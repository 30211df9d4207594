//! Engagement engines: matchmaking, trivia reservation, game sessions.
//!
//! Each engine holds an `Arc<dyn Storage>` (and, for the trivia pool, an
//! `Arc<dyn QuestionGenerator>`) and is otherwise stateless: progress is
//! driven by short client polls, and timeouts are evaluated lazily against
//! wall-clock time at each call. The atomicity the engines depend on lives
//! entirely in the storage port.

pub mod game;
pub mod matchmaking;
pub mod trivia;

pub use game::GameService;
pub use matchmaking::{MatchConfig, MatchmakingEngine};
pub use trivia::{FreshQuestionsRequest, TriviaPool};
