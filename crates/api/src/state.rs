use std::sync::Arc;

use krossfire_core::generator::QuestionGenerator;
use krossfire_core::storage::Storage;
use krossfire_engine::{GameService, MatchConfig, MatchmakingEngine, TriviaPool};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; all inner data is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub matchmaking: Arc<MatchmakingEngine>,
    pub trivia: Arc<TriviaPool>,
    pub games: Arc<GameService>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the engines over a storage backend and question generator.
    pub fn new(
        storage: Arc<dyn Storage>,
        generator: Arc<dyn QuestionGenerator>,
        config: ServerConfig,
    ) -> Self {
        let match_config: MatchConfig = config.match_config();
        Self {
            matchmaking: Arc::new(MatchmakingEngine::new(storage.clone(), match_config)),
            trivia: Arc::new(TriviaPool::new(storage.clone(), generator)),
            games: Arc::new(GameService::new(storage)),
            config: Arc::new(config),
        }
    }
}
