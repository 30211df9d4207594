//! Request handlers, one module per resource.

pub mod health;
pub mod leaderboard;
pub mod matchmaking;
pub mod sessions;
pub mod trivia;
