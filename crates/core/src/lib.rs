//! Domain crate for the Krossfire engagement backend.
//!
//! Zero internal deps: holds the domain types, the error taxonomy, the pure
//! matchmaking/scoring logic, and the ports (`Storage`, `QuestionGenerator`)
//! that the engine crates are generic over. Anything that talks to a real
//! database or HTTP service lives in the adapter crates.

pub mod error;
pub mod generator;
pub mod hashing;
pub mod interests;
pub mod movie;
pub mod queue;
pub mod scoring;
pub mod session;
pub mod storage;
pub mod trivia;
pub mod types;
