//! AI question generation adapters.
//!
//! [`gemini::GeminiClient`] is the production adapter, speaking the Google
//! Generative Language REST API. [`fake::FakeGenerator`] is a deterministic
//! in-process stand-in used by the engine and API tests, and serves as the
//! runtime fallback when no API key is configured.

pub mod fake;
pub mod gemini;

pub use fake::FakeGenerator;
pub use gemini::{GeminiClient, GeminiConfig};
