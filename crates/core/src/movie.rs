//! Minimal movie projection.
//!
//! The movie catalogue itself is an external collaborator; the engagement
//! backend only resolves `movie_id -> title` before calling the question
//! generator.

use serde::{Deserialize, Serialize};

use crate::types::Id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: Id,
    pub title: String,
    pub genre: Option<String>,
}
