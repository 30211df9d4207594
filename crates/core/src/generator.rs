//! Question generator port and candidate validation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::trivia::OPTION_COUNT;

/// A candidate question from the external generator, before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
}

/// Port for the external AI question generator.
///
/// The adapter owns bounded retry on transient failures: a call either
/// yields at least one well-formed candidate or fails with
/// [`CoreError::Generator`]. The reservation engine never loops on it.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, movie_title: &str) -> Result<Vec<GeneratedQuestion>, CoreError>;
}

/// Validate a single generated candidate.
///
/// Rules: non-empty question text, exactly four unique options, and the
/// correct answer must be one of them.
pub fn validate_candidate(candidate: &GeneratedQuestion) -> Result<(), String> {
    if candidate.question.trim().is_empty() {
        return Err("question text is empty".into());
    }
    if candidate.options.len() != OPTION_COUNT {
        return Err(format!(
            "expected {OPTION_COUNT} options, got {}",
            candidate.options.len()
        ));
    }
    for (i, option) in candidate.options.iter().enumerate() {
        if option.trim().is_empty() {
            return Err(format!("option {i} is empty"));
        }
        if candidate.options[..i].contains(option) {
            return Err(format!("duplicate option: {option:?}"));
        }
    }
    if !candidate.options.contains(&candidate.correct_answer) {
        return Err("correctAnswer is not one of the options".into());
    }
    Ok(())
}
