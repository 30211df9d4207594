//! REST client for the Google Generative Language API.
//!
//! Wraps the `models/{model}:generateContent` endpoint using [`reqwest`]
//! and turns the free-text model output into validated
//! [`GeneratedQuestion`] candidates. Retry on failure is bounded and
//! handled here; callers see a single `Result`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use krossfire_core::error::CoreError;
use krossfire_core::generator::{validate_candidate, GeneratedQuestion, QuestionGenerator};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Attempts per [`QuestionGenerator::generate`] call, including the first.
    pub max_attempts: u32,
}

impl GeminiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// HTTP client for question generation against the Gemini API.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

/// Errors from a single generation attempt. Collapsed into
/// [`CoreError::Generator`] once the retry budget is spent.
#[derive(Debug, thiserror::Error)]
enum GeminiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed model output: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    async fn attempt(&self, movie_title: &str) -> Result<Vec<GeneratedQuestion>, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": build_prompt(movie_title) }],
            }],
        });

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GeminiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| GeminiError::Malformed("response contains no text part".into()))?;

        parse_candidates(text).map_err(GeminiError::Malformed)
    }
}

#[async_trait]
impl QuestionGenerator for GeminiClient {
    async fn generate(&self, movie_title: &str) -> Result<Vec<GeneratedQuestion>, CoreError> {
        let mut last_error = String::new();

        for attempt in 1..=self.config.max_attempts {
            match self.attempt(movie_title).await {
                Ok(questions) => {
                    tracing::info!(
                        movie_title,
                        count = questions.len(),
                        attempt,
                        "generated trivia questions"
                    );
                    return Ok(questions);
                }
                Err(e) => {
                    tracing::warn!(
                        movie_title,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "generation attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                    }
                }
            }
        }

        Err(CoreError::Generator {
            movie_title: movie_title.to_string(),
            message: format!(
                "failed after {} attempts: {last_error}",
                self.config.max_attempts
            ),
        })
    }
}

/// Prompt asking for a strict JSON array of five questions.
fn build_prompt(movie_title: &str) -> String {
    format!(
        r#"Generate 5 trivia questions about the movie "{movie_title}".
Each question should be interesting and test knowledge about the movie's plot, characters, themes, or production.

Return your response as a JSON array with this exact structure:
[
  {{
    "question": "Question text here?",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correctAnswer": "The correct option text"
  }}
]

Requirements:
- Each question must have exactly 4 options
- The correctAnswer must match one of the options exactly
- Questions should be varied (plot, characters, themes, production, etc.)
- Difficulty: medium (not too easy, not impossibly hard)
- Return ONLY the JSON array, no additional text"#
    )
}

/// Models often wrap JSON in a fenced code block despite instructions.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Parse the model output into validated candidates. Malformed individual
/// candidates are dropped; an unparseable or fully invalid batch is an error.
fn parse_candidates(text: &str) -> Result<Vec<GeneratedQuestion>, String> {
    let cleaned = strip_code_fences(text);
    let raw: Vec<GeneratedQuestion> =
        serde_json::from_str(cleaned).map_err(|e| format!("output is not a question array: {e}"))?;

    let mut valid = Vec::with_capacity(raw.len());
    for candidate in raw {
        match validate_candidate(&candidate) {
            Ok(()) => valid.push(candidate),
            Err(reason) => {
                tracing::warn!(reason, question = %candidate.question, "dropping invalid candidate");
            }
        }
    }

    if valid.is_empty() {
        return Err("no valid questions in model output".into());
    }
    Ok(valid)
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: &str = r#"[
        {"question":"Who directed it?","options":["A","B","C","D"],"correctAnswer":"B"},
        {"question":"What year?","options":["1999","2000","2001","2002"],"correctAnswer":"1999"}
    ]"#;

    #[test]
    fn prompt_names_the_movie() {
        let prompt = build_prompt("The Matrix");
        assert!(prompt.contains(r#"the movie "The Matrix""#));
        assert!(prompt.contains("exactly 4 options"));
    }

    #[test]
    fn parses_bare_json_array() {
        let questions = parse_candidates(BATCH).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].correct_answer, "1999");
    }

    #[test]
    fn strips_json_code_fences() {
        let fenced = format!("```json\n{BATCH}\n```");
        let questions = parse_candidates(&fenced).unwrap();
        assert_eq!(questions.len(), 2);
    }

    #[test]
    fn strips_anonymous_code_fences() {
        let fenced = format!("```\n{BATCH}\n```");
        assert_eq!(parse_candidates(&fenced).unwrap().len(), 2);
    }

    #[test]
    fn drops_invalid_candidates_keeps_valid() {
        let mixed = r#"[
            {"question":"Ok?","options":["A","B","C","D"],"correctAnswer":"A"},
            {"question":"Bad","options":["A","B"],"correctAnswer":"A"}
        ]"#;
        let questions = parse_candidates(mixed).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "Ok?");
    }

    #[test]
    fn fully_invalid_batch_is_an_error() {
        let bad = r#"[{"question":"","options":["A","B","C","D"],"correctAnswer":"A"}]"#;
        assert!(parse_candidates(bad).is_err());
    }

    #[test]
    fn non_array_output_is_an_error() {
        assert!(parse_candidates("Sure! Here are your questions.").is_err());
    }
}
