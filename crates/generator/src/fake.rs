//! Deterministic in-process generator for tests and offline development.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use krossfire_core::error::CoreError;
use krossfire_core::generator::{GeneratedQuestion, QuestionGenerator};

/// Produces a fixed-size batch of synthetic questions per call.
///
/// Question text embeds the movie title and a monotonically increasing
/// batch number, so repeated calls yield distinct content hashes and the
/// pool actually grows.
pub struct FakeGenerator {
    batch_size: usize,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeGenerator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// A generator whose every call fails, for exhaustion-path tests.
    pub fn failing() -> Self {
        Self {
            batch_size: 0,
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl QuestionGenerator for FakeGenerator {
    async fn generate(&self, movie_title: &str) -> Result<Vec<GeneratedQuestion>, CoreError> {
        let batch = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CoreError::Generator {
                movie_title: movie_title.to_string(),
                message: "fake generator configured to fail".into(),
            });
        }

        Ok((0..self.batch_size)
            .map(|i| GeneratedQuestion {
                question: format!("Synthetic question {batch}-{i} about {movie_title}?"),
                options: vec![
                    format!("Answer {batch}-{i}-a"),
                    format!("Answer {batch}-{i}-b"),
                    format!("Answer {batch}-{i}-c"),
                    format!("Answer {batch}-{i}-d"),
                ],
                correct_answer: format!("Answer {batch}-{i}-a"),
            })
            .collect())
    }
}
