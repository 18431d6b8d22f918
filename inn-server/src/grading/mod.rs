//! AI-assisted grading
//!
//! Builds a prompt per answer, sends it through the key ring to the
//! generative API and turns the reply into a clamped score.

mod client;
mod error;
mod key_ring;
pub mod parse;
pub mod prompt;
pub mod runner;

pub use client::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::GradingError;
pub use key_ring::KeyRing;
pub use parse::{parse_evaluation, ParsedEvaluation, PARSE_FAILURE_MESSAGE};
pub use runner::run_round;

use inn_common::questions::Question;
use tracing::debug;

/// Client plus the keys it may use
#[derive(Debug)]
pub struct Grader {
    client: GeminiClient,
    keys: KeyRing,
}

impl Grader {
    pub fn new(client: GeminiClient, keys: KeyRing) -> Self {
        Self { client, keys }
    }

    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Grade one answer
    ///
    /// Unparseable model output is not an error: it yields a zero score with
    /// `parsed == false`.
    pub async fn grade(
        &self,
        question: &Question,
        answer: &str,
    ) -> Result<ParsedEvaluation, GradingError> {
        let prompt = prompt::build_prompt(question, answer);
        let client = &self.client;
        let prompt_ref = prompt.as_str();

        let text = self
            .keys
            .execute("grade_answer", |key| async move {
                client.generate(&key, prompt_ref).await
            })
            .await?;

        let parsed = parse_evaluation(&text, question.max_points);
        debug!(
            question_id = question.id,
            score = parsed.score,
            parsed = parsed.parsed,
            "Answer graded"
        );
        Ok(parsed)
    }
}
