//! The moderation retry loop around the inference worker.
//!
//! Moderation rejections (and optionally too-short spans) re-attempt
//! inference with the same question over a freshly sampled window. The loop
//! is explicitly bounded: past `max_attempts` it surfaces
//! [`ShearwaterError::ModerationExhausted`] instead of recursing. Worker
//! failures are fatal on the spot and are never retried here.

use std::future::Future;

use tracing::{debug, instrument};

use shearwater_inference::WorkerInferencer;
use shearwater_moderation::Validate;
use shearwater_shared::{PipelineConfig, Result, ShearwaterError};

use crate::normalize::normalize;
use crate::sampler::sample_window;

/// Something that can produce a raw answer span for (question, window).
///
/// [`WorkerInferencer`] is the production implementation; tests script their
/// own.
pub trait SpanSource {
    fn infer(&self, question: &str, window: &str) -> impl Future<Output = Result<String>> + Send;
}

impl SpanSource for WorkerInferencer {
    fn infer(&self, question: &str, window: &str) -> impl Future<Output = Result<String>> + Send {
        WorkerInferencer::infer(self, question, window)
    }
}

/// Retry policy for one pipeline instance.
#[derive(Debug, Clone)]
pub struct AnswerPolicy {
    /// Maximum corpus window length in characters; 0 means unbounded.
    pub max_window_len: usize,
    /// Maximum inference attempts; at least 1 is always made.
    pub max_attempts: u32,
    /// Minimum accepted span length in words; 0 disables the check.
    pub min_answer_words: usize,
}

impl From<&PipelineConfig> for AnswerPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_window_len: config.max_window_len,
            max_attempts: config.max_attempts,
            min_answer_words: config.min_answer_words,
        }
    }
}

/// An accepted, normalized answer.
#[derive(Debug, Clone)]
pub struct AcceptedAnswer {
    /// Normalized answer text.
    pub text: String,
    /// How many inference attempts it took.
    pub attempts: u32,
}

/// Answer one question from the corpus.
///
/// Each attempt re-samples the window (the sampler is stateless), runs the
/// worker, and gates the span. `Ok(None)` means the worker's accepted span
/// was empty — an absent answer, not an error.
#[instrument(skip_all, fields(question = %question))]
pub async fn answer_question<S: SpanSource, M: Validate>(
    source: &S,
    gate: &M,
    question: &str,
    corpus: &str,
    policy: &AnswerPolicy,
) -> Result<Option<AcceptedAnswer>> {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let window = sample_window(corpus, policy.max_window_len);
        let span = source.infer(question, &window).await?;

        if !gate.validate(&span).await? {
            debug!(attempt, "span rejected by moderation");
            continue;
        }

        let words = span.split_whitespace().count();
        if policy.min_answer_words > 0 && words < policy.min_answer_words {
            debug!(attempt, words, "span below word minimum");
            continue;
        }

        if span.is_empty() {
            debug!(attempt, "worker returned an empty span");
            return Ok(None);
        }

        return Ok(Some(AcceptedAnswer {
            text: normalize(&span),
            attempts: attempt,
        }));
    }

    Err(ShearwaterError::ModerationExhausted {
        attempts: max_attempts,
    })
}
