//! End-to-end `speak` pipeline: drafts → filter → window → inference →
//! moderation → normalize → publish.

use std::path::Path;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use tracing::{info, instrument};

use shearwater_moderation::Validate;
use shearwater_platform::PlatformClient;
use shearwater_shared::{PipelineConfig, Result, ShearwaterError};

use crate::corpus;
use crate::filter::{self, FilterOptions};
use crate::retry::{self, AnswerPolicy, SpanSource};

/// Configuration for one `speak` run.
#[derive(Debug, Clone)]
pub struct SpeakConfig {
    /// Pipeline tuning (window, retry, filter knobs, corpus path).
    pub pipeline: PipelineConfig,
    /// Run everything except the final publish.
    pub dry_run: bool,
}

/// Result of a successful `speak` run.
#[derive(Debug, Clone)]
pub struct SpeakOutcome {
    /// The submission that was answered.
    pub submission_id: u64,
    /// The derived question.
    pub question: String,
    /// The published (or dry-run) answer.
    pub answer: String,
    /// Inference attempts the answer took.
    pub attempts: u32,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes; `None` means nothing was answered.
    fn done(&self, outcome: Option<&SpeakOutcome>);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _outcome: Option<&SpeakOutcome>) {}
}

/// Run the full pipeline once.
///
/// 1. Fetch every draft submission (exhaustive pagination)
/// 2. Filter to eligible asks; pick one uniformly at random
/// 3. Load the corpus
/// 4. Answer under the moderation retry loop
/// 5. Publish the reply (unless dry-run)
///
/// `Ok(None)` covers the two absent-value outcomes: no eligible submission,
/// or an accepted-but-empty answer span. Fatal errors abort the run with
/// nothing published.
#[instrument(skip_all, fields(dry_run = config.dry_run))]
pub async fn speak<S: SpanSource, M: Validate>(
    config: &SpeakConfig,
    client: &PlatformClient,
    source: &S,
    gate: &M,
    progress: &dyn ProgressReporter,
) -> Result<Option<SpeakOutcome>> {
    let start = Instant::now();

    // --- Phase 1: fetch ---
    progress.phase("Fetching submissions");
    let submissions = client.drafts().await?;

    // --- Phase 2: filter & choose ---
    progress.phase("Filtering submissions");
    let options = FilterOptions::from(&config.pipeline);
    let eligible = filter::eligible(&submissions, &options, gate).await?;

    info!(
        fetched = submissions.len(),
        eligible = eligible.len(),
        "submissions filtered"
    );

    let Some(submission) = eligible.choose(&mut rand::thread_rng()) else {
        info!("no eligible submission");
        progress.done(None);
        return Ok(None);
    };

    let question = submission.question().ok_or_else(|| {
        ShearwaterError::validation(format!(
            "eligible submission {} lost its question text",
            submission.id
        ))
    })?;

    info!(id = submission.id, question = %question, "submission chosen");

    // --- Phase 3: corpus ---
    progress.phase("Loading corpus");
    let corpus = corpus::load_corpus(Path::new(&config.pipeline.corpus_path))?;

    // --- Phase 4: answer ---
    progress.phase("Answering");
    let policy = AnswerPolicy::from(&config.pipeline);
    let Some(answer) = retry::answer_question(source, gate, &question, &corpus, &policy).await?
    else {
        info!(id = submission.id, "empty answer span, nothing to publish");
        progress.done(None);
        return Ok(None);
    };

    // --- Phase 5: publish ---
    if config.dry_run {
        info!(id = submission.id, answer = %answer.text, "dry run, skipping publish");
    } else {
        progress.phase("Publishing answer");
        client.publish(submission, &answer.text).await?;
    }

    let outcome = SpeakOutcome {
        submission_id: submission.id,
        question,
        answer: answer.text,
        attempts: answer.attempts,
        elapsed: start.elapsed(),
    };

    progress.done(Some(&outcome));

    info!(
        id = outcome.submission_id,
        attempts = outcome.attempts,
        elapsed_ms = outcome.elapsed.as_millis(),
        "speak pipeline complete"
    );

    Ok(Some(outcome))
}
