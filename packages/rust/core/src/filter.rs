//! Submission filtering: which drafts are answerable at all.
//!
//! Predicates run in a fixed order and short-circuit on the first failure;
//! survivors keep their source order so the caller's random choice stays
//! uniform over the whole set. Every skip is logged with its reason.

use tracing::debug;

use shearwater_moderation::Validate;
use shearwater_shared::{PipelineConfig, Result, Submission};

/// Filter knobs, lifted out of the pipeline config.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Accept submissions carrying non-text content blocks.
    pub include_media: bool,
    /// Case-insensitive substring a question must contain; empty disables.
    pub required_keyword: String,
}

impl From<&PipelineConfig> for FilterOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            include_media: config.include_media,
            required_keyword: config.required_keyword.clone(),
        }
    }
}

/// Return the submissions that pass every predicate, in source order.
///
/// Chain, short-circuiting on first failure:
/// 1. an ask region with derivable question text,
/// 2. media exclusion (unless `include_media`),
/// 3. keyword presence (when configured),
/// 4. moderation of the question itself.
pub async fn eligible<M: Validate>(
    submissions: &[Submission],
    options: &FilterOptions,
    gate: &M,
) -> Result<Vec<Submission>> {
    let keyword = options.required_keyword.to_lowercase();
    let mut survivors = Vec::new();

    for submission in submissions {
        let Some(question) = submission.question() else {
            debug!(id = submission.id, "skipping: no ask text");
            continue;
        };

        if !options.include_media && submission.has_media() {
            debug!(id = submission.id, "skipping: non-text content");
            continue;
        }

        if !keyword.is_empty() && !question.to_lowercase().contains(&keyword) {
            debug!(id = submission.id, "skipping: keyword not present");
            continue;
        }

        if !gate.validate(&question).await? {
            debug!(id = submission.id, "skipping: question failed moderation");
            continue;
        }

        survivors.push(submission.clone());
    }

    debug!(
        total = submissions.len(),
        eligible = survivors.len(),
        "submission filter complete"
    );
    Ok(survivors)
}
