//! Out-of-process invocation of the extractive QA worker.
//!
//! The numeric inference runtime cannot be loaded into this process (multiple
//! model loads collide on global runtime state), so each prediction runs in a
//! worker subprocess. The worker receives `[model_id, question, window,
//! max_len]` as positional arguments and prints exactly one
//! `<answer>TEXT</answer>` envelope on stdout. A non-zero exit, a missing
//! envelope, or a timeout is fatal and never retried here; moderation-level
//! retries happen upstream.

use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument};

use shearwater_shared::{Result, ShearwaterError, WorkerConfig};

/// Matches the worker's answer envelope. Greedy and dot-matches-newline, so
/// the single match spans the whole payload even when it contains newlines.
static ENVELOPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<answer>(.*)</answer>").expect("valid regex"));

/// Extract the answer payload from the worker's stdout.
///
/// `None` when no envelope is present; an empty envelope yields `Some("")`.
pub fn extract_envelope(stdout: &str) -> Option<&str> {
    ENVELOPE_RE
        .captures(stdout)
        .map(|caps| caps.get(1).expect("one capture group").as_str())
}

// ---------------------------------------------------------------------------
// WorkerInferencer
// ---------------------------------------------------------------------------

/// Handle for invoking the isolated QA worker.
#[derive(Debug, Clone)]
pub struct WorkerInferencer {
    worker: WorkerConfig,
    model_id: String,
    max_window_len: usize,
}

impl WorkerInferencer {
    /// Create an inferencer for a fixed worker command and model.
    pub fn new(worker: WorkerConfig, model_id: impl Into<String>, max_window_len: usize) -> Self {
        Self {
            worker,
            model_id: model_id.into(),
            max_window_len,
        }
    }

    /// The model identifier handed to the worker.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Run one prediction and return the raw answer span (possibly empty).
    ///
    /// The question and window cross the isolation boundary as discrete argv
    /// elements with no shell in between, so embedded quotes or
    /// metacharacters cannot alter the argument boundaries.
    #[instrument(skip_all, fields(model = %self.model_id, window_chars = window.chars().count()))]
    pub async fn infer(&self, question: &str, window: &str) -> Result<String> {
        let mut cmd = Command::new(&self.worker.cmd);
        if !self.worker.script.is_empty() {
            cmd.arg(&self.worker.script);
        }
        cmd.arg(&self.model_id)
            .arg(question)
            .arg(window)
            .arg(self.max_window_len.to_string())
            .current_dir(&self.worker.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(cmd = %self.worker.cmd, script = %self.worker.script, "spawning inference worker");

        let wait = Duration::from_secs(self.worker.timeout_secs);
        let output = match timeout(wait, cmd.output()).await {
            Err(_) => {
                return Err(self.failure(
                    question,
                    format!("worker timed out after {}s", self.worker.timeout_secs),
                    String::new(),
                ));
            }
            Ok(Err(e)) => {
                return Err(self.failure(
                    question,
                    format!("failed to spawn worker '{}': {e}", self.worker.cmd),
                    String::new(),
                ));
            }
            Ok(Ok(output)) => output,
        };

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(self.failure(
                question,
                format!(
                    "worker exited with status {}",
                    output.status.code().unwrap_or(-1)
                ),
                stderr,
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let span = extract_envelope(&stdout).map(|answer| answer.trim().to_string());
        match span {
            Some(span) => {
                debug!(span_chars = span.chars().count(), "worker answered");
                Ok(span)
            }
            None => Err(self.failure(
                question,
                "worker produced no answer envelope".to_string(),
                if stderr.is_empty() {
                    stdout.into_owned()
                } else {
                    stderr
                },
            )),
        }
    }

    fn failure(&self, question: &str, message: String, diagnostics: String) -> ShearwaterError {
        ShearwaterError::Inference {
            message,
            model: self.model_id.clone(),
            question: question.to_string(),
            diagnostics,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_extracts_payload() {
        assert_eq!(
            extract_envelope("<answer>the reed beds</answer>"),
            Some("the reed beds")
        );
    }

    #[test]
    fn envelope_tolerates_surrounding_noise() {
        let stdout = "loading model...\n<answer>a span\nwith newline</answer>\ndone\n";
        assert_eq!(extract_envelope(stdout), Some("a span\nwith newline"));
    }

    #[test]
    fn empty_envelope_is_a_valid_empty_answer() {
        assert_eq!(extract_envelope("<answer></answer>"), Some(""));
    }

    #[test]
    fn missing_envelope_is_none() {
        assert_eq!(extract_envelope("no envelope here"), None);
        assert_eq!(extract_envelope("<answer>unterminated"), None);
    }
}
