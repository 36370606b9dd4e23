//! Moderation policy for questions and answer spans.
//!
//! Two interchangeable strategies sit behind the single [`Validate`]
//! capability: a local denylist matcher and an external moderation service.
//! Which one is active is a configuration-time choice made once per pipeline
//! instance via [`ModerationGate::from_config`].

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use shearwater_shared::{ModerationConfig, Result, ShearwaterError};

/// The one term the denylist never bans, no matter what the caller
/// configured.
const ALLOWED_TERM: &str = "god";

/// User-Agent for moderation service requests.
const USER_AGENT: &str = concat!("Shearwater/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Validate capability
// ---------------------------------------------------------------------------

/// The single moderation capability: does this text pass the active policy?
pub trait Validate {
    /// Returns `Ok(true)` when the text is acceptable.
    fn validate(&self, text: &str) -> impl Future<Output = Result<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Denylist strategy
// ---------------------------------------------------------------------------

/// Case-insensitive substring matcher over a configured set of banned terms.
#[derive(Debug, Clone)]
pub struct DenylistFilter {
    /// Lowercased banned terms, with [`ALLOWED_TERM`] removed.
    terms: Vec<String>,
}

impl DenylistFilter {
    /// Build a filter from configured terms. Terms are matched
    /// case-insensitively; empty entries and the fixed allowlisted term are
    /// dropped.
    pub fn new(terms: &[String]) -> Self {
        let terms = terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty() && t != ALLOWED_TERM)
            .collect();
        Self { terms }
    }

    fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.terms.iter().any(|t| lowered.contains(t.as_str()))
    }
}

impl Validate for DenylistFilter {
    async fn validate(&self, text: &str) -> Result<bool> {
        Ok(!self.matches(text))
    }
}

// ---------------------------------------------------------------------------
// External service strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ServiceRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ServiceVerdict {
    flagged: bool,
}

/// Delegates validation to an external content-safety endpoint.
///
/// The service is an opaque collaborator: it receives `{"input": <text>}`
/// and answers `{"flagged": <bool>}`. Anything else is a moderation error.
#[derive(Debug, Clone)]
pub struct ModerationService {
    client: reqwest::Client,
    endpoint: Url,
}

impl ModerationService {
    /// Create a client for the given endpoint URL.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ShearwaterError::config(format!("invalid moderation service URL '{endpoint}': {e}"))
        })?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ShearwaterError::Moderation(format!("client build: {e}")))?;

        Ok(Self { client, endpoint })
    }
}

impl Validate for ModerationService {
    async fn validate(&self, text: &str) -> Result<bool> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ServiceRequest { input: text })
            .send()
            .await
            .map_err(|e| ShearwaterError::Moderation(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShearwaterError::Moderation(format!(
                "{}: HTTP {status}",
                self.endpoint
            )));
        }

        let verdict: ServiceVerdict = response
            .json()
            .await
            .map_err(|e| ShearwaterError::Moderation(format!("malformed verdict: {e}")))?;

        debug!(flagged = verdict.flagged, "moderation service verdict");
        Ok(!verdict.flagged)
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// The active moderation strategy for one pipeline instance.
#[derive(Debug, Clone)]
pub enum ModerationGate {
    Denylist(DenylistFilter),
    Service(ModerationService),
}

impl ModerationGate {
    /// Select and construct the strategy named by the config.
    pub fn from_config(config: &ModerationConfig) -> Result<Self> {
        match config.mode.as_str() {
            "denylist" => Ok(Self::Denylist(DenylistFilter::new(&config.banned_terms))),
            "service" => {
                if config.service_url.is_empty() {
                    return Err(ShearwaterError::config(
                        "moderation mode is 'service' but service_url is not set",
                    ));
                }
                Ok(Self::Service(ModerationService::new(&config.service_url)?))
            }
            other => Err(ShearwaterError::config(format!(
                "unknown moderation mode '{other}': expected 'denylist' or 'service'"
            ))),
        }
    }
}

impl Validate for ModerationGate {
    async fn validate(&self, text: &str) -> Result<bool> {
        match self {
            Self::Denylist(filter) => filter.validate(text).await,
            Self::Service(service) => service.validate(text).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn denylist_is_case_insensitive() {
        let filter = DenylistFilter::new(&["Mildew".into()]);
        assert!(!filter.validate("a patch of MILDEW spread").await.unwrap());
        assert!(filter.validate("a patch of moss spread").await.unwrap());
    }

    #[tokio::test]
    async fn denylist_matches_substrings() {
        let filter = DenylistFilter::new(&["rot".into()]);
        assert!(!filter.validate("the rotten beam").await.unwrap());
    }

    #[tokio::test]
    async fn allowlisted_term_is_never_banned() {
        let filter = DenylistFilter::new(&["god".into(), "GOD".into()]);
        assert!(filter.validate("the god of small things").await.unwrap());
    }

    #[tokio::test]
    async fn empty_denylist_passes_everything() {
        let filter = DenylistFilter::new(&[]);
        assert!(filter.validate("anything at all").await.unwrap());
    }

    #[test]
    fn gate_selects_denylist_by_default() {
        let config = ModerationConfig::default();
        let gate = ModerationGate::from_config(&config).unwrap();
        assert!(matches!(gate, ModerationGate::Denylist(_)));
    }

    #[test]
    fn gate_rejects_unknown_mode() {
        let config = ModerationConfig {
            mode: "oracle".into(),
            ..Default::default()
        };
        let err = ModerationGate::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("unknown moderation mode"));
    }

    #[test]
    fn gate_requires_service_url_in_service_mode() {
        let config = ModerationConfig {
            mode: "service".into(),
            ..Default::default()
        };
        let err = ModerationGate::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("service_url"));
    }

    #[tokio::test]
    async fn service_reads_flagged_verdict() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/moderate"))
            .and(wiremock::matchers::body_json(serde_json::json!({
                "input": "a grim phrase"
            })))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "flagged": true })),
            )
            .mount(&server)
            .await;

        let service = ModerationService::new(&format!("{}/moderate", server.uri())).unwrap();
        assert!(!service.validate("a grim phrase").await.unwrap());
    }

    #[tokio::test]
    async fn service_error_status_is_surfaced() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service = ModerationService::new(&server.uri()).unwrap();
        let err = service.validate("anything").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
