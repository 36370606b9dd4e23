//! Blog platform client: paginated draft fetch and reply publishing.
//!
//! Credentials arrive as an explicit config object owned by the caller and
//! threaded into the client; nothing here reads ambient state. Pagination is
//! exhausted fully before the caller selects a submission, since selection
//! must be uniform over all eligible drafts, not just the first page.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use shearwater_shared::{ContentBlock, PlatformConfig, Result, ShearwaterError, Submission};

/// User-Agent string for platform requests.
const USER_AGENT: &str = concat!("Shearwater/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// The platform wraps every payload in a `response` envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct DraftsPage {
    #[serde(default)]
    posts: Vec<Submission>,
    #[serde(default, rename = "_links")]
    links: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    next: Option<NextLink>,
}

#[derive(Debug, Deserialize)]
struct NextLink {
    query_params: NextParams,
}

#[derive(Debug, Deserialize)]
struct NextParams {
    before_id: String,
}

// ---------------------------------------------------------------------------
// PlatformClient
// ---------------------------------------------------------------------------

/// Authenticated client for one blog.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    client: reqwest::Client,
    base: Url,
    blog: String,
    page_size: u32,
}

impl PlatformClient {
    /// Build a client from config and a resolved API token.
    pub fn new(config: &PlatformConfig, api_token: &str) -> Result<Self> {
        if config.blog.is_empty() {
            return Err(ShearwaterError::config("platform blog is not set"));
        }

        let base = Url::parse(&config.base_url).map_err(|e| {
            ShearwaterError::config(format!("invalid base_url '{}': {e}", config.base_url))
        })?;

        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {api_token}"))
            .map_err(|_| ShearwaterError::config("API token contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ShearwaterError::Platform(format!("client build: {e}")))?;

        Ok(Self {
            client,
            base,
            blog: config.blog.clone(),
            page_size: config.page_size,
        })
    }

    fn endpoint(&self, tail: &str) -> Result<Url> {
        self.base
            .join(&format!("v2/blog/{}/{tail}", self.blog))
            .map_err(|e| ShearwaterError::Platform(format!("bad endpoint '{tail}': {e}")))
    }

    /// Fetch every draft submission, following `before_id` cursors until the
    /// platform reports no further page. Source order is preserved.
    #[instrument(skip(self), fields(blog = %self.blog))]
    pub async fn drafts(&self) -> Result<Vec<Submission>> {
        let url = self.endpoint("posts/draft")?;
        let mut results: Vec<Submission> = Vec::new();
        let mut before_id: Option<String> = None;

        loop {
            let mut request = self.client.get(url.clone()).query(&[
                ("npf", "true".to_string()),
                ("limit", self.page_size.to_string()),
            ]);
            if let Some(cursor) = &before_id {
                request = request.query(&[("before_id", cursor.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ShearwaterError::Platform(format!("{url}: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ShearwaterError::Platform(format!("{url}: HTTP {status}")));
            }

            let page: ApiEnvelope<DraftsPage> = response
                .json()
                .await
                .map_err(|e| ShearwaterError::Platform(format!("malformed drafts page: {e}")))?;

            let page = page.response;
            debug!(posts = page.posts.len(), "fetched drafts page");

            let empty_page = page.posts.is_empty();
            results.extend(page.posts);

            match page.links.and_then(|l| l.next) {
                Some(next) if !empty_page => before_id = Some(next.query_params.before_id),
                _ => break,
            }
        }

        info!(total = results.len(), "draft fetch complete");
        Ok(results)
    }

    /// Publish the answer: edit the draft, appending the answer as a trailing
    /// text block, and flip its state to published. The original content
    /// (including any media and captions) is preserved.
    #[instrument(skip(self, submission, answer), fields(blog = %self.blog, id = submission.id))]
    pub async fn publish(&self, submission: &Submission, answer: &str) -> Result<()> {
        let url = self.endpoint(&format!("posts/{}", submission.id))?;

        let mut content = submission.content.clone();
        content.push(ContentBlock::text(answer));

        let body = serde_json::json!({
            "content": content,
            "layout": submission.layout,
            "state": "published",
        });

        let response = self
            .client
            .put(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ShearwaterError::Platform(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShearwaterError::Platform(format!(
                "publish of {} failed: HTTP {status}",
                submission.id
            )));
        }

        info!(id = submission.id, "answer published");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> PlatformConfig {
        PlatformConfig {
            base_url: server.uri(),
            blog: "tide-answers".into(),
            api_token_env: "unused".into(),
            page_size: 2,
        }
    }

    fn draft(id: u64, question: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "content": [{"type": "text", "text": question}],
            "layout": [{"type": "ask", "blocks": [0]}],
        })
    }

    #[tokio::test]
    async fn drafts_follow_pagination_cursor() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/blog/tide-answers/posts/draft"))
            .and(query_param_is_missing("before_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {
                    "posts": [draft(1003, "first"), draft(1002, "second")],
                    "_links": {"next": {"query_params": {"before_id": "1002"}}}
                }
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v2/blog/tide-answers/posts/draft"))
            .and(query_param("before_id", "1002"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": { "posts": [draft(1001, "third")] }
            })))
            .mount(&server)
            .await;

        let client = PlatformClient::new(&test_config(&server), "token").unwrap();
        let drafts = client.drafts().await.unwrap();

        let ids: Vec<u64> = drafts.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1003, 1002, 1001]);
    }

    #[tokio::test]
    async fn drafts_stop_on_empty_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/blog/tide-answers/posts/draft"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": { "posts": [] }
            })))
            .mount(&server)
            .await;

        let client = PlatformClient::new(&test_config(&server), "token").unwrap();
        assert!(client.drafts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn drafts_error_status_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = PlatformClient::new(&test_config(&server), "bad-token").unwrap();
        let err = client.drafts().await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn publish_appends_answer_and_sets_state() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v2/blog/tide-answers/posts/1003"))
            .and(body_partial_json(serde_json::json!({
                "state": "published",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": {"id": 1003}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let submission: Submission =
            serde_json::from_value(draft(1003, "where do they nest")).unwrap();

        let client = PlatformClient::new(&test_config(&server), "token").unwrap();
        client
            .publish(&submission, "In the reed beds.")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn publish_failure_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let submission: Submission = serde_json::from_value(draft(1003, "q")).unwrap();
        let client = PlatformClient::new(&test_config(&server), "token").unwrap();
        let err = client.publish(&submission, "answer").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn client_requires_blog_name() {
        let config = PlatformConfig {
            blog: String::new(),
            ..PlatformConfig::default()
        };
        assert!(PlatformClient::new(&config, "token").is_err());
    }
}
