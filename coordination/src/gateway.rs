//! Agent Gateway (AG): a thin, typed HTTP client for the three agent
//! operations (`plan`, `implement`, `review`). Agents are opaque external
//! processes; AG never inspects anything beyond their JSON contract.

use crate::error::AgentError;
use crate::types::{Component, Plan, Review};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct PlanRequest<'a> {
    task: &'a str,
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    #[serde(default)]
    components: Vec<Component>,
}

#[derive(Debug, Serialize)]
struct ImplementRequest<'a> {
    task: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImplementResponse {
    diff: String,
    #[serde(default)]
    #[allow(dead_code)]
    stdout: String,
    #[serde(default)]
    #[allow(dead_code)]
    stderr: String,
}

#[derive(Debug, Serialize)]
struct ReviewRequest<'a> {
    task: &'a str,
    diffs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ReviewResponse {
    score: f64,
    #[serde(default)]
    rationale: String,
}

/// Outcome of an implement call: a usable diff plus the stdout/stderr the
/// builder reported alongside it.
#[derive(Debug, Clone)]
pub struct ImplementOutcome {
    pub diff: String,
}

/// Typed client for the three agent operations. Holds one shared
/// `reqwest::Client` so connections to the same agent host are pooled
/// across calls.
pub struct AgentGateway {
    client: reqwest::Client,
    timeout: Duration,
}

impl AgentGateway {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        path: &str,
        body: &Req,
        role: &'static str,
    ) -> Result<Resp, AgentError> {
        let full_url = format!("{}{}", url.trim_end_matches('/'), path);
        let started = Instant::now();

        let send_result = self
            .client
            .post(&full_url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await;

        let response = match send_result {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                warn!(role, url = %full_url, "agent call timed out");
                return Err(AgentError::Timeout {
                    url: full_url,
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
            Err(e) => {
                warn!(role, url = %full_url, error = %e, "agent call transport error");
                return Err(AgentError::Transport {
                    url: full_url,
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body_excerpt: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(500)
                .collect();
            warn!(role, url = %full_url, %status, "agent returned non-2xx");
            return Err(AgentError::Http {
                url: full_url,
                status: status.as_u16(),
                body_excerpt,
            });
        }

        let parsed = response.json::<Resp>().await.map_err(|e| {
            warn!(role, url = %full_url, error = %e, "agent response failed to parse");
            AgentError::Protocol {
                url: full_url.clone(),
                message: e.to_string(),
            }
        })?;

        debug!(role, url = %full_url, duration_ms = started.elapsed().as_millis() as u64, "agent call ok");
        Ok(parsed)
    }

    /// `plan(url, task) -> Plan`.
    pub async fn plan(&self, url: &str, task: &str) -> Result<Plan, AgentError> {
        let resp: PlanResponse = self
            .post_json(url, "/codex/plan", &PlanRequest { task }, "plan")
            .await?;
        Ok(Plan {
            components: resp.components,
        })
    }

    /// `implement(url, task) -> ImplementOutcome`. Errors if the returned
    /// diff is empty after trimming.
    pub async fn implement(&self, url: &str, task: &str) -> Result<ImplementOutcome, AgentError> {
        let resp: ImplementResponse = self
            .post_json(url, "/codex/implement", &ImplementRequest { task }, "implement")
            .await?;

        if resp.diff.trim().is_empty() {
            return Err(AgentError::EmptyDiff { url: url.to_string() });
        }

        Ok(ImplementOutcome { diff: resp.diff })
    }

    /// `review(url, task, diffs) -> Review`. Score is clamped to `[0,1]`.
    pub async fn review(&self, url: &str, task: &str, diffs: &[String]) -> Result<Review, AgentError> {
        let resp: ReviewResponse = self
            .post_json(url, "/codex/review", &ReviewRequest { task, diffs }, "review")
            .await?;
        Ok(Review::clamp(resp.score, resp.rationale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn plan_parses_components() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/codex/plan"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "components": [{"name": "fix_add", "target_files": ["app.py"]}]
            })))
            .mount(&server)
            .await;

        let gw = AgentGateway::new(Duration::from_secs(5));
        let plan = gw.plan(&server.uri(), "fix add()").await.unwrap();
        assert_eq!(plan.components.len(), 1);
        assert_eq!(plan.components[0].name, "fix_add");
    }

    #[tokio::test]
    async fn implement_rejects_empty_diff() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/codex/implement"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "diff": "   ", "stdout": "", "stderr": ""
            })))
            .mount(&server)
            .await;

        let gw = AgentGateway::new(Duration::from_secs(5));
        let result = gw.implement(&server.uri(), "task").await;
        assert!(matches!(result, Err(AgentError::EmptyDiff { .. })));
    }

    #[tokio::test]
    async fn review_clamps_score_above_one() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/codex/review"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "score": 1.7, "rationale": "great"
            })))
            .mount(&server)
            .await;

        let gw = AgentGateway::new(Duration::from_secs(5));
        let review = gw.review(&server.uri(), "task", &[]).await.unwrap();
        assert_eq!(review.score, 1.0);
    }

    #[tokio::test]
    async fn non_2xx_status_becomes_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/codex/plan"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gw = AgentGateway::new(Duration::from_secs(5));
        let result = gw.plan(&server.uri(), "task").await;
        assert!(matches!(result, Err(AgentError::Http { status: 500, .. })));
    }
}
