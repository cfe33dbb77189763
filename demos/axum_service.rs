//! Axum service example using task-orchestrator
//!
//! This example shows how a chat host could expose the PR review workflow over HTTP.
//! Key points:
//! - A new TaskOrchestrator is created for each request (one orchestrator per run)
//! - Agents are defined once but instantiated per request
//! - The workflow: fetch_pr -> analyze_ci, review_code -> create_comments
//! - The response is the serialized WorkflowReport plus a one-line summary

use axum::{
    Router,
    extract::Json,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use task_orchestrator::{
    ExecutionError, Executor, OrchestratorError, RuleCheck, RuleDecider, SkipRule, Task,
    TaskOrchestrator, WorkflowReport, result_key,
};

// Agent that turns the request into a PR description, as a GitHub fetcher would
#[derive(Debug, Clone)]
struct FetchAgent {
    files: Vec<String>,
    ci_passing: bool,
}

// Agent that returns a fixed finding for its specialty
#[derive(Debug, Clone)]
struct FindingAgent {
    finding: &'static str,
}

// Agent that counts the findings handed to it
#[derive(Debug, Clone)]
struct CommentAgent;

#[async_trait::async_trait]
impl Executor for FetchAgent {
    async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
        if !input.contains("/pull/") {
            return Err(ExecutionError::failed(format!(
                "not a pull request URL: {}",
                input
            )));
        }
        let ci = if self.ci_passing {
            "all checks passed"
        } else {
            "checks failing"
        };
        Ok(format!("files: {}; {}", self.files.join(", "), ci))
    }
}

#[async_trait::async_trait]
impl Executor for FindingAgent {
    async fn execute(&self, _input: &str) -> Result<String, ExecutionError> {
        Ok(self.finding.to_string())
    }
}

#[async_trait::async_trait]
impl Executor for CommentAgent {
    async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
        let findings = input.matches("=== ").count();
        Ok(format!("posted {} comments", findings))
    }
}

// Request structure
#[derive(Deserialize)]
struct ReviewRequest {
    pr_url: String,
    #[serde(default)]
    changed_files: Vec<String>,
    #[serde(default)]
    ci_passing: bool,
}

// Response structure
#[derive(Serialize, Deserialize, Clone, Debug)]
struct ReviewResponse {
    summary: String,
    report: serde_json::Value,
}

// Build the workflow for one request
fn build_review_workflow(request: &ReviewRequest) -> Result<TaskOrchestrator, OrchestratorError> {
    let coordinator = RuleDecider::new()
        .with_rule(
            SkipRule::new("analyze_ci", result_key("fetch_pr"), "CI already passing")
                .check(RuleCheck::Contains("all checks passed".to_string())),
        )
        .with_rule(
            SkipRule::new("review_code", result_key("fetch_pr"), "documentation only")
                .check(RuleCheck::Lacks(".rs".to_string()))
                .check(RuleCheck::Lacks(".py".to_string())),
        );

    let mut orchestrator = TaskOrchestrator::new().with_decider(coordinator);
    let fetch = FetchAgent {
        files: request.changed_files.clone(),
        ci_passing: request.ci_passing,
    };

    orchestrator
        .add_task(Task::new("fetch_pr", "Fetch PR Data", fetch).with_priority(10))?
        .add_task(
            Task::new(
                "analyze_ci",
                "Analyze CI Status",
                FindingAgent {
                    finding: "test_login is flaky",
                },
            )
            .depends_on("fetch_pr")
            .with_priority(9)
            .with_skip_condition("Skip if CI is already passing"),
        )?
        .add_task(
            Task::new(
                "review_code",
                "Code Quality Review",
                FindingAgent {
                    finding: "consider splitting this function",
                },
            )
            .depends_on("fetch_pr")
            .with_priority(8)
            .with_skip_condition("Skip documentation-only changes"),
        )?
        .add_task(
            Task::new("create_comments", "Generate PR Comments", CommentAgent)
                .with_dependencies(["analyze_ci", "review_code"])
                .with_priority(5),
        )?;

    Ok(orchestrator)
}

fn to_response(report: &WorkflowReport) -> Result<ReviewResponse, StatusCode> {
    let report_json = serde_json::to_value(report).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize report");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(ReviewResponse {
        summary: report.summary(),
        report: report_json,
    })
}

// Axum handler for review requests
async fn review_pr(
    Json(request): Json<ReviewRequest>,
) -> Result<ResponseJson<ReviewResponse>, StatusCode> {
    tracing::info!(pr = %request.pr_url, "received review request");

    let mut orchestrator = build_review_workflow(&request).map_err(|e| {
        tracing::error!(error = %e, "failed to build workflow");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let report = orchestrator
        .execute_workflow(request.pr_url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "workflow rejected");
            StatusCode::UNPROCESSABLE_ENTITY
        })?;

    Ok(ResponseJson(to_response(&report)?))
}

// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

fn app() -> Router {
    Router::new()
        .route("/review", post(review_pr))
        .route("/health", get(health_check))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for better logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;

    println!("🚀 Axum server running on http://0.0.0.0:3000");
    println!(
        "📝 Try: curl -X POST http://localhost:3000/review -H 'Content-Type: application/json' \
         -d '{{\"pr_url\":\"https://github.com/acme/web/pull/6\",\"changed_files\":[\"src/lib.rs\"]}}'"
    );
    println!("🏥 Health check: curl http://localhost:3000/health");

    axum::serve(listener, app()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::json;

    #[tokio::test]
    async fn test_review_code_change() {
        let server = TestServer::new(app()).unwrap();

        let response = server
            .post("/review")
            .json(&json!({
                "pr_url": "https://github.com/acme/web/pull/6",
                "changed_files": ["src/lib.rs"],
                "ci_passing": false
            }))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let body: ReviewResponse = response.json();
        assert_eq!(body.report["statuses"]["analyze_ci"], "completed");
        assert_eq!(body.report["statuses"]["review_code"], "completed");
        assert_eq!(body.report["results"]["create_comments"], "posted 2 comments");
    }

    #[tokio::test]
    async fn test_review_docs_only_with_green_ci() {
        let server = TestServer::new(app()).unwrap();

        let response = server
            .post("/review")
            .json(&json!({
                "pr_url": "https://github.com/acme/web/pull/7",
                "changed_files": ["README.md"],
                "ci_passing": true
            }))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let body: ReviewResponse = response.json();
        assert_eq!(body.report["statuses"]["analyze_ci"], "skipped");
        assert_eq!(body.report["statuses"]["review_code"], "skipped");
        assert_eq!(body.report["results"]["create_comments"], "posted 0 comments");
        assert!(body.summary.contains("skipped by coordinator"));
    }

    #[tokio::test]
    async fn test_review_bad_url_fails_fetch() {
        let server = TestServer::new(app()).unwrap();

        let response = server
            .post("/review")
            .json(&json!({"pr_url": "not a url"}))
            .await;

        // executor failures are reported, not raised
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: ReviewResponse = response.json();
        assert_eq!(body.report["statuses"]["fetch_pr"], "failed");
        assert_eq!(body.report["statuses"]["analyze_ci"], "skipped");
        assert!(body.summary.contains("dependency fetch_pr is failed"));
    }

    #[tokio::test]
    async fn test_health() {
        let server = TestServer::new(app()).unwrap();
        let response = server.get("/health").await;
        assert_eq!(response.text(), "OK");
    }
}
