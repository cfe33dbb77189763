//! Conditional PR review workflow demonstrating:
//! - fetch_pr -> analyze_ci, review_code, scan_security -> create_comments
//! - A rule-based coordinator that skips analysis steps that add nothing
//! - Skipped tasks still unblocking their dependents
//! - Rules loaded from JSON, as a host would from its settings

use std::time::Duration;
use task_orchestrator::{
    ExecutionError, Executor, OrchestratorConfig, RuleDecider, Task, TaskOrchestrator, TaskStatus,
};
use tokio::time::sleep;

/// Simulated review agent with a role and a canned finding
#[derive(Debug, Clone)]
struct ReviewAgent {
    role: &'static str,
    finding: String,
}

impl ReviewAgent {
    fn new(role: &'static str, finding: impl Into<String>) -> Self {
        Self {
            role,
            finding: finding.into(),
        }
    }
}

#[async_trait::async_trait]
impl Executor for ReviewAgent {
    async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
        println!("🤖 {}: working on {} chars of input", self.role, input.len());
        sleep(Duration::from_millis(50)).await;
        Ok(format!("[{}] {}", self.role, self.finding))
    }
}

/// Comment writer that quotes whatever analysis reached it
#[derive(Debug, Clone)]
struct CommentAgent;

#[async_trait::async_trait]
impl Executor for CommentAgent {
    async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
        let findings: Vec<&str> = input
            .lines()
            .filter(|line| line.starts_with('['))
            .collect();
        if findings.is_empty() {
            return Ok("Nice work! Nothing to flag.".to_string());
        }
        Ok(format!("Posted {} inline comments", findings.len()))
    }
}

const RULES: &str = r#"{
    "rules": [
        {
            "task": "analyze_ci",
            "key": "fetch_pr_result",
            "checks": [{"contains": "all checks passed"}],
            "reason": "CI already passing"
        },
        {
            "task": "review_code",
            "key": "fetch_pr_result",
            "checks": [{"contains": ".md"}, {"lacks": ".py"}],
            "reason": "documentation only"
        },
        {
            "task": "scan_security",
            "key": "fetch_pr_result",
            "checks": [{"shorter_than": 120}],
            "reason": "small PR"
        }
    ]
}"#;

fn build_workflow(pr_summary: &str) -> Result<TaskOrchestrator, Box<dyn std::error::Error>> {
    let decider = RuleDecider::from_json(RULES)?;
    let config = OrchestratorConfig::from_json(r#"{"digest_chars": 400}"#)?;
    let mut orchestrator = TaskOrchestrator::with_config(config).with_decider(decider);

    orchestrator
        .add_task(
            Task::new(
                "fetch_pr",
                "Fetch PR Data",
                ReviewAgent::new("pr_fetcher", pr_summary),
            )
            .with_priority(10),
        )?
        .add_task(
            Task::new(
                "analyze_ci",
                "Analyze CI Status",
                ReviewAgent::new("ci_analyzer", "flaky test in test_api.py"),
            )
            .depends_on("fetch_pr")
            .with_priority(9)
            .with_skip_condition("Skip if CI is already passing"),
        )?
        .add_task(
            Task::new(
                "review_code",
                "Code Quality Review",
                ReviewAgent::new("code_reviewer", "long function in handlers.py"),
            )
            .depends_on("fetch_pr")
            .with_priority(8)
            .with_skip_condition("Skip documentation-only changes"),
        )?
        .add_task(
            Task::new(
                "scan_security",
                "Security Analysis",
                ReviewAgent::new("security_scanner", "token logged at debug level"),
            )
            .depends_on("fetch_pr")
            .with_priority(7)
            .with_skip_condition("Skip small PRs"),
        )?
        .add_task(
            Task::new("create_comments", "Generate PR Comments", CommentAgent)
                .with_dependencies(["analyze_ci", "review_code", "scan_security"])
                .with_priority(5),
        )?;

    Ok(orchestrator)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Documentation-only PR ===");
    let mut docs_pr = build_workflow("Changed README.md, all checks passed")?;
    let report = docs_pr
        .execute_workflow("https://github.com/acme/web/pull/6")
        .await?;
    println!("📋 {}", report.summary());
    assert_eq!(report.ids_with(TaskStatus::Skipped).len(), 3);
    assert_eq!(report.statuses["create_comments"], TaskStatus::Completed);

    println!("\n=== Large code PR with failing CI ===");
    let summary = format!(
        "Changed src/api/handlers.py and tests/test_api.py; 2 checks failing. {}",
        "Refactors request validation. ".repeat(5)
    );
    let mut code_pr = build_workflow(&summary)?;
    let report = code_pr
        .execute_workflow("https://github.com/acme/web/pull/7")
        .await?;
    println!("📋 {}", report.summary());
    assert_eq!(report.ids_with(TaskStatus::Completed).len(), 5);
    println!(
        "💬 {}",
        report.results["create_comments"].as_deref().unwrap_or_default()
    );

    Ok(())
}
