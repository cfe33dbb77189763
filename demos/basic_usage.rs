//! Basic usage example of the task-orchestrator library

use task_orchestrator::{
    ContextExt, ExecutionError, Executor, FnExecutor, Task, TaskOrchestrator, TaskStatus,
};

/// Stand-in for an LLM agent: replies with a canned answer
#[derive(Debug, Clone)]
struct CannedAgent {
    reply: String,
}

impl CannedAgent {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Executor for CannedAgent {
    async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
        println!("  agent received {} bytes of input", input.len());
        Ok(self.reply.clone())
    }
}

/// Agent that repeats what it was given, so we can see the assembled input
#[derive(Debug, Clone)]
struct EchoAgent;

#[async_trait::async_trait]
impl Executor for EchoAgent {
    async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
        Ok(input.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Basic Pipeline Example ===");

    // fetch -> analyze -> report
    let mut orchestrator = TaskOrchestrator::new();
    orchestrator
        .add_task(
            Task::new("fetch", "Fetch data", CannedAgent::new("ok-fetch")).with_priority(10),
        )?
        .add_task(
            Task::new("analyze", "Analyze data", CannedAgent::new("ok-analyze"))
                .depends_on("fetch")
                .with_priority(8),
        )?
        .add_task(
            Task::new("report", "Write report", CannedAgent::new("ok-report"))
                .depends_on("analyze")
                .with_priority(5),
        )?;

    println!("Execution order: {:?}", orchestrator.execution_order()?);
    orchestrator.set_input("quarterly numbers").await;
    let results = orchestrator.execute_all().await?;

    let context = orchestrator.context();
    for id in ["fetch", "analyze", "report"] {
        println!(
            "{} -> {:?} (context: {:?})",
            id,
            results[id],
            context.get(&format!("{}_result", id)).await
        );
    }
    assert!(
        orchestrator
            .status_snapshot()
            .values()
            .all(|s| *s == TaskStatus::Completed)
    );

    println!("\n=== Failure Containment Example ===");

    // lint fails, so publish (which depends on it) is skipped; docs still runs
    let mut orchestrator = TaskOrchestrator::new();
    let flaky = FnExecutor::new(|_input: String| async move {
        Err::<String, _>(ExecutionError::failed("model quota exceeded"))
    });
    orchestrator
        .add_task(Task::new("lint", "Lint", flaky))?
        .add_task(
            Task::new("publish", "Publish", CannedAgent::new("published")).depends_on("lint"),
        )?
        .add_task(Task::new("docs", "Docs", CannedAgent::new("docs built")))?;

    let report = orchestrator.execute_workflow("release 1.2").await?;
    println!("{}", report);
    assert_eq!(report.statuses["lint"], TaskStatus::Failed);
    assert_eq!(report.statuses["publish"], TaskStatus::Skipped);
    assert_eq!(report.statuses["docs"], TaskStatus::Completed);

    println!("\n=== Context Propagation Example ===");

    let mut orchestrator = TaskOrchestrator::new();
    orchestrator
        .add_task(Task::new(
            "summarize",
            "Summarize issue",
            CannedAgent::new("Users cannot log in after reset"),
        ))?
        .add_task(
            Task::new("plan", "Plan fix", EchoAgent)
                .depends_on("summarize")
                .with_context("repository", "acme/web"),
        )?;

    orchestrator.execute_workflow("Issue #12: login broken").await?;
    let plan_input = orchestrator.task("plan").and_then(|t| t.result()).unwrap_or_default();
    println!("Input seen by `plan`:\n{}", plan_input);
    assert!(plan_input.contains("Users cannot log in"));

    println!("\nOrchestrator examples completed successfully!");
    Ok(())
}
