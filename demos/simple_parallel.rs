//! Concurrent execution example demonstrating:
//! - Flow: plan -> research_a, research_b, research_c -> synthesize
//! - The three research agents run in the same wave with random latency
//! - synthesize only starts once every research result is published
//! - Timing shows the wave finishing in roughly the slowest agent's time

use rand::Rng;
use std::time::{Duration, Instant};
use task_orchestrator::{
    ExecutionError, ExecutionMode, Executor, OrchestratorConfig, Task, TaskOrchestrator, Timeout,
};
use tokio::time::sleep;

/// Agent whose latency is drawn at random on each call
#[derive(Debug, Clone)]
struct JitteryAgent {
    name: &'static str,
}

#[async_trait::async_trait]
impl Executor for JitteryAgent {
    async fn execute(&self, _input: &str) -> Result<String, ExecutionError> {
        let delay = Duration::from_millis(rand::rng().random_range(100..400));
        println!("😴 {}: thinking for {:?}", self.name, delay);
        sleep(delay).await;
        println!("✅ {}: done", self.name);
        Ok(format!("{} notes after {:?}", self.name, delay))
    }
}

/// Agent that reports which research notes reached it
#[derive(Debug, Clone)]
struct Synthesizer;

#[async_trait::async_trait]
impl Executor for Synthesizer {
    async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
        let sections = input.matches("=== RESEARCH_").count();
        Ok(format!("synthesized {} research notes", sections))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = OrchestratorConfig::default().with_mode(ExecutionMode::Concurrent);
    let mut orchestrator = TaskOrchestrator::with_config(config);

    orchestrator
        .add_task(Task::new("plan", "Plan", JitteryAgent { name: "planner" }).with_priority(10))?;
    for name in ["research_a", "research_b", "research_c"] {
        let agent = Timeout::new(JitteryAgent { name }, Duration::from_secs(2));
        orchestrator.add_task(Task::new(name, name, agent).depends_on("plan"))?;
    }
    orchestrator.add_task(
        Task::new("synthesize", "Synthesize", Synthesizer)
            .with_dependencies(["research_a", "research_b", "research_c"]),
    )?;

    let start = Instant::now();
    let report = orchestrator
        .execute_workflow("Compare three caching strategies")
        .await?;
    let elapsed = start.elapsed();

    println!("\n{}", report);
    println!("⏱️ Total time: {:?}", elapsed);
    for outcome in &report.tasks {
        println!("  {} ran for {:?} ms", outcome.id, outcome.duration_ms);
    }

    assert!(report.succeeded());
    assert_eq!(
        report.results["synthesize"].as_deref(),
        Some("synthesized 3 research notes")
    );
    // sequential would need up to 4 * 400ms
    assert!(elapsed < Duration::from_millis(1_200));

    Ok(())
}
