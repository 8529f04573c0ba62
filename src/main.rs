//! Bee Orchestra 演示入口
//!
//! 初始化日志与配置，用脚本化模型和旅行工具组装编排器，运行一次旅行规划；
//! 遇到 Interrupted 时从标准输入读一行作为补充输入并 Resume，直到 run 结束。

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use bee_orchestra::core::create_orchestrator_builder;
use bee_orchestra::llm::MockLlmClient;
use bee_orchestra::observability::{self, RunTrace};
use bee_orchestra::{AgentEvent, EventStream, RunContext, StartOptions};

const REQUEST: &str = "Plan a 3-day trip from Beijing to Tokyo, including weather, flights and a hotel.";

/// 演示用脚本：planner、executor、replanner 按调用顺序共享同一组回复
fn demo_script() -> Vec<&'static str> {
    vec![
        r#"{"steps": ["Check the weather in Tokyo", "Search flights from Beijing to Tokyo", "Find a hotel in Tokyo for the travel dates"]}"#,
        r#"{"tool": "get_weather", "args": {"city": "Tokyo", "date": "2025-10-01"}}"#,
        "The weather in Tokyo looks fine for travelling.",
        r#"{"tool": "search_flights", "args": {"from": "Beijing", "to": "Tokyo", "date": "2025-10-01"}}"#,
        "Found several direct flights from Beijing to Tokyo.",
        r#"{"tool": "ask_for_clarification", "args": {"question": "Which check-in and check-out dates do you prefer?"}}"#,
        r#"{"tool": "search_hotels", "args": {"city": "Tokyo", "check_in": "2025-10-01", "check_out": "2025-10-04"}}"#,
        "Booked a well-rated hotel near the city center.",
        r#"{"action": "finalize", "summary": "Your Tokyo trip is planned: good weather, a direct flight and a central hotel."}"#,
    ]
}

/// 打印事件直到流结束；返回 Interrupted 的断点 ID（若有）
async fn drain(mut stream: EventStream) -> Option<String> {
    let mut resume_token = None;
    while let Some(event) = stream.next().await {
        match &event {
            AgentEvent::Interrupted { reason, resume_token: token } => {
                println!("\n[interrupted] {reason}");
                resume_token = Some(token.clone());
            }
            AgentEvent::Completed { output } => println!("\n[completed] {output}"),
            AgentEvent::Failed { error } => println!("\n[failed] {error}"),
            other => println!("[{}] {}", other.kind(), serde_json::to_string(other).unwrap_or_default()),
        }
    }
    resume_token
}

fn read_answer() -> anyhow::Result<String> {
    print!("> ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read stdin")?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(Into::into);
    let llm = Arc::new(MockLlmClient::new(demo_script()));
    let orchestrator = create_orchestrator_builder(config_path, llm).build();

    let trace = RunTrace::new(REQUEST);
    let ctx = RunContext::new().with_trace(trace.clone());

    let mut pending = drain(orchestrator.start(
        REQUEST,
        StartOptions::default().with_context(ctx.clone()),
    ))
    .await;

    while let Some(checkpoint_id) = pending {
        let answer = read_answer()?;
        let stream = orchestrator
            .resume(&checkpoint_id, serde_json::Value::String(answer), Some(ctx.clone()))
            .await
            .context("Resume failed")?;
        pending = drain(stream).await;
    }

    trace.finish("finished");
    Ok(())
}
