//! Minimal CLI submitter: posts a task to a running orchestrator and maps
//! the response to an exit code. Contains no pipeline logic of its own.

use clap::Parser;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "aw-submit")]
struct Args {
    /// Natural-language task description.
    task: String,

    /// Orchestrator base URL.
    #[arg(long, default_value = "http://127.0.0.1:8089")]
    core_url: String,

    /// Number of builder agents to use.
    #[arg(long, default_value_t = 3)]
    builders: usize,

    /// Use the multi-agent bridge instead of best-of-N.
    #[arg(long)]
    multi: bool,

    /// Number of reviewer agents (multi-agent bridge only).
    #[arg(long, default_value_t = 1)]
    reviewers: usize,

    /// Specialists per plan component (multi-agent bridge only).
    #[arg(long, default_value_t = 0)]
    specialists: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let client = reqwest::Client::new();

    let (path, body) = if args.multi {
        (
            "/api/v1/bridge/multi",
            serde_json::json!({
                "task": args.task,
                "builders": args.builders,
                "reviewers": args.reviewers,
                "specialists": args.specialists,
            }),
        )
    } else {
        (
            "/api/v1/bridge",
            serde_json::json!({"task": args.task, "builders": args.builders}),
        )
    };

    let url = format!("{}{}", args.core_url.trim_end_matches('/'), path);
    let response = match client.post(&url).json(&body).send().await {
        Ok(resp) => resp,
        Err(e) => {
            eprintln!("pipeline request failed: {e}");
            return ExitCode::from(1);
        }
    };

    if !response.status().is_success() {
        eprintln!("pipeline returned {}", response.status());
        return ExitCode::from(1);
    }

    let value: serde_json::Value = match response.json().await {
        Ok(v) => v,
        Err(e) => {
            eprintln!("failed to decode pipeline response: {e}");
            return ExitCode::from(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());

    let winner_tests = value.get("candidate_tests").and_then(|tests| {
        let index = value.get("winner_index").and_then(|i| i.as_u64())? as usize;
        tests.get(index)
    });

    let failed = value
        .get("final_tests")
        .or(winner_tests)
        .and_then(|t| t.get("failed"))
        .and_then(|f| f.as_u64())
        .unwrap_or(0);

    if failed == 0 {
        ExitCode::from(0)
    } else {
        ExitCode::from(2)
    }
}
