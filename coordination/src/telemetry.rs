//! Structured `tracing` span/field helpers for the orchestration pipeline.
//!
//! Field names use OpenTelemetry-style dot notation so logs can be exported
//! without a remapping layer.
//!
//! # Span Hierarchy
//!
//! ```text
//! aw.pipeline            (one best_of_n or multi call)
//!   ├─ aw.agent.call     (a single plan/implement/review HTTP call)
//!   └─ aw.sandbox.run    (a single STR invocation)
//! ```

pub const SPAN_PIPELINE: &str = "aw.pipeline";
pub const SPAN_AGENT_CALL: &str = "aw.agent.call";
pub const SPAN_SANDBOX_RUN: &str = "aw.sandbox.run";

pub const FIELD_AGENT_ROLE: &str = "agent.role";
pub const FIELD_AGENT_URL: &str = "agent.url";
pub const FIELD_AGENT_OUTCOME: &str = "agent.outcome";
pub const FIELD_AGENT_DURATION_MS: &str = "agent.duration_ms";

pub const FIELD_SANDBOX_DIFF_COUNT: &str = "sandbox.diff_count";
pub const FIELD_SANDBOX_OUTCOME: &str = "sandbox.outcome";
pub const FIELD_SANDBOX_PASSED: &str = "sandbox.passed";
pub const FIELD_SANDBOX_FAILED: &str = "sandbox.failed";

pub const FIELD_PIPELINE_STAGE: &str = "pipeline.stage";

/// Initialize the global `tracing` subscriber from `RUST_LOG`/`AW_LOG`,
/// defaulting to `info`. Call once, at process start.
pub fn init_subscriber() {
    let filter = std::env::var("AW_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .try_init();
}
