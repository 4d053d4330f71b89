//! Structured error taxonomy for the orchestration engine.
//!
//! Four categories, matching the failure surfaces a caller actually needs to
//! distinguish: bad input, a misbehaving agent, a sandbox that couldn't run
//! the tests, and a pipeline-level failure that wraps one of the above with
//! a stage tag.

use thiserror::Error;

/// Malformed or out-of-range request data. Always maps to HTTP 400.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("builders must be in [1, 8], got {0}")]
    BuildersOutOfRange(usize),

    #[error("reviewers must be in [0, 8], got {0}")]
    ReviewersOutOfRange(usize),

    #[error("specialists must be in [0, 8], got {0}")]
    SpecialistsOutOfRange(usize),

    #[error("requested {requested} {role} urls but only {configured} are configured")]
    InsufficientUrls {
        role: &'static str,
        requested: usize,
        configured: usize,
    },

    #[error("task must not be empty")]
    EmptyTask,
}

/// Failures talking to an opaque agent HTTP endpoint.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("agent at {url} returned HTTP {status}: {body_excerpt}")]
    Http {
        url: String,
        status: u16,
        body_excerpt: String,
    },

    #[error("agent at {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("agent at {url} returned a malformed response: {message}")]
    Protocol { url: String, message: String },

    #[error("agent at {url} returned an empty diff")]
    EmptyDiff { url: String },

    #[error("transport error calling {url}: {message}")]
    Transport { url: String, message: String },
}

/// Failures materializing or testing a patched copy of the target project.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("failed to copy template into workspace: {0}")]
    Copy(String),

    #[error("failed to initialize baseline revision: {0}")]
    Baseline(String),

    #[error("unable to apply patch #{index}: {reason}")]
    PatchApply { index: usize, reason: String },

    #[error("failed to commit patch #{index}: {reason}")]
    Commit { index: usize, reason: String },

    #[error("test subprocess failed to spawn: {0}")]
    SubprocessSpawn(String),

    #[error("test run exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Pipeline-level composite error, tagged with the stage that produced it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("stage '{stage}': {source}")]
    Agent {
        stage: &'static str,
        #[source]
        source: AgentError,
    },

    #[error("stage '{stage}': {source}")]
    Sandbox {
        stage: &'static str,
        #[source]
        source: SandboxError,
    },

    #[error("stage '{stage}': every builder failed")]
    AllBuildersFailed { stage: &'static str },
}

impl PipelineError {
    pub fn agent(stage: &'static str, source: AgentError) -> Self {
        Self::Agent { stage, source }
    }

    pub fn sandbox(stage: &'static str, source: SandboxError) -> Self {
        Self::Sandbox { stage, source }
    }
}
