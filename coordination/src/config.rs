//! Environment-driven configuration for the orchestrator and sandbox.
//!
//! Every field has a documented default; nothing here is read lazily or
//! cached in a global — callers construct one `AwConfig` at boot and thread
//! it through.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for the orchestration engine.
#[derive(Debug, Clone)]
pub struct AwConfig {
    /// Per-call timeout for agent HTTP requests.
    pub agent_timeout: Duration,
    /// Wall-clock timeout for the test subprocess inside the sandbox.
    pub test_timeout: Duration,
    /// Root directory under which sandbox workspaces are created.
    pub tmp_dir: Option<PathBuf>,
    /// Max number of concurrent sandbox (STR) invocations.
    pub str_parallelism: usize,
    /// HTTP listen address for the orchestrator surface.
    pub bind_addr: String,
    /// Configured architect/planner agent URLs.
    pub planner_urls: Vec<String>,
    /// Configured builder agent URLs.
    pub builder_urls: Vec<String>,
    /// Configured reviewer agent URLs.
    pub reviewer_urls: Vec<String>,
    /// Directory copied into each sandbox workspace as the target project.
    pub template_dir: PathBuf,
    /// Test command run inside the copied project, split on shell-word
    /// boundaries before spawning.
    pub test_command: Vec<String>,
}

fn env_ms(key: &str, default_ms: u64) -> Duration {
    let ms = std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

fn env_urls(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl Default for AwConfig {
    fn default() -> Self {
        let test_command = std::env::var("AW_TEST_COMMAND")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "pytest -q".to_string());

        Self {
            agent_timeout: env_ms("AW_AGENT_TIMEOUT_MS", 60_000),
            test_timeout: env_ms("AW_TEST_TIMEOUT_MS", 60_000),
            tmp_dir: std::env::var("AW_TMPDIR").ok().map(PathBuf::from),
            str_parallelism: std::env::var("AW_STR_PARALLELISM")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(1),
            bind_addr: std::env::var("AW_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8089".to_string()),
            planner_urls: env_urls("AW_PLANNER_URLS"),
            builder_urls: env_urls("AW_BUILDER_URLS"),
            reviewer_urls: env_urls("AW_REVIEWER_URLS"),
            template_dir: std::env::var("AW_TEMPLATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/demo_app")),
            test_command: shlex::split(&test_command).unwrap_or_else(|| vec!["pytest".into(), "-q".into()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_timeouts() {
        std::env::remove_var("AW_AGENT_TIMEOUT_MS");
        std::env::remove_var("AW_TEST_TIMEOUT_MS");
        let cfg = AwConfig::default();
        assert_eq!(cfg.agent_timeout, Duration::from_secs(60));
        assert_eq!(cfg.test_timeout, Duration::from_secs(60));
        assert_eq!(cfg.str_parallelism, 1);
    }

    #[test]
    fn empty_url_env_yields_empty_vec() {
        std::env::remove_var("AW_BUILDER_URLS");
        assert!(env_urls("AW_BUILDER_URLS").is_empty());
    }

    #[test]
    fn url_env_splits_and_trims() {
        std::env::set_var("AW_TEST_URLS_FOR_UNIT_TEST", " http://a:1 , http://b:2");
        let urls = env_urls("AW_TEST_URLS_FOR_UNIT_TEST");
        assert_eq!(urls, vec!["http://a:1", "http://b:2"]);
        std::env::remove_var("AW_TEST_URLS_FOR_UNIT_TEST");
    }

    #[test]
    fn test_command_defaults_to_pytest_q() {
        std::env::remove_var("AW_TEST_COMMAND");
        let cfg = AwConfig::default();
        assert_eq!(cfg.test_command, vec!["pytest".to_string(), "-q".to_string()]);
    }
}
