//! Sandboxed Test Runner (STR): materializes a fresh copy of the target
//! project, applies a sequence of unified diffs against a git baseline, and
//! runs the project's test command.

use crate::config::AwConfig;
use crate::error::SandboxError;
use crate::types::TestRunResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tracing::{debug, warn};

/// A throwaway directory holding one copy of the target project plus a
/// baseline git revision. Removed unconditionally when dropped, so a
/// failure path can never leak a workspace on disk.
struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn project_dir(&self) -> PathBuf {
        self.root.join("project")
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.root.display(), error = %e, "failed to remove sandbox workspace");
            }
        }
    }
}

/// Abstraction over "run these diffs against the target project and report
/// the test outcome" — implemented by [`SandboxTestRunner`] for production
/// use and by deterministic fakes in pipeline tests.
#[async_trait]
pub trait Tester: Send + Sync {
    async fn run(&self, diffs: &[String]) -> Result<TestRunResult, SandboxError>;
}

/// Production [`Tester`]: a real sandbox that copies `template_dir`,
/// applies diffs with `git apply` (falling back to `patch`), and runs
/// `test_command` under `pytest`-style output parsing.
pub struct SandboxTestRunner {
    template_dir: PathBuf,
    tmp_dir: Option<PathBuf>,
    test_command: Vec<String>,
    test_timeout: Duration,
}

impl SandboxTestRunner {
    pub fn new(config: &AwConfig) -> Self {
        Self {
            template_dir: config.template_dir.clone(),
            tmp_dir: config.tmp_dir.clone(),
            test_command: config.test_command.clone(),
            test_timeout: config.test_timeout,
        }
    }

    fn create_workspace(&self) -> Result<Workspace, SandboxError> {
        let root = match &self.tmp_dir {
            Some(base) => {
                std::fs::create_dir_all(base).map_err(|e| SandboxError::Copy(e.to_string()))?;
                tempfile::Builder::new()
                    .prefix("aw_sandbox_")
                    .tempdir_in(base)
            }
            None => tempfile::Builder::new().prefix("aw_sandbox_").tempdir(),
        }
        .map_err(|e| SandboxError::Copy(e.to_string()))?
        .into_path();

        let project = root.join("project");
        copy_dir_recursive(&self.template_dir, &project)
            .map_err(|e| SandboxError::Copy(e.to_string()))?;

        // Diffs are cut against the template root (`a/demo_app/app.py`), so
        // the git baseline must live at `project/`, not `root/` itself.
        run_git(&project, &["init"]).map_err(SandboxError::Baseline)?;
        run_git(&project, &["config", "user.email", "aw-sandbox@local"])
            .map_err(SandboxError::Baseline)?;
        run_git(&project, &["config", "user.name", "aw-sandbox"])
            .map_err(SandboxError::Baseline)?;
        run_git(&project, &["add", "-A"]).map_err(SandboxError::Baseline)?;
        run_git(&project, &["commit", "-m", "baseline", "--allow-empty"])
            .map_err(SandboxError::Baseline)?;

        Ok(Workspace { root })
    }

    fn apply_diff(&self, ws: &Workspace, index: usize, diff: &str) -> Result<(), SandboxError> {
        let project = ws.project_dir();
        let patch_path = ws.root.join(format!("patch_{index}.diff"));
        std::fs::write(&patch_path, diff).map_err(|e| SandboxError::PatchApply {
            index,
            reason: e.to_string(),
        })?;

        let git_result = run_git(&project, &["apply", patch_path.to_str().unwrap_or_default()]);
        if git_result.is_err() {
            let patch_result = std::process::Command::new("patch")
                .args(["-p1", "-i"])
                .arg(&patch_path)
                .current_dir(&project)
                .output();

            let fallback_ok = matches!(&patch_result, Ok(out) if out.status.success());
            if !fallback_ok {
                let reason = git_result.unwrap_err();
                return Err(SandboxError::PatchApply { index, reason });
            }
        }

        run_git(&project, &["add", "-A"]).map_err(|e| SandboxError::Commit {
            index,
            reason: e,
        })?;
        // `--allow-empty` because a specialist patch that is a pure no-op
        // (e.g. re-adds an already-present file) must still advance the
        // baseline rather than fail the whole run.
        run_git(
            &project,
            &["commit", "-m", &format!("apply patch {index}"), "--allow-empty"],
        )
        .map_err(|e| SandboxError::Commit { index, reason: e })?;

        Ok(())
    }

    fn run_test_command(&self, ws: &Workspace) -> Result<Output, SandboxError> {
        let (cmd, args) = self
            .test_command
            .split_first()
            .ok_or_else(|| SandboxError::SubprocessSpawn("empty test command".into()))?;

        let project_dir = ws.project_dir();
        let mut command = std::process::Command::new(cmd);
        command
            .args(args)
            .current_dir(&project_dir)
            .env("PYTHONPATH", &project_dir);

        run_with_timeout(command, self.test_timeout)
    }
}

#[async_trait]
impl Tester for SandboxTestRunner {
    async fn run(&self, diffs: &[String]) -> Result<TestRunResult, SandboxError> {
        let timeout_ms = self.test_timeout.as_millis() as u64;
        let diffs = diffs.to_vec();
        let this_template = self.template_dir.clone();
        let this_tmp = self.tmp_dir.clone();
        let test_command = self.test_command.clone();
        let test_timeout = self.test_timeout;

        tokio::task::spawn_blocking(move || {
            let runner = SandboxTestRunner {
                template_dir: this_template,
                tmp_dir: this_tmp,
                test_command,
                test_timeout,
            };
            let ws = runner.create_workspace()?;

            for (i, diff) in diffs.iter().enumerate() {
                runner.apply_diff(&ws, i, diff)?;
            }

            let output = runner.run_test_command(&ws)?;
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let (total, passed, failed) = parse_summary(&stdout);

            Ok(TestRunResult {
                total,
                passed,
                failed,
                return_code: output.status.code().unwrap_or(-1),
                stdout,
                stderr,
            })
        })
        .await
        .map_err(|e| SandboxError::SubprocessSpawn(format!("sandbox task panicked: {e}")))?
        .map(|result| {
            debug!(passed = result.passed, failed = result.failed, "sandbox run complete");
            result
        })
    }
}

/// Best-effort scan for `pytest -q`-style summary lines. Scans every line
/// for `N passed` / `M failed` / `error` tokens, updating `passed`/`failed`
/// in place, and keeps `total` as the running maximum of `passed + failed`
/// across lines — a later line that only restates `passed` still keeps the
/// `failed` count a prior line established, so `total` never dips below
/// `passed + failed`.
fn parse_summary(stdout: &str) -> (u32, u32, u32) {
    let mut total = 0u32;
    let mut passed = 0u32;
    let mut failed = 0u32;

    for line in stdout.lines() {
        if !(line.contains(" passed") || line.contains(" failed") || line.contains(" error")) {
            continue;
        }

        let parts: Vec<&str> = line.trim().split_whitespace().collect();

        for (i, tok) in parts.iter().enumerate() {
            let Ok(n) = tok.parse::<u32>() else { continue };
            let Some(next) = parts.get(i + 1) else { continue };
            if next.starts_with("passed") {
                passed = n;
            } else if next.starts_with("failed") || next.starts_with("error") {
                failed = n;
            }
        }

        total = total.max(passed + failed);
    }

    (total, passed, failed)
}

fn run_git(cwd: &Path, args: &[&str]) -> Result<String, String> {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).to_string());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn run_with_timeout(
    mut command: std::process::Command,
    timeout: Duration,
) -> Result<Output, SandboxError> {
    use std::sync::mpsc;

    let (tx, rx) = mpsc::channel();
    let mut child = command
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| SandboxError::SubprocessSpawn(e.to_string()))?;

    let handle = std::thread::spawn(move || {
        let result = child.wait_with_output();
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) => {
            let _ = handle.join();
            Ok(output)
        }
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(SandboxError::SubprocessSpawn(e.to_string()))
        }
        Err(_) => Err(SandboxError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let dst_path = dst.join(entry.file_name());
        if ty.is_dir() {
            copy_dir_recursive(&entry.path(), &dst_path)?;
        } else {
            std::fs::copy(entry.path(), &dst_path)?;
        }
    }
    Ok(())
}
