//! Orchestrator (ORCH): the best-of-N and multi-agent pipelines.
//!
//! Builder calls fan out concurrently; STR calls are bounded by a
//! semaphore; the specialist sweep is strictly sequential because its
//! acceptance predicate reads and writes shared `(current, accepted)`
//! state.

use crate::error::{AgentError, PipelineError};
use crate::gateway::AgentGateway;
use crate::sandbox::Tester;
use crate::types::{BestOfNResult, MultiBridgeResult, Review, TestRunResult};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs `implement` against every builder URL concurrently, then evaluates
/// each resulting diff through `tester`, bounded by `str_parallelism`
/// concurrent sandbox runs. Candidate order always matches `builder_urls`
/// order, regardless of completion order.
pub async fn best_of_n(
    task: &str,
    builder_urls: &[String],
    gateway: &AgentGateway,
    tester: &Arc<dyn Tester>,
    str_parallelism: usize,
) -> Result<BestOfNResult, PipelineError> {
    let implement_futures = builder_urls.iter().map(|url| {
        let url = url.clone();
        let task = task.to_string();
        async move {
            match gateway.implement(&url, &task).await {
                Ok(outcome) => outcome.diff,
                Err(e) => {
                    tracing::warn!(url, error = %e, "builder failed, recording sentinel candidate");
                    String::new()
                }
            }
        }
    });
    let diffs: Vec<String> = join_all(implement_futures).await;

    let sem = Arc::new(Semaphore::new(str_parallelism.max(1)));
    let test_futures = diffs.iter().enumerate().map(|(i, diff)| {
        let sem = Arc::clone(&sem);
        let tester = Arc::clone(tester);
        let diff = diff.clone();
        async move {
            if diff.is_empty() {
                return TestRunResult::sentinel_failure();
            }
            let _permit = sem.acquire().await.expect("semaphore not closed");
            tester
                .run(std::slice::from_ref(&diff))
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(index = i, error = %e, "sandbox run failed for candidate");
                    TestRunResult::sentinel_failure()
                })
        }
    });
    let test_results: Vec<TestRunResult> = join_all(test_futures).await;

    if test_results.iter().all(|r| r.failed == u32::MAX) {
        return Err(PipelineError::AllBuildersFailed { stage: "base" });
    }

    let winner_index = select_winner(&test_results);

    Ok(BestOfNResult {
        candidate_diffs: diffs,
        candidate_tests: test_results,
        winner_index,
    })
}

/// Selection rule: minimum `failed`, tie-break maximum `passed`, tie-break
/// minimum index.
fn select_winner(results: &[TestRunResult]) -> usize {
    let mut best = 0;
    for (i, candidate) in results.iter().enumerate().skip(1) {
        if candidate.strictly_better_than(&results[best]) {
            best = i;
        }
    }
    best
}

/// Configuration for a single `multi` pipeline invocation.
pub struct MultiRequest<'a> {
    pub task: &'a str,
    pub plan_urls: &'a [String],
    pub builder_urls: &'a [String],
    pub review_urls: &'a [String],
    pub specialists_per_component: usize,
}

/// `multi`: plan → base best-of-N → sequential greedy specialist sweep →
/// final review.
pub async fn multi(
    req: MultiRequest<'_>,
    gateway: &AgentGateway,
    tester: &Arc<dyn Tester>,
    str_parallelism: usize,
    cancel: &CancellationToken,
) -> Result<MultiBridgeResult, PipelineError> {
    let plan = gateway
        .plan(&req.plan_urls[0], req.task)
        .await
        .map_err(|e| PipelineError::agent("plan", e))?;

    let base = best_of_n(req.task, req.builder_urls, gateway, tester, str_parallelism).await?;

    let mut accepted: Vec<String> = vec![base.winner_diff().to_string()];
    let mut current = tester
        .run(&accepted)
        .await
        .map_err(|e| PipelineError::sandbox("base", e))?;

    'components: for component in &plan.components {
        for s in 0..req.specialists_per_component {
            if cancel.is_cancelled() {
                break 'components;
            }

            let focus = if component.target_files.is_empty() {
                "any".to_string()
            } else {
                component.target_files.join(", ")
            };
            let prompt = format!(
                "Implement specialized improvements for component '{}', focus files: {}.",
                component.name, focus
            );

            let builder_idx = (accepted.len() + s) % req.builder_urls.len();
            let builder_url = &req.builder_urls[builder_idx];

            let patch = match gateway.implement(builder_url, &prompt).await {
                Ok(outcome) => outcome.diff,
                Err(e) => {
                    log_skipped_specialist(&component.name, s, &e);
                    continue;
                }
            };

            if cancel.is_cancelled() {
                break 'components;
            }

            let mut trial = accepted.clone();
            trial.push(patch.clone());

            let tr = match tester.run(&trial).await {
                Ok(tr) => tr,
                Err(e) => {
                    tracing::warn!(component = %component.name, specialist = s, error = %e, "sandbox run failed, skipping specialist");
                    continue;
                }
            };

            if tr.non_degrading_vs(&current) {
                info!(component = %component.name, specialist = s, failed = tr.failed, passed = tr.passed, "specialist accepted");
                accepted = trial;
                current = tr;
            } else {
                info!(component = %component.name, specialist = s, "specialist rejected: would regress");
            }
        }
    }

    let review = match req.review_urls.first() {
        None => Review::unavailable("no reviewer configured"),
        Some(url) => match gateway.review(url, req.task, &accepted).await {
            Ok(review) => review,
            Err(e) => Review::unavailable(e),
        },
    };

    Ok(MultiBridgeResult {
        plan,
        base,
        accepted_diffs: accepted,
        final_tests: current,
        review,
    })
}

fn log_skipped_specialist(component: &str, specialist: usize, err: &AgentError) {
    tracing::warn!(component, specialist, error = %err, "agent error, skipping specialist slot");
}
