//! Wire-shared domain types: plans, diffs, candidates, and the two
//! top-level pipeline results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single component of an architect's plan. Purely advisory — used only
/// to build specialist prompts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Component {
    pub name: String,
    #[serde(default)]
    pub target_files: Vec<String>,
}

/// An architect's plan: an ordered, possibly empty list of components.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    #[serde(default)]
    pub components: Vec<Component>,
}

/// Aggregated outcome of running a project's test suite against one or
/// more applied diffs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TestRunResult {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestRunResult {
    /// A sentinel result for a builder that failed to produce a usable
    /// diff. `failed` is pinned to the maximum representable value so this
    /// candidate can never win a best-of-N selection.
    pub fn sentinel_failure() -> Self {
        Self {
            total: 0,
            passed: 0,
            failed: u32::MAX,
            return_code: -1,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// True if `self` is strictly better than `other` under the
    /// `(min failed, max passed)` order used for best-of-N selection.
    pub fn strictly_better_than(&self, other: &TestRunResult) -> bool {
        self.failed < other.failed || (self.failed == other.failed && self.passed > other.passed)
    }

    /// True if `self` does not regress relative to `other` under the
    /// monotone-acceptance predicate used by the specialist sweep.
    pub fn non_degrading_vs(&self, other: &TestRunResult) -> bool {
        self.failed < other.failed || (self.failed == other.failed && self.passed >= other.passed)
    }
}

/// Result of a best-of-N run: every candidate plus the index of the winner.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BestOfNResult {
    pub candidate_diffs: Vec<String>,
    pub candidate_tests: Vec<TestRunResult>,
    pub winner_index: usize,
}

impl BestOfNResult {
    pub fn winner_diff(&self) -> &str {
        &self.candidate_diffs[self.winner_index]
    }

    pub fn winner_tests(&self) -> &TestRunResult {
        &self.candidate_tests[self.winner_index]
    }
}

/// A reviewer's verdict. `score` is clamped to `[0,1]` on ingest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Review {
    pub score: f64,
    pub rationale: String,
}

impl Review {
    pub fn clamp(score: f64, rationale: impl Into<String>) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            rationale: rationale.into(),
        }
    }

    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self {
            score: 0.0,
            rationale: format!("unavailable: {err}"),
        }
    }
}

/// Result of a full multi-agent pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MultiBridgeResult {
    pub plan: Plan,
    pub base: BestOfNResult,
    pub accepted_diffs: Vec<String>,
    pub final_tests: TestRunResult,
    pub review: Review,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_better_prefers_fewer_failures() {
        let a = TestRunResult { total: 2, passed: 1, failed: 1, return_code: 0, stdout: String::new(), stderr: String::new() };
        let b = TestRunResult { total: 2, passed: 0, failed: 2, return_code: 1, stdout: String::new(), stderr: String::new() };
        assert!(a.strictly_better_than(&b));
        assert!(!b.strictly_better_than(&a));
    }

    #[test]
    fn strictly_better_tie_breaks_on_more_passed() {
        let a = TestRunResult { total: 2, passed: 2, failed: 0, return_code: 0, stdout: String::new(), stderr: String::new() };
        let b = TestRunResult { total: 2, passed: 1, failed: 0, return_code: 0, stdout: String::new(), stderr: String::new() };
        assert!(a.strictly_better_than(&b));
    }

    #[test]
    fn non_degrading_allows_equal_passed() {
        let a = TestRunResult { total: 2, passed: 2, failed: 0, return_code: 0, stdout: String::new(), stderr: String::new() };
        let b = TestRunResult { total: 2, passed: 2, failed: 0, return_code: 0, stdout: String::new(), stderr: String::new() };
        assert!(a.non_degrading_vs(&b));
    }

    #[test]
    fn sentinel_failure_never_wins() {
        let sentinel = TestRunResult::sentinel_failure();
        let real = TestRunResult { total: 1, passed: 0, failed: 1, return_code: 1, stdout: String::new(), stderr: String::new() };
        assert!(real.strictly_better_than(&sentinel));
    }

    #[test]
    fn review_clamps_out_of_range_scores() {
        assert_eq!(Review::clamp(1.5, "x").score, 1.0);
        assert_eq!(Review::clamp(-0.5, "x").score, 0.0);
    }
}
