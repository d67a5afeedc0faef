//! Conformance scenario runner

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use otter_object::Realm;

use crate::catalog::{SCENARIOS, Scenario};
use crate::config::ConformanceConfig;

/// Runs catalogued scenarios, each in a fresh realm
pub struct ConformanceRunner {
    config: ConformanceConfig,
    /// Path filter
    filter: Option<String>,
    /// Only run scenarios tagged with one of these features
    features: Vec<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario path
    pub path: String,
    /// Scenario outcome
    pub outcome: ScenarioOutcome,
    /// Execution time
    pub duration: Duration,
    /// Error message if it did not pass
    pub error: Option<String>,
    /// Features the scenario exercises
    pub features: Vec<String>,
}

/// Scenario outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioOutcome {
    /// Scenario passed
    Pass,
    /// Scenario failed
    Fail,
    /// Scenario failed and is listed in `known_failures`
    KnownFailure,
    /// Scenario was skipped
    Skip,
    /// Scenario panicked
    Crash,
}

impl ConformanceRunner {
    /// Create a runner with `config`
    pub fn new(config: ConformanceConfig) -> Self {
        Self {
            config,
            filter: None,
            features: Vec::new(),
        }
    }

    /// Set path filter
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Restrict the run to scenarios tagged with `feature`
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    /// The active configuration
    pub fn config(&self) -> &ConformanceConfig {
        &self.config
    }

    /// Scenarios selected by the filter and feature list
    pub fn list_scenarios(&self) -> Vec<&'static Scenario> {
        SCENARIOS
            .iter()
            .filter(|s| self.filter.as_ref().is_none_or(|f| s.path.contains(f.as_str())))
            .filter(|s| {
                self.features.is_empty()
                    || s.features.iter().any(|f| self.features.iter().any(|want| want == f))
            })
            .collect()
    }

    /// Run every selected scenario
    pub fn run_all(&self) -> Vec<ScenarioResult> {
        self.list_scenarios().into_iter().map(|s| self.run_scenario(s)).collect()
    }

    /// Run a single scenario
    pub fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        let features: Vec<String> = scenario.features.iter().map(|f| f.to_string()).collect();
        let finish = |outcome, error| ScenarioResult {
            path: scenario.path.to_string(),
            outcome,
            duration: start.elapsed(),
            error,
            features: features.clone(),
        };

        if self.config.is_ignored(scenario.path) {
            return finish(ScenarioOutcome::Skip, Some("Ignored by configuration".to_string()));
        }
        if let Some(feature) = self.config.skipped_feature(scenario.features) {
            return finish(ScenarioOutcome::Skip, Some(format!("Skipped feature: {}", feature)));
        }

        tracing::debug!(path = scenario.path, "running scenario");
        let (outcome, error) = self.execute(scenario);

        match (outcome, self.config.is_known_failure(scenario.path)) {
            (ScenarioOutcome::Fail | ScenarioOutcome::Crash, true) => finish(ScenarioOutcome::KnownFailure, error),
            (ScenarioOutcome::Pass, true) => {
                tracing::warn!(path = scenario.path, "known failure now passes");
                finish(ScenarioOutcome::Pass, None)
            }
            _ => finish(outcome, error),
        }
    }

    /// Execute a scenario and return (outcome, error_message)
    fn execute(&self, scenario: &Scenario) -> (ScenarioOutcome, Option<String>) {
        let realm = Realm::with_options(self.config.realm);
        let result = panic::catch_unwind(AssertUnwindSafe(|| (scenario.run)(&realm)));

        match result {
            Ok(Ok(())) => {
                // settle anything the scenario left queued
                let ran = realm.run_jobs();
                if scenario.is_async || ran > 0 {
                    tracing::trace!(path = scenario.path, jobs = ran, "drained job queue");
                }
                let failures = realm.take_job_failures();
                if failures.is_empty() {
                    (ScenarioOutcome::Pass, None)
                } else {
                    (ScenarioOutcome::Fail, Some(format!("Job failed: {}", failures.join("; "))))
                }
            }
            Ok(Err(e)) => (ScenarioOutcome::Fail, Some(e.to_string())),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!(path = scenario.path, %message, "scenario panicked");
                (ScenarioOutcome::Crash, Some(format!("Panic: {}", message)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{HarnessError, HarnessResult};

    fn failing(_: &Realm) -> HarnessResult {
        Err(HarnessError::Assertion("nope".into()))
    }

    fn panicking(_: &Realm) -> HarnessResult {
        panic!("boom")
    }

    const FAILING: Scenario = Scenario {
        path: "local/failing.js",
        features: &["local"],
        is_async: false,
        run: failing,
    };

    #[test]
    fn test_filter_and_feature_selection() {
        let runner = ConformanceRunner::new(ConformanceConfig::default()).with_filter("dstr");
        assert!(runner.list_scenarios().iter().all(|s| s.path.contains("dstr")));
        assert!(!runner.list_scenarios().is_empty());

        let runner = ConformanceRunner::new(ConformanceConfig::default()).with_feature("generators");
        let selected = runner.list_scenarios();
        assert!(!selected.is_empty());
        assert!(selected.iter().all(|s| s.features.contains(&"generators")));
    }

    #[test]
    fn test_skip_feature_and_ignore() {
        let config = ConformanceConfig {
            skip_features: vec!["BigInt".to_string()],
            ignored_scenarios: vec!["sab-gating".to_string()],
            ..Default::default()
        };
        let runner = ConformanceRunner::new(config);
        let results = runner.run_all();
        for result in &results {
            let skipped = result.features.iter().any(|f| f == "BigInt") || result.path.contains("sab-gating");
            assert_eq!(result.outcome == ScenarioOutcome::Skip, skipped, "{}", result.path);
        }
    }

    #[test]
    fn test_known_failure_and_crash() {
        let runner = ConformanceRunner::new(ConformanceConfig::default());
        let result = runner.run_scenario(&FAILING);
        assert_eq!(result.outcome, ScenarioOutcome::Fail);
        assert_eq!(result.error.as_deref(), Some("nope"));

        let crash = Scenario {
            run: panicking,
            ..FAILING
        };
        assert_eq!(runner.run_scenario(&crash).outcome, ScenarioOutcome::Crash);

        let config = ConformanceConfig {
            known_failures: vec!["local/".to_string()],
            ..Default::default()
        };
        let runner = ConformanceRunner::new(config);
        assert_eq!(runner.run_scenario(&FAILING).outcome, ScenarioOutcome::KnownFailure);
    }
}
