//! Scenario result reporting

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::runner::{ScenarioOutcome, ScenarioResult};

/// Conformance run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Total number of scenarios
    pub total: usize,
    /// Number of passed scenarios
    pub passed: usize,
    /// Number of failed scenarios
    pub failed: usize,
    /// Number of expected failures
    pub known_failures: usize,
    /// Number of skipped scenarios
    pub skipped: usize,
    /// Number of crashed scenarios
    pub crashed: usize,
    /// Pass rate as percentage
    pub pass_rate: f64,
    /// Results by feature
    pub by_feature: BTreeMap<String, FeatureReport>,
    /// Failed scenario details
    pub failures: Vec<FailureInfo>,
}

/// Per-feature report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport {
    /// Total scenarios for this feature
    pub total: usize,
    /// Passed scenarios
    pub passed: usize,
    /// Failed scenarios
    pub failed: usize,
    /// Skipped scenarios
    pub skipped: usize,
}

/// Information about a failed scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Scenario path
    pub path: String,
    /// Error message
    pub error: String,
}

impl ConformanceReport {
    /// Generate a report from scenario results
    pub fn from_results(results: &[ScenarioResult]) -> Self {
        let mut report = Self {
            total: results.len(),
            passed: 0,
            failed: 0,
            known_failures: 0,
            skipped: 0,
            crashed: 0,
            pass_rate: 0.0,
            by_feature: BTreeMap::new(),
            failures: Vec::new(),
        };

        for result in results {
            match result.outcome {
                ScenarioOutcome::Pass => report.passed += 1,
                ScenarioOutcome::Fail | ScenarioOutcome::Crash => {
                    if result.outcome == ScenarioOutcome::Fail {
                        report.failed += 1;
                    } else {
                        report.crashed += 1;
                    }
                    report.failures.push(FailureInfo {
                        path: result.path.clone(),
                        error: result.error.clone().unwrap_or_default(),
                    });
                }
                ScenarioOutcome::KnownFailure => report.known_failures += 1,
                ScenarioOutcome::Skip => report.skipped += 1,
            }

            for feature in &result.features {
                let feature_report = report.by_feature.entry(feature.clone()).or_default();
                feature_report.total += 1;
                match result.outcome {
                    ScenarioOutcome::Pass => feature_report.passed += 1,
                    ScenarioOutcome::Skip => feature_report.skipped += 1,
                    _ => feature_report.failed += 1,
                }
            }
        }

        // skipped scenarios and expected failures do not count
        let run_count = report.passed + report.failed + report.crashed;
        if run_count > 0 {
            report.pass_rate = (report.passed as f64 / run_count as f64) * 100.0;
        }

        report
    }

    /// Whether the run should be reported as successful
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.crashed == 0
    }

    /// Print a summary to stdout
    pub fn print_summary(&self) {
        println!("\n{}", "=== Conformance Results ===".bold());
        println!("Total:   {}", self.total);
        println!("Passed:  {} ({:.1}%)", self.passed.to_string().green(), self.pass_rate);
        println!("Failed:  {}", self.failed.to_string().red());
        println!("Known:   {}", self.known_failures.to_string().yellow());
        println!("Skipped: {}", self.skipped);
        println!("Crashed: {}", self.crashed.to_string().red());

        if !self.by_feature.is_empty() {
            println!("\n{}", "=== By Feature ===".bold());
            for (feature, stats) in &self.by_feature {
                println!(
                    "  {:<28} {}/{} passed, {} skipped",
                    feature, stats.passed, stats.total, stats.skipped
                );
            }
        }

        if !self.failures.is_empty() {
            println!("\n{}", "=== Failures (first 10) ===".bold().red());
            for failure in self.failures.iter().take(10) {
                println!("  {} - {}", failure.path.yellow(), failure.error);
            }
            if self.failures.len() > 10 {
                println!("  ... and {} more", self.failures.len() - 10);
            }
        }
    }

    /// Export to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the JSON report into `dir` as `latest.json`, creating the
    /// directory if needed
    pub fn save(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("latest.json");
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(path: &str, outcome: ScenarioOutcome, feature: &str) -> ScenarioResult {
        ScenarioResult {
            path: path.to_string(),
            outcome,
            duration: Duration::from_millis(1),
            error: (outcome != ScenarioOutcome::Pass).then(|| "Error".to_string()),
            features: vec![feature.to_string()],
        }
    }

    #[test]
    fn test_report_generation() {
        let results = vec![
            result("a.js", ScenarioOutcome::Pass, "generators"),
            result("b.js", ScenarioOutcome::Fail, "generators"),
            result("c.js", ScenarioOutcome::Skip, "BigInt"),
            result("d.js", ScenarioOutcome::KnownFailure, "BigInt"),
        ];

        let report = ConformanceReport::from_results(&results);

        assert_eq!(report.total, 4);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.known_failures, 1);
        assert_eq!(report.pass_rate, 50.0);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_success());

        let generators = &report.by_feature["generators"];
        assert_eq!((generators.total, generators.passed, generators.failed), (2, 1, 1));
    }

    #[test]
    fn test_json_shape() {
        let report = ConformanceReport::from_results(&[result("a.js", ScenarioOutcome::Pass, "x")]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["passed"], 1);
        assert_eq!(json["by_feature"]["x"]["total"], 1);
        assert_eq!(json["pass_rate"], 100.0);
    }
}
