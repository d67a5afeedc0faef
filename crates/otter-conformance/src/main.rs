use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

use otter_conformance::{ConformanceConfig, ConformanceReport, ConformanceRunner, ScenarioOutcome};

#[derive(Parser, Debug)]
#[command(name = "conformance")]
#[command(about = "Run conformance scenarios against the Otter object model")]
struct Args {
    /// Filter scenarios by path pattern
    #[arg(short, long)]
    filter: Option<String>,

    /// Only run scenarios tagged with this feature (repeatable)
    #[arg(long = "feature")]
    features: Vec<String>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Only list scenarios without running them
    #[arg(long)]
    list_only: bool,

    /// Path to the TOML config (defaults to ./conformance.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of scenarios to run
    #[arg(short = 'n', long)]
    max_scenarios: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ConformanceConfig::load_or_default(args.config.as_deref());
    let results_dir = config.results_dir.clone();

    let mut runner = ConformanceRunner::new(config);
    if let Some(ref filter) = args.filter {
        runner = runner.with_filter(filter.clone());
    }
    for feature in &args.features {
        runner = runner.with_feature(feature.clone());
    }

    if !args.json {
        println!("{}", "Otter Conformance Runner".bold().cyan());
        if let Some(ref filter) = args.filter {
            println!("Filter: {}", filter);
        }
    }

    let mut scenarios = runner.list_scenarios();
    if let Some(max) = args.max_scenarios {
        scenarios.truncate(max);
    }

    if args.list_only {
        for scenario in &scenarios {
            println!("{}", scenario.path);
        }
        println!("\nTotal: {} scenarios", scenarios.len());
        return;
    }

    let mut results = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        if args.verbose && !args.json {
            println!("RUNNING: {}", scenario.path);
        }
        let result = runner.run_scenario(scenario);
        if !args.json {
            match result.outcome {
                ScenarioOutcome::Fail | ScenarioOutcome::Crash => {
                    eprintln!(
                        "{}: {} - {}",
                        "FAIL".red().bold(),
                        result.path,
                        result.error.as_deref().unwrap_or("")
                    );
                }
                ScenarioOutcome::Pass if args.verbose => {
                    println!("{}: {} ({:?})", "PASS".green(), result.path, result.duration);
                }
                _ => {}
            }
        }
        results.push(result);
    }

    let report = ConformanceReport::from_results(&results);

    if args.json {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to generate JSON: {}", e),
        }
    } else {
        report.print_summary();
    }

    if let Some(dir) = results_dir {
        match report.save(&dir) {
            Ok(path) => tracing::info!(path = %path.display(), "saved results"),
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "failed to save results"),
        }
    }

    if !report.is_success() {
        std::process::exit(1);
    }
}
