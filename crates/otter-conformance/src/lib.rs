//! # Otter Conformance Runner
//!
//! Drives the Otter object model through a catalog of scenarios taken from
//! the ECMAScript conformance suite and reports the results.
//!
//! Scenarios call the object model directly: patterns are built as
//! [`otter_object::BindingPattern`] values and default initializers as
//! closures, so no source text is parsed.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod harness;
pub mod report;
pub mod runner;

pub use catalog::{SCENARIOS, Scenario};
pub use config::ConformanceConfig;
pub use report::{ConformanceReport, FeatureReport};
pub use runner::{ConformanceRunner, ScenarioOutcome, ScenarioResult};
