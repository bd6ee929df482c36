//! # gitmeter collector
//!
//! Turns upstream billing and runner data into Prometheus gauges.
//!
//! ## Pipeline
//!
//! 1. [`resolver::EntityResolver`] expands the target into entities
//! 2. [`pagination::fetch_all`] walks every page of a listing
//! 3. [`normalizer`] maps usage reports into billing items or legacy buckets
//! 4. A [`Collector`] deduplicates and writes samples into a [`MetricSink`]
//!
//! [`Scraper`] runs the enabled collectors under one deadline per scrape.
//! Failure counts and durations live in [`CollectorMetrics`], which is
//! shared by every collector and registered once with the exporter.

pub mod billing;
pub mod collector;
pub mod legacy;
pub mod metrics;
pub mod normalizer;
pub mod pagination;
pub mod resolver;
pub mod runner;
pub mod scrape;
pub mod sink;

pub use billing::BillingCollector;
pub use collector::Collector;
pub use legacy::LegacyBillingCollector;
pub use metrics::CollectorMetrics;
pub use runner::RunnerCollector;
pub use scrape::Scraper;
pub use sink::{MetricSink, Series};
