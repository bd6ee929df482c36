//! Process-wide collector accumulators
//!
//! Failure counts and request durations outlive single scrapes. They are
//! owned by one [`CollectorMetrics`] value that is handed to every collector
//! at construction and registered with the exporter's registry.

use gitmeter_common::Result;
use prometheus::{HistogramOpts, HistogramTimer, HistogramVec, IntCounterVec, Opts, Registry};

/// Failure counter and duration histogram shared by all collectors
pub struct CollectorMetrics {
    /// Failed upstream requests, labelled by collector family
    pub failures: IntCounterVec,
    /// Sub-fetch durations, labelled by category
    pub duration: HistogramVec,
}

impl CollectorMetrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            failures: IntCounterVec::new(
                Opts::new(
                    "github_request_failures_total",
                    "Total number of failed requests to the api per collector",
                ),
                &["collector"],
            )?,
            duration: HistogramVec::new(
                HistogramOpts::new(
                    "github_request_duration_seconds",
                    "Histogram of latencies for requests to the api per collector",
                )
                .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
                &["collector"],
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.failures.clone()))?;
        registry.register(Box::new(self.duration.clone()))?;
        Ok(())
    }

    /// Export the family's failure counter at zero before any failure
    pub fn init_family(&self, family: &str) {
        self.failures.with_label_values(&[family]).inc_by(0);
    }

    pub fn record_failure(&self, family: &str) {
        self.failures.with_label_values(&[family]).inc();
    }

    pub fn failure_count(&self, family: &str) -> u64 {
        self.failures.with_label_values(&[family]).get()
    }

    /// Observes into `category` when stopped or dropped
    pub fn start_timer(&self, category: &str) -> HistogramTimer {
        self.duration.with_label_values(&[category]).start_timer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_counter() {
        let metrics = CollectorMetrics::new().unwrap();
        metrics.init_family("runner");
        assert_eq!(metrics.failure_count("runner"), 0);

        metrics.record_failure("runner");
        metrics.record_failure("runner");
        assert_eq!(metrics.failure_count("runner"), 2);
        assert_eq!(metrics.failure_count("billing"), 0);
    }

    #[test]
    fn test_register_and_observe() {
        let registry = Registry::new();
        let metrics = CollectorMetrics::new().unwrap();
        metrics.register(&registry).unwrap();
        metrics.init_family("billing");

        metrics.start_timer("billing").observe_duration();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|mf| mf.get_name().to_string())
            .collect();
        assert!(names.contains(&"github_request_failures_total".to_string()));
        assert!(names.contains(&"github_request_duration_seconds".to_string()));

        // Registering twice is rejected by the registry
        assert!(metrics.register(&registry).is_err());
    }
}
