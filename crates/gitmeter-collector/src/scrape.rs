//! Scrape orchestration

use crate::collector::Collector;
use crate::metrics::CollectorMetrics;
use crate::sink::MetricSink;
use gitmeter_common::{GitmeterError, Result};
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Runs the enabled collectors for one scrape
pub struct Scraper {
    collectors: Vec<Arc<dyn Collector>>,
    metrics: Arc<CollectorMetrics>,
}

impl Scraper {
    /// Rejects collector sets that describe the same metric twice
    pub fn new(
        collectors: Vec<Arc<dyn Collector>>,
        metrics: Arc<CollectorMetrics>,
    ) -> Result<Self> {
        let mut names = HashSet::new();
        for desc in collectors.iter().flat_map(|collector| collector.describe()) {
            if !names.insert(desc.fq_name.clone()) {
                return Err(GitmeterError::DuplicateMetric(desc.fq_name));
            }
        }

        info!(
            collectors = collectors.len(),
            metrics = names.len(),
            "Scraper ready"
        );
        Ok(Self {
            collectors,
            metrics,
        })
    }

    pub fn describe(&self) -> Vec<Desc> {
        self.collectors
            .iter()
            .flat_map(|collector| collector.describe())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Collect every family before `timeout` elapses
    ///
    /// Collectors run in order against one sink. A collector cut off by the
    /// deadline keeps what it emitted and counts as a failure of its family;
    /// later collectors are skipped.
    pub async fn scrape(&self, timeout: Duration) -> Vec<MetricFamily> {
        let deadline = Instant::now() + timeout;
        let mut sink = MetricSink::new();

        for collector in &self.collectors {
            let collect = collector.collect(&mut sink);
            if tokio::time::timeout_at(deadline, collect).await.is_err() {
                self.metrics.record_failure(collector.family());
                warn!(
                    family = collector.family(),
                    timeout_secs = timeout.as_secs_f64(),
                    "Scrape deadline exceeded, returning partial metrics"
                );
                break;
            }
        }

        debug!(samples = sink.len(), "Scrape finished");
        sink.gather()
    }
}
