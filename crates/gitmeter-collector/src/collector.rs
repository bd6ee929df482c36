//! Collector protocol and shared helpers

use crate::sink::MetricSink;
use async_trait::async_trait;
use gitmeter_client::ApiResult;
use gitmeter_common::{ApiError, Result, METRIC_NAMESPACE};
use prometheus::core::Desc;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tracing::error;

/// A metric family producer invoked once per scrape
#[async_trait]
pub trait Collector: Send + Sync {
    /// Label used for this family's failure counter
    fn family(&self) -> &'static str;

    /// Every descriptor this collector can emit; never calls the API
    fn describe(&self) -> Vec<Desc>;

    /// Fetch, normalize and emit. Upstream failures are counted and logged,
    /// never returned.
    async fn collect(&self, sink: &mut MetricSink);
}

/// Build a namespaced descriptor
pub(crate) fn describe_gauge(name: &str, help: &str, labels: &[&str]) -> Result<Desc> {
    Ok(Desc::new(
        format!("{}_{}", METRIC_NAMESPACE, name),
        help.to_string(),
        labels.iter().map(|label| label.to_string()).collect(),
        HashMap::new(),
    )?)
}

/// Write one sample, logging instead of failing
pub(crate) fn emit(sink: &mut MetricSink, desc: &Desc, value: f64, labels: &[&str]) {
    if let Err(err) = sink.gauge(desc, value, labels) {
        error!(metric = %desc.fq_name, error = %err, "Failed to emit sample");
    }
}

/// Bound one upstream call by `timeout`
pub async fn bounded<T, F>(timeout: Duration, call: F) -> ApiResult<T>
where
    F: Future<Output = ApiResult<T>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ApiError::Timeout(timeout))?
}

/// First-occurrence-wins filter for one collect call
#[derive(Debug)]
pub struct Dedup<K> {
    seen: HashSet<K>,
}

impl<K: Hash + Eq> Dedup<K> {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// `true` the first time `key` is offered
    pub fn first(&mut self, key: K) -> bool {
        self.seen.insert(key)
    }
}

impl<K: Hash + Eq> Default for Dedup<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_first_wins() {
        let mut dedup = Dedup::new();
        assert!(dedup.first(("org", "acme")));
        assert!(!dedup.first(("org", "acme")));
        assert!(dedup.first(("enterprise", "acme")));
    }

    #[test]
    fn test_describe_gauge_namespaced() {
        let desc = describe_gauge("usage", "Usage quantity", &["type", "name"]).unwrap();
        assert_eq!(desc.fq_name, "github_usage");
        assert_eq!(desc.variable_labels, vec!["type", "name"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result: ApiResult<()> = bounded(Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(ApiError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let ok = bounded(Duration::from_secs(1), async { Ok::<_, ApiError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = bounded(Duration::from_secs(1), async {
            Err::<u8, _>(ApiError::Transport("reset".into()))
        })
        .await;
        assert!(matches!(err, Err(ApiError::Transport(_))));
    }
}
