//! Scrape-scoped metric sink
//!
//! Collectors write gauge samples against their static descriptors; the sink
//! turns them into `MetricFamily` values for the text encoder. A fresh sink
//! is created for every scrape, so nothing emitted here outlives it.

use gitmeter_common::Result;
use prometheus::core::{Collector as _, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// One emitted series, used for inspection
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl Series {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// Gauge samples gathered during one scrape
#[derive(Default)]
pub struct MetricSink {
    gauges: BTreeMap<String, GaugeVec>,
    samples: usize,
}

impl MetricSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one gauge sample; `labels` follow the descriptor's label order
    pub fn gauge(&mut self, desc: &Desc, value: f64, labels: &[&str]) -> Result<()> {
        let vec = match self.gauges.entry(desc.fq_name.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let names: Vec<&str> = desc.variable_labels.iter().map(String::as_str).collect();
                let opts = Opts::new(desc.fq_name.clone(), desc.help.clone());
                entry.insert(GaugeVec::new(opts, &names)?)
            }
        };

        vec.get_metric_with_label_values(labels)?.set(value);
        self.samples += 1;
        Ok(())
    }

    /// Number of samples written
    pub fn len(&self) -> usize {
        self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// Metric families sorted by name
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.gauges
            .values()
            .flat_map(|vec| vec.collect())
            .filter(|family| !family.get_metric().is_empty())
            .collect()
    }

    /// All series emitted under a metric name
    pub fn series(&self, name: &str) -> Vec<Series> {
        self.gather()
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric())
            .map(|metric| Series {
                labels: metric
                    .get_label()
                    .iter()
                    .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
                    .collect(),
                value: metric.get_gauge().get_value(),
            })
            .collect()
    }
}
