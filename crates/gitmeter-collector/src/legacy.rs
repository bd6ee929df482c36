//! Legacy billing collector
//!
//! Reproduces the pre-usage-report action, package and storage gauges from a
//! single usage fetch per scope.

use crate::billing::{billing_scopes, fetch_usage, BILLING_FAMILY};
use crate::collector::{describe_gauge, emit, Collector, Dedup};
use crate::metrics::CollectorMetrics;
use crate::normalizer::{normalize_legacy, LegacyBilling};
use crate::sink::MetricSink;
use async_trait::async_trait;
use gitmeter_client::GithubApi;
use gitmeter_common::config::Target;
use gitmeter_common::{Result, ScopeKind};
use prometheus::core::Desc;
use std::sync::Arc;
use tracing::{debug, error, instrument};

const SCOPE_LABELS: [&str; 2] = ["type", "name"];
const BREAKDOWN_LABELS: [&str; 3] = ["type", "name", "os"];

struct LegacyDescs {
    minutes_used: Desc,
    minutes_used_breakdown: Desc,
    paid_minutes: Desc,
    included_minutes: Desc,
    bandwidth_used: Desc,
    bandwidth_paid: Desc,
    bandwidth_included: Desc,
    days_left: Desc,
    estimated_paid_storage: Desc,
    estimated_storage: Desc,
}

impl LegacyDescs {
    fn new() -> Result<Self> {
        Ok(Self {
            minutes_used: describe_gauge(
                "action_billing_minutes_used",
                "Total action minutes used for this type",
                &SCOPE_LABELS,
            )?,
            minutes_used_breakdown: describe_gauge(
                "action_billing_minutes_used_breakdown",
                "Total action minutes used for this type broken down by operating system",
                &BREAKDOWN_LABELS,
            )?,
            paid_minutes: describe_gauge(
                "action_billing_paid_minutes",
                "Total paid minutes used for this type",
                &SCOPE_LABELS,
            )?,
            included_minutes: describe_gauge(
                "action_billing_included_minutes",
                "Included minutes for this type",
                &SCOPE_LABELS,
            )?,
            bandwidth_used: describe_gauge(
                "package_billing_gigabytes_bandwidth_used",
                "Total bandwidth used by this type in Gigabytes",
                &SCOPE_LABELS,
            )?,
            bandwidth_paid: describe_gauge(
                "package_billing_paid_gigabytes_bandwidth_used",
                "Total paid bandwidth used by this type in Gigabytes",
                &SCOPE_LABELS,
            )?,
            bandwidth_included: describe_gauge(
                "package_billing_included_gigabytes_bandwidth",
                "Included bandwidth for this type in Gigabytes",
                &SCOPE_LABELS,
            )?,
            days_left: describe_gauge(
                "storage_billing_days_left_in_cycle",
                "Days left within this billing cycle for this type",
                &SCOPE_LABELS,
            )?,
            estimated_paid_storage: describe_gauge(
                "storage_billing_estimated_paid_storage_for_month",
                "Estimated paid storage for this month for this type",
                &SCOPE_LABELS,
            )?,
            estimated_storage: describe_gauge(
                "storage_billing_estimated_storage_for_month",
                "Estimated total storage for this month for this type",
                &SCOPE_LABELS,
            )?,
        })
    }

    fn all(&self) -> Vec<Desc> {
        vec![
            self.minutes_used.clone(),
            self.minutes_used_breakdown.clone(),
            self.paid_minutes.clone(),
            self.included_minutes.clone(),
            self.bandwidth_used.clone(),
            self.bandwidth_paid.clone(),
            self.bandwidth_included.clone(),
            self.days_left.clone(),
            self.estimated_paid_storage.clone(),
            self.estimated_storage.clone(),
        ]
    }
}

/// Billing collector for the legacy action/package/storage schema
pub struct LegacyBillingCollector {
    api: Arc<dyn GithubApi>,
    metrics: Arc<CollectorMetrics>,
    target: Arc<Target>,
    descs: LegacyDescs,
}

impl LegacyBillingCollector {
    pub fn new(
        api: Arc<dyn GithubApi>,
        metrics: Arc<CollectorMetrics>,
        target: Arc<Target>,
    ) -> Result<Self> {
        let descs = LegacyDescs::new()?;
        metrics.init_family(BILLING_FAMILY);
        Ok(Self {
            api,
            metrics,
            target,
            descs,
        })
    }

    fn emit_bucket(&self, sink: &mut MetricSink, bill: &LegacyBilling) {
        let scope = bill.scope();
        let labels = [scope.kind().as_label(), scope.name()];
        let descs = &self.descs;

        match bill {
            LegacyBilling::Actions(actions) => {
                emit(sink, &descs.minutes_used, actions.total_minutes_used, &labels);
                emit(sink, &descs.paid_minutes, actions.total_paid_minutes_used, &labels);
                emit(sink, &descs.included_minutes, actions.included_minutes, &labels);
                for (os, minutes) in &actions.minutes_used_breakdown {
                    emit(
                        sink,
                        &descs.minutes_used_breakdown,
                        *minutes as f64,
                        &[labels[0], labels[1], os.as_str()],
                    );
                }
            }
            LegacyBilling::Packages(packages) => {
                emit(sink, &descs.bandwidth_used, packages.total_gigabytes_bandwidth_used, &labels);
                emit(
                    sink,
                    &descs.bandwidth_paid,
                    packages.total_paid_gigabytes_bandwidth_used,
                    &labels,
                );
                emit(sink, &descs.bandwidth_included, packages.included_gigabytes_bandwidth, &labels);
            }
            LegacyBilling::Storage(storage) => {
                emit(
                    sink,
                    &descs.days_left,
                    storage.days_left_in_billing_cycle as f64,
                    &labels,
                );
                emit(
                    sink,
                    &descs.estimated_paid_storage,
                    storage.estimated_paid_storage_for_month,
                    &labels,
                );
                emit(
                    sink,
                    &descs.estimated_storage,
                    storage.estimated_storage_for_month,
                    &labels,
                );
            }
        }
    }
}

#[async_trait]
impl Collector for LegacyBillingCollector {
    fn family(&self) -> &'static str {
        BILLING_FAMILY
    }

    fn describe(&self) -> Vec<Desc> {
        self.descs.all()
    }

    #[instrument(skip_all)]
    async fn collect(&self, sink: &mut MetricSink) {
        let timer = self.metrics.start_timer("billing_legacy");
        let today = chrono::Utc::now().date_naive();
        let mut dedup: Dedup<(&'static str, ScopeKind, String)> = Dedup::new();

        for scope in billing_scopes(&self.target) {
            let response =
                match fetch_usage(self.api.as_ref(), &scope, self.target.timeout()).await {
                    Ok(response) => response,
                    Err(err) => {
                        self.metrics.record_failure(BILLING_FAMILY);
                        error!(
                            scope_type = scope.kind().as_label(),
                            name = scope.name(),
                            error = %err,
                            "Failed to fetch legacy billing"
                        );
                        continue;
                    }
                };

            for bill in normalize_legacy(&response, &scope, today) {
                let key = (bill.bucket(), scope.kind(), scope.name().to_string());
                if !dedup.first(key) {
                    debug!(
                        bucket = bill.bucket(),
                        scope_type = scope.kind().as_label(),
                        name = scope.name(),
                        "Already collected legacy billing"
                    );
                    continue;
                }

                debug!(
                    bucket = bill.bucket(),
                    scope_type = scope.kind().as_label(),
                    name = scope.name(),
                    "Collecting legacy billing"
                );
                self.emit_bucket(sink, &bill);
            }
        }

        timer.observe_duration();
    }
}
