//! Usage billing collector
//!
//! Emits one gauge set per usage line item for every configured enterprise
//! and organization. Enterprises are fetched first.

use crate::collector::{bounded, describe_gauge, emit, Collector, Dedup};
use crate::metrics::CollectorMetrics;
use crate::normalizer::{normalize_usage, BILLING_LABELS};
use crate::sink::MetricSink;
use async_trait::async_trait;
use gitmeter_client::{ApiResult, GithubApi};
use gitmeter_common::config::Target;
use gitmeter_common::{Result, Scope, ScopeKind, UsageResponse};
use prometheus::core::Desc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Failure counter label shared by both billing schemas
pub const BILLING_FAMILY: &str = "billing";

/// Enterprise scopes followed by organization scopes
pub(crate) fn billing_scopes(target: &Target) -> Vec<Scope> {
    let enterprises = target.enterprises.iter().map(Scope::enterprise);
    let orgs = target.orgs.iter().map(Scope::org);

    enterprises
        .chain(orgs)
        .filter_map(|scope| match scope {
            Ok(scope) => Some(scope),
            Err(err) => {
                warn!(error = %err, "Skipping invalid billing scope");
                None
            }
        })
        .collect()
}

/// Fetch the usage report of one scope
pub(crate) async fn fetch_usage(
    api: &dyn GithubApi,
    scope: &Scope,
    timeout: Duration,
) -> ApiResult<UsageResponse> {
    match scope.kind() {
        ScopeKind::Enterprise => bounded(timeout, api.enterprise_billing_usage(scope.name())).await,
        ScopeKind::Org => bounded(timeout, api.org_billing_usage(scope.name())).await,
    }
}

struct UsageDescs {
    quantity: Desc,
    gross_amount: Desc,
    discount_amount: Desc,
    net_amount: Desc,
    price_per_unit: Desc,
}

/// Billing collector for the usage report schema
pub struct BillingCollector {
    api: Arc<dyn GithubApi>,
    metrics: Arc<CollectorMetrics>,
    target: Arc<Target>,
    descs: UsageDescs,
}

impl BillingCollector {
    pub fn new(
        api: Arc<dyn GithubApi>,
        metrics: Arc<CollectorMetrics>,
        target: Arc<Target>,
    ) -> Result<Self> {
        let descs = UsageDescs {
            quantity: describe_gauge("usage", "Quantity of the usage item", &BILLING_LABELS)?,
            gross_amount: describe_gauge(
                "usage_gross_amount",
                "Gross amount of the usage item",
                &BILLING_LABELS,
            )?,
            discount_amount: describe_gauge(
                "usage_discount_amount",
                "Discount amount of the usage item",
                &BILLING_LABELS,
            )?,
            net_amount: describe_gauge(
                "usage_net_amount",
                "Net amount of the usage item",
                &BILLING_LABELS,
            )?,
            price_per_unit: describe_gauge(
                "usage_price_per_unit",
                "Price per unit of the usage item",
                &BILLING_LABELS,
            )?,
        };

        metrics.init_family(BILLING_FAMILY);
        Ok(Self {
            api,
            metrics,
            target,
            descs,
        })
    }
}

#[async_trait]
impl Collector for BillingCollector {
    fn family(&self) -> &'static str {
        BILLING_FAMILY
    }

    fn describe(&self) -> Vec<Desc> {
        vec![
            self.descs.quantity.clone(),
            self.descs.gross_amount.clone(),
            self.descs.discount_amount.clone(),
            self.descs.net_amount.clone(),
            self.descs.price_per_unit.clone(),
        ]
    }

    #[instrument(skip_all)]
    async fn collect(&self, sink: &mut MetricSink) {
        let timer = self.metrics.start_timer("billing");
        let mut dedup = Dedup::new();

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
                            "Failed to fetch billing usage"
                        );
                        continue;
                    }
                };

            debug!(
                scope_type = scope.kind().as_label(),
                name = scope.name(),
                items = response.usage_items.len(),
                "Fetched billing usage"
            );

            for item in normalize_usage(response, &scope) {
                if !dedup.first(item.key()) {
                    debug!(
                        name = scope.name(),
                        product = %item.usage.product,
                        sku = %item.usage.sku,
                        date = %item.usage.date,
                        "Already collected usage item"
                    );
                    continue;
                }

                let labels = item.labels();
                let usage = &item.usage;
                emit(sink, &self.descs.quantity, usage.quantity, &labels);
                emit(sink, &self.descs.gross_amount, usage.gross_amount, &labels);
                emit(sink, &self.descs.discount_amount, usage.discount_amount, &labels);
                emit(sink, &self.descs.net_amount, usage.net_amount, &labels);
                emit(sink, &self.descs.price_per_unit, usage.price_per_unit, &labels);
            }
        }

        timer.observe_duration();
    }
}
