//! Self-hosted runner collector

use crate::collector::{describe_gauge, emit, Collector, Dedup};
use crate::metrics::CollectorMetrics;
use crate::pagination::fetch_all;
use crate::resolver::EntityResolver;
use crate::sink::MetricSink;
use async_trait::async_trait;
use gitmeter_client::{ApiResult, GithubApi};
use gitmeter_common::config::Target;
use gitmeter_common::{Entity, EntityKind, Result, Runner};
use prometheus::core::Desc;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Failure counter label
pub const RUNNER_FAMILY: &str = "runner";

const RUNNER_LABELS: [&str; 5] = ["owner", "id", "name", "os", "status"];

/// A runner together with the entity it was listed under
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerRecord {
    pub kind: EntityKind,
    /// Identifier of the owning entity
    pub owner: String,
    pub runner: Runner,
}

impl RunnerRecord {
    pub fn key(&self) -> (EntityKind, String, i64) {
        (self.kind, self.owner.clone(), self.runner.id)
    }

    pub fn online(&self) -> f64 {
        if self.runner.is_online() {
            1.0
        } else {
            0.0
        }
    }

    pub fn busy(&self) -> f64 {
        if self.runner.busy {
            1.0
        } else {
            0.0
        }
    }
}

struct RunnerDescs {
    online: Desc,
    busy: Desc,
}

impl RunnerDescs {
    fn new(scope: &str) -> Result<Self> {
        Ok(Self {
            online: describe_gauge(
                &format!("runner_{}_online", scope),
                "Static metrics of runner is online or not",
                &RUNNER_LABELS,
            )?,
            busy: describe_gauge(
                &format!("runner_{}_busy", scope),
                "1 if the runner is busy, 0 otherwise",
                &RUNNER_LABELS,
            )?,
        })
    }
}

/// Runner collector for repositories, enterprises and organizations
pub struct RunnerCollector {
    api: Arc<dyn GithubApi>,
    metrics: Arc<CollectorMetrics>,
    target: Arc<Target>,
    repo: RunnerDescs,
    enterprise: RunnerDescs,
    org: RunnerDescs,
}

impl RunnerCollector {
    pub fn new(
        api: Arc<dyn GithubApi>,
        metrics: Arc<CollectorMetrics>,
        target: Arc<Target>,
    ) -> Result<Self> {
        let collector = Self {
            repo: RunnerDescs::new("repo")?,
            enterprise: RunnerDescs::new("enterprise")?,
            org: RunnerDescs::new("org")?,
            api,
            metrics,
            target,
        };
        collector.metrics.init_family(RUNNER_FAMILY);
        Ok(collector)
    }

    fn descs(&self, kind: EntityKind) -> &RunnerDescs {
        match kind {
            EntityKind::Repository => &self.repo,
            EntityKind::Enterprise => &self.enterprise,
            EntityKind::Organization => &self.org,
        }
    }

    /// Every runner of one entity, all pages
    async fn scope_runners(&self, entity: &Entity) -> ApiResult<Vec<Runner>> {
        let api = self.api.as_ref();
        let timeout = self.target.timeout();
        let sizes = self.target.per_page;

        match entity {
            Entity::Repository { owner, name } => {
                fetch_all(sizes.repo_runners, timeout, move |opts| {
                    api.list_runners(owner, name, opts)
                })
                .await
            }
            Entity::Organization(org) => {
                fetch_all(sizes.aggregate_runners, timeout, move |opts| {
                    api.list_org_runners(org, opts)
                })
                .await
            }
            Entity::Enterprise(enterprise) => {
                fetch_all(sizes.aggregate_runners, timeout, move |opts| {
                    api.list_enterprise_runners(enterprise, opts)
                })
                .await
            }
        }
    }

    async fn records(&self, entities: &[Entity]) -> Vec<RunnerRecord> {
        let mut records = Vec::new();

        for entity in entities {
            match self.scope_runners(entity).await {
                Ok(runners) => {
                    debug!(entity = %entity, count = runners.len(), "Fetched runners");
                    records.extend(runners.into_iter().map(|runner| RunnerRecord {
                        kind: entity.kind(),
                        owner: entity.identifier(),
                        runner,
                    }));
                }
                Err(err) => {
                    self.metrics.record_failure(RUNNER_FAMILY);
                    error!(
                        kind = %entity.kind(),
                        name = %entity.identifier(),
                        error = %err,
                        "Failed to fetch runners"
                    );
                }
            }
        }

        records
    }

    fn emit_records(
        &self,
        sink: &mut MetricSink,
        dedup: &mut Dedup<(EntityKind, String, i64)>,
        records: Vec<RunnerRecord>,
    ) {
        for record in records {
            if !dedup.first(record.key()) {
                debug!(
                    owner = %record.owner,
                    id = record.runner.id,
                    "Already collected runner"
                );
                continue;
            }

            let descs = self.descs(record.kind);
            let id = record.runner.id.to_string();
            let labels = [
                record.owner.as_str(),
                id.as_str(),
                record.runner.name.as_str(),
                record.runner.os.as_str(),
                record.runner.status.as_str(),
            ];

            emit(sink, &descs.online, record.online(), &labels);
            emit(sink, &descs.busy, record.busy(), &labels);
        }
    }
}

#[async_trait]
impl Collector for RunnerCollector {
    fn family(&self) -> &'static str {
        RUNNER_FAMILY
    }

    fn describe(&self) -> Vec<Desc> {
        vec![
            self.repo.online.clone(),
            self.repo.busy.clone(),
            self.enterprise.online.clone(),
            self.enterprise.busy.clone(),
            self.org.online.clone(),
            self.org.busy.clone(),
        ]
    }

    #[instrument(skip_all)]
    async fn collect(&self, sink: &mut MetricSink) {
        let resolver = EntityResolver::new(self.api.as_ref(), &self.target);
        let mut dedup = Dedup::new();

        let timer = self.metrics.start_timer("repo_runners");
        let resolution = resolver.repositories().await;
        for failure in &resolution.failures {
            self.metrics.record_failure(RUNNER_FAMILY);
            error!(
                pattern = %failure.pattern,
                error = %failure.error,
                "Failed to resolve repositories"
            );
        }
        let records = self.records(&resolution.entities).await;
        timer.observe_duration();
        self.emit_records(sink, &mut dedup, records);

        let timer = self.metrics.start_timer("enterprise_runners");
        let records = self.records(&resolver.enterprises()).await;
        timer.observe_duration();
        self.emit_records(sink, &mut dedup, records);

        let timer = self.metrics.start_timer("org_runners");
        let records = self.records(&resolver.organizations()).await;
        timer.observe_duration();
        self.emit_records(sink, &mut dedup, records);
    }
}
