//! HTTP surface

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use gitmeter_client::GithubApi;
use gitmeter_collector::{
    BillingCollector, Collector, CollectorMetrics, LegacyBillingCollector, RunnerCollector,
    Scraper,
};
use gitmeter_common::config::{BillingSchema, ExporterConfig, ServerSettings};
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared state of the metrics endpoint
pub struct AppState {
    registry: Registry,
    scraper: Scraper,
    scrape_timeout: Duration,
}

impl AppState {
    /// Build and register the collectors enabled in `config`
    pub fn new(config: &ExporterConfig, api: Arc<dyn GithubApi>) -> gitmeter_common::Result<Self> {
        let registry = Registry::new();
        let metrics = Arc::new(CollectorMetrics::new()?);
        metrics.register(&registry)?;

        let target = Arc::new(config.target.clone());
        let mut collectors: Vec<Arc<dyn Collector>> = Vec::new();

        if config.collectors.billing {
            let billing: Arc<dyn Collector> = match config.collectors.billing_schema {
                BillingSchema::V5 => Arc::new(BillingCollector::new(
                    api.clone(),
                    metrics.clone(),
                    target.clone(),
                )?),
                BillingSchema::V4 => Arc::new(LegacyBillingCollector::new(
                    api.clone(),
                    metrics.clone(),
                    target.clone(),
                )?),
            };
            collectors.push(billing);
        }
        if config.collectors.runners {
            collectors.push(Arc::new(RunnerCollector::new(
                api,
                metrics.clone(),
                target,
            )?));
        }

        let scraper = Scraper::new(collectors, metrics)?;
        if scraper.is_empty() {
            warn!("No collectors enabled, only process metrics will be exported");
        }

        Ok(Self {
            registry,
            scraper,
            scrape_timeout: config.server.scrape_timeout(),
        })
    }
}

pub fn router(state: Arc<AppState>, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(metrics))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn serve(settings: &ServerSettings, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr: SocketAddr = settings.addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, path = %settings.path, "Metrics server listening");

    axum::serve(listener, router(state, &settings.path))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Metrics server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let mut families = state.scraper.scrape(state.scrape_timeout).await;
    families.extend(state.registry.gather());
    families.sort_by(|a, b| a.get_name().cmp(b.get_name()));

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buffer) {
        error!(error = %err, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

async fn healthz() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use gitmeter_client::MockGithubApi;
    use gitmeter_common::config::CollectorSettings;
    use gitmeter_common::{ApiError, UsageItem, UsageResponse};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn config(collectors: CollectorSettings) -> ExporterConfig {
        let mut config = ExporterConfig::default();
        config.target.orgs = vec!["acme".into(), "broken".into()];
        config.collectors = collectors;
        config
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_healthz() {
        let state = AppState::new(&ExporterConfig::default(), Arc::new(MockGithubApi::new())).unwrap();
        let (status, body) = get_body(router(Arc::new(state), "/metrics"), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let mut api = MockGithubApi::new();
        api.expect_org_billing_usage().returning(|org| match org {
            "broken" => Err(ApiError::Transport("reset".into())),
            _ => Ok(UsageResponse {
                usage_items: vec![UsageItem {
                    date: "2025-03-01".into(),
                    product: "actions".into(),
                    sku: "linux".into(),
                    quantity: 42.0,
                    unit_type: "minutes".into(),
                    ..UsageItem::default()
                }],
            }),
        });

        let state = AppState::new(
            &config(CollectorSettings {
                billing: true,
                ..CollectorSettings::default()
            }),
            Arc::new(api),
        )
        .unwrap();
        let (status, body) = get_body(router(Arc::new(state), "/metrics"), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("# HELP github_usage Quantity of the usage item"));
        assert!(body.contains("name=\"acme\""));
        assert!(body.contains("} 42"));
        assert!(body.contains("github_request_failures_total{collector=\"billing\"} 1"));
        assert!(body.contains("github_request_duration_seconds_count{collector=\"billing\"} 1"));
    }

    #[tokio::test]
    async fn test_legacy_schema_selected() {
        let mut api = MockGithubApi::new();
        api.expect_org_billing_usage()
            .returning(|_| Ok(UsageResponse::default()));

        let state = AppState::new(
            &config(CollectorSettings {
                billing: true,
                billing_schema: BillingSchema::V4,
                ..CollectorSettings::default()
            }),
            Arc::new(api),
        )
        .unwrap();
        let (_, body) = get_body(router(Arc::new(state), "/custom"), "/custom").await;

        let minutes: Vec<&str> = body
            .lines()
            .filter(|line| line.starts_with("github_action_billing_minutes_used{"))
            .collect();
        assert_eq!(minutes.len(), 2);
        assert!(minutes.iter().any(|line| line.contains("name=\"acme\"") && line.ends_with(" 0")));
        assert!(!body.contains("github_usage{"));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let state = AppState::new(&ExporterConfig::default(), Arc::new(MockGithubApi::new())).unwrap();
        let (status, _) = get_body(router(Arc::new(state), "/metrics"), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
