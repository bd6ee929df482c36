//! gitmeter exporter binary
//!
//! Serves GitHub billing usage and self-hosted runner state in the
//! Prometheus text format.

mod server;
mod telemetry;

use gitmeter_client::{GithubApi, RestClient};
use gitmeter_common::{config::ExporterConfig, VERSION};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ExporterConfig::load()?;
    telemetry::init(&config.log)?;

    info!(version = VERSION, "Starting gitmeter exporter");
    info!(
        enterprises = config.target.enterprises.len(),
        orgs = config.target.orgs.len(),
        repos = config.target.repos.len(),
        billing = config.collectors.billing,
        billing_schema = ?config.collectors.billing_schema,
        runners = config.collectors.runners,
        "Loaded configuration"
    );
    if config.github.token.is_none() {
        warn!("No access token configured, billing and runner endpoints will likely reject requests");
    }

    let api: Arc<dyn GithubApi> =
        Arc::new(RestClient::new(&config.github, config.target.timeout())?);
    let state = Arc::new(server::AppState::new(&config, api)?);

    server::serve(&config.server, state).await
}
