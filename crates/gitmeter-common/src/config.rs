//! gitmeter configuration
//!
//! Values are layered from defaults, an optional file named by
//! `GITMETER_CONFIG`, and `GITMETER_`-prefixed environment variables using
//! `__` as the section separator (`GITMETER_TARGET__ORGS=acme,globex`).

use crate::error::{GitmeterError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "GITMETER_CONFIG";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "GITMETER";

/// Exporter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub server: ServerSettings,
    pub github: GithubSettings,
    pub target: Target,
    pub collectors: CollectorSettings,
    pub log: LogSettings,
}

impl ExporterConfig {
    /// Load configuration from `.env`, the optional file and the environment
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(config::File::with_name(&path));
        }

        let cfg: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(source: &str) -> Result<Self> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.server.path.starts_with('/') {
            return Err(GitmeterError::Config(format!(
                "server.path must start with '/', got {:?}",
                self.server.path
            )));
        }
        if self.server.path == "/healthz" {
            return Err(GitmeterError::Config(
                "server.path must not shadow /healthz".into(),
            ));
        }
        if self.server.scrape_timeout_secs == 0 {
            return Err(GitmeterError::Config(
                "server.scrape_timeout_secs must be positive".into(),
            ));
        }
        self.target.validate()
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub addr: String,
    /// Path serving the metrics
    pub path: String,
    /// Upper bound for one whole scrape
    pub scrape_timeout_secs: u64,
}

impl ServerSettings {
    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:9504".to_string(),
            path: "/metrics".to_string(),
            scrape_timeout_secs: 30,
        }
    }
}

/// Upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    /// REST API root
    pub base_url: String,
    /// Access token sent as bearer authorization
    pub token: Option<String>,
    pub user_agent: String,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com/".to_string(),
            token: None,
            user_agent: format!("gitmeter/{}", crate::VERSION),
        }
    }
}

/// Entities to poll and how to poll them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    #[serde(deserialize_with = "string_list")]
    pub enterprises: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub orgs: Vec<String>,
    /// `owner/name` patterns, `*` and `?` allowed
    #[serde(deserialize_with = "string_list")]
    pub repos: Vec<String>,
    /// Bound for each upstream call
    pub timeout_secs: u64,
    pub per_page: PageSizes,
}

impl Target {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(GitmeterError::Config(
                "target.timeout_secs must be positive".into(),
            ));
        }

        let mut names = self
            .enterprises
            .iter()
            .chain(&self.orgs)
            .chain(&self.repos);
        if names.any(|name| name.trim().is_empty()) {
            return Err(GitmeterError::Config(
                "target entries must not be empty".into(),
            ));
        }

        self.per_page.validate()
    }
}

impl Default for Target {
    fn default() -> Self {
        Self {
            enterprises: Vec::new(),
            orgs: Vec::new(),
            repos: Vec::new(),
            timeout_secs: 10,
            per_page: PageSizes::default(),
        }
    }
}

/// Page sizes per listing family
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSizes {
    /// Repository listing used by pattern resolution
    pub repositories: u32,
    /// Per-repository runner listing
    pub repo_runners: u32,
    /// Organization and enterprise runner listings
    pub aggregate_runners: u32,
}

impl PageSizes {
    fn validate(&self) -> Result<()> {
        if self.repositories == 0 || self.repo_runners == 0 || self.aggregate_runners == 0 {
            return Err(GitmeterError::Config(
                "target.per_page values must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            repositories: 100,
            repo_runners: 200,
            aggregate_runners: 50,
        }
    }
}

/// Billing metric schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingSchema {
    /// One gauge set per usage line item
    #[default]
    V5,
    /// Aggregated action/package/storage buckets
    V4,
}

/// Enabled collectors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    pub billing: bool,
    pub runners: bool,
    pub billing_schema: BillingSchema,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Accept either a list or a comma-separated string
fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::List(values)) => values,
        Some(Raw::Csv(value)) => value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect(),
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ExporterConfig::default();
        assert_eq!(cfg.server.addr, "0.0.0.0:9504");
        assert_eq!(cfg.server.path, "/metrics");
        assert_eq!(cfg.target.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.target.per_page.repo_runners, 200);
        assert_eq!(cfg.target.per_page.aggregate_runners, 50);
        assert_eq!(cfg.collectors.billing_schema, BillingSchema::V5);
        assert!(!cfg.collectors.billing);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let cfg = ExporterConfig::from_toml(
            r#"
            [target]
            orgs = ["acme", "globex"]
            repos = "acme/*, globex/api"
            timeout_secs = 5

            [target.per_page]
            repo_runners = 100

            [collectors]
            runners = true
            billing_schema = "v4"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.target.orgs, vec!["acme", "globex"]);
        assert_eq!(cfg.target.repos, vec!["acme/*", "globex/api"]);
        assert_eq!(cfg.target.timeout_secs, 5);
        assert_eq!(cfg.target.per_page.repo_runners, 100);
        assert_eq!(cfg.target.per_page.repositories, 100);
        assert!(cfg.collectors.runners);
        assert_eq!(cfg.collectors.billing_schema, BillingSchema::V4);
        assert_eq!(cfg.server.path, "/metrics");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ExporterConfig::from_toml("[target]\ntimeout_secs = 0").is_err());
        assert!(ExporterConfig::from_toml("[server]\npath = \"metrics\"").is_err());
        assert!(ExporterConfig::from_toml("[target.per_page]\naggregate_runners = 0").is_err());
        assert!(ExporterConfig::from_toml("[target]\norgs = [\"\"]").is_err());
    }

    #[test]
    fn test_string_list_from_json() {
        let target: Target =
            serde_json::from_str(r#"{"orgs": "a, b,,c", "enterprises": ["e"]}"#).unwrap();
        assert_eq!(target.orgs, vec!["a", "b", "c"]);
        assert_eq!(target.enterprises, vec!["e"]);
        assert!(target.repos.is_empty());
    }
}
