//! reqwest-backed implementation of [`GithubApi`]

use crate::{link, ApiResult, GithubApi};
use async_trait::async_trait;
use gitmeter_common::config::GithubSettings;
use gitmeter_common::{
    ApiError, GitmeterError, Page, PageOptions, Repository, Result, Runner, RunnerList,
    UsageResponse,
};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

const API_VERSION: &str = "2022-11-28";

/// GitHub REST client
///
/// Cheap to share behind an `Arc`; holds no mutable state.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl RestClient {
    /// Build a client whose requests are bounded by `timeout`
    pub fn new(settings: &GithubSettings, timeout: Duration) -> Result<Self> {
        let mut base = settings.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            GitmeterError::Config(format!("Invalid github.base_url {:?}: {}", base, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        if let Some(token) = settings.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| GitmeterError::Config(format!("Invalid github.token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| GitmeterError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Request(format!("{}: {}", path, e)))
    }

    fn paged_endpoint(&self, path: &str, opts: PageOptions) -> ApiResult<Url> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("per_page", &opts.per_page.to_string())
            .append_pair("page", &opts.page.to_string());
        Ok(url)
    }

    fn transport(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    /// GET a JSON document, returning it with the next-page token
    async fn get<T: DeserializeOwned>(&self, url: Url) -> ApiResult<(T, Option<u32>)> {
        debug!(url = %url, "Requesting");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let next = response
            .headers()
            .get(header::LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(link::next_page);

        let body = response.bytes().await.map_err(|e| self.transport(e))?;
        let value = serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok((value, next))
    }

    async fn runner_page(&self, path: &str, opts: PageOptions) -> ApiResult<Page<Runner>> {
        let (list, next) = self
            .get::<RunnerList>(self.paged_endpoint(path, opts)?)
            .await?;
        Ok(Page::new(list.runners, next))
    }
}

#[async_trait]
impl GithubApi for RestClient {
    #[instrument(skip(self))]
    async fn list_repositories_by_owner(
        &self,
        owner: &str,
        opts: PageOptions,
    ) -> ApiResult<Page<Repository>> {
        let org_path = format!("orgs/{}/repos", owner);
        match self.get(self.paged_endpoint(&org_path, opts)?).await {
            Ok((repos, next)) => Ok(Page::new(repos, next)),
            Err(err) if err.is_not_found() => {
                debug!(owner, "Owner is not an organization, listing user repositories");
                let user_path = format!("users/{}/repos", owner);
                let (repos, next) = self.get(self.paged_endpoint(&user_path, opts)?).await?;
                Ok(Page::new(repos, next))
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self))]
    async fn list_runners(
        &self,
        owner: &str,
        repo: &str,
        opts: PageOptions,
    ) -> ApiResult<Page<Runner>> {
        self.runner_page(&format!("repos/{}/{}/actions/runners", owner, repo), opts)
            .await
    }

    #[instrument(skip(self))]
    async fn list_org_runners(&self, org: &str, opts: PageOptions) -> ApiResult<Page<Runner>> {
        self.runner_page(&format!("orgs/{}/actions/runners", org), opts)
            .await
    }

    #[instrument(skip(self))]
    async fn list_enterprise_runners(
        &self,
        enterprise: &str,
        opts: PageOptions,
    ) -> ApiResult<Page<Runner>> {
        self.runner_page(&format!("enterprises/{}/actions/runners", enterprise), opts)
            .await
    }

    #[instrument(skip(self))]
    async fn org_billing_usage(&self, org: &str) -> ApiResult<UsageResponse> {
        let url = self.endpoint(&format!("organizations/{}/settings/billing/usage", org))?;
        Ok(self.get(url).await?.0)
    }

    #[instrument(skip(self))]
    async fn enterprise_billing_usage(&self, enterprise: &str) -> ApiResult<UsageResponse> {
        let url = self.endpoint(&format!("enterprises/{}/settings/billing/usage", enterprise))?;
        Ok(self.get(url).await?.0)
    }
}
