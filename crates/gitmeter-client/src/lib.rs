//! # gitmeter client
//!
//! The upstream contract consumed by the collectors ([`GithubApi`]) and its
//! reqwest implementation ([`RestClient`]).
//!
//! Listing calls return one [`Page`] at a time; walking every page is the
//! caller's job. Every call is a single request/response pair and reports
//! failures as [`ApiError`].

mod link;
pub mod rest;

pub use link::next_page;
pub use rest::RestClient;

use async_trait::async_trait;
use gitmeter_common::{ApiError, Page, PageOptions, Repository, Runner, UsageResponse};

/// Result of one upstream call
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Upstream API surface used by the collectors
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// List repositories owned by an organization or user
    async fn list_repositories_by_owner(
        &self,
        owner: &str,
        opts: PageOptions,
    ) -> ApiResult<Page<Repository>>;

    /// List self-hosted runners of one repository
    async fn list_runners(
        &self,
        owner: &str,
        repo: &str,
        opts: PageOptions,
    ) -> ApiResult<Page<Runner>>;

    /// List self-hosted runners of an organization
    async fn list_org_runners(&self, org: &str, opts: PageOptions) -> ApiResult<Page<Runner>>;

    /// List self-hosted runners of an enterprise
    async fn list_enterprise_runners(
        &self,
        enterprise: &str,
        opts: PageOptions,
    ) -> ApiResult<Page<Runner>>;

    /// Billing usage report of an organization
    async fn org_billing_usage(&self, org: &str) -> ApiResult<UsageResponse>;

    /// Billing usage report of an enterprise
    async fn enterprise_billing_usage(&self, enterprise: &str) -> ApiResult<UsageResponse>;
}
