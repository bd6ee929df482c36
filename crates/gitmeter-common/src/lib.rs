//! # gitmeter common
//!
//! Shared types, errors and configuration for the gitmeter exporter.
//!
//! ## Core Types
//!
//! - [`Entity`]: resolved repository, organization or enterprise
//! - [`Scope`]: billing/runner scope that becomes the `type`/`name` labels
//! - [`UsageResponse`]/[`UsageItem`]: billing usage wire format
//! - [`Runner`]/[`Repository`]: runner and repository wire format
//! - [`Page`]/[`PageOptions`]: pagination primitives
//!
//! ## Configuration
//!
//! - [`config::ExporterConfig`]: layered file + environment configuration
//! - [`config::Target`]: what to poll and the per-call timeout

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ApiError, GitmeterError, Result};
pub use types::{
    entity::{Entity, EntityKind, Scope, ScopeKind},
    page::{Page, PageOptions},
    runner::{Repository, RepositoryOwner, Runner, RunnerLabel, RunnerList},
    usage::{UsageItem, UsageResponse},
};

/// gitmeter version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix shared by every exported metric name
pub const METRIC_NAMESPACE: &str = "github";
