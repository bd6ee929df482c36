//! Entities and scopes
//!
//! An [`Entity`] is a concrete repository, organization or enterprise that a
//! collector polls during one scrape. A [`Scope`] is the billing/runner
//! context an entity belongs to and becomes the `type`/`name` metric labels.

use crate::error::{GitmeterError, Result};
use serde::{Deserialize, Serialize};

/// Entity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Repository,
    Organization,
    Enterprise,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Repository => write!(f, "repository"),
            EntityKind::Organization => write!(f, "organization"),
            EntityKind::Enterprise => write!(f, "enterprise"),
        }
    }
}

/// A resolved entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entity {
    Repository { owner: String, name: String },
    Organization(String),
    Enterprise(String),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Repository { .. } => EntityKind::Repository,
            Entity::Organization(_) => EntityKind::Organization,
            Entity::Enterprise(_) => EntityKind::Enterprise,
        }
    }

    /// Platform identifier (`owner/name` for repositories)
    pub fn identifier(&self) -> String {
        match self {
            Entity::Repository { owner, name } => format!("{}/{}", owner, name),
            Entity::Organization(name) | Entity::Enterprise(name) => name.clone(),
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.identifier())
    }
}

/// Billing scope type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeKind {
    Org,
    Enterprise,
}

impl ScopeKind {
    /// Value of the `type` metric label
    pub fn as_label(&self) -> &'static str {
        match self {
            ScopeKind::Org => "org",
            ScopeKind::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Billing scope with a guaranteed non-empty name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    kind: ScopeKind,
    name: String,
}

impl Scope {
    pub fn new(kind: ScopeKind, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(GitmeterError::InvalidScope(format!(
                "{} scope requires a name",
                kind
            )));
        }
        Ok(Self { kind, name })
    }

    pub fn org(name: impl Into<String>) -> Result<Self> {
        Self::new(ScopeKind::Org, name)
    }

    pub fn enterprise(name: impl Into<String>) -> Result<Self> {
        Self::new(ScopeKind::Enterprise, name)
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
