//! Entity resolution
//!
//! Expands the configured target into concrete entities. Organizations and
//! enterprises map one to one. Repository patterns are `owner/name` where
//! the name part may contain `*` and `?`; wildcard patterns are matched
//! against every repository the owner has.

use crate::pagination::fetch_all;
use gitmeter_client::GithubApi;
use gitmeter_common::config::Target;
use gitmeter_common::{Entity, GitmeterError, Result};
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Anchored, case-sensitive glob over full repository names
#[derive(Debug, Clone)]
pub struct Glob {
    regex: Regex,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self> {
        let mut source = String::with_capacity(pattern.len() + 8);
        source.push_str("(?s)^");
        for ch in pattern.chars() {
            match ch {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                literal => source.push_str(&regex::escape(literal.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| GitmeterError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    pub fn has_wildcard(pattern: &str) -> bool {
        pattern.contains(['*', '?'])
    }
}

/// A parsed `owner/name` repository pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPattern {
    pub raw: String,
    pub owner: String,
    pub name: String,
}

impl RepoPattern {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| GitmeterError::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = raw.split('/').collect();
        let [owner, name] = segments.as_slice() else {
            return Err(invalid("expected exactly owner/name"));
        };
        if owner.is_empty() || name.is_empty() {
            return Err(invalid("owner and name must not be empty"));
        }
        if Glob::has_wildcard(owner) {
            return Err(invalid("owner must not contain wildcards"));
        }

        Ok(Self {
            raw: raw.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn is_exact(&self) -> bool {
        !Glob::has_wildcard(&self.name)
    }
}

/// A pattern that could not be resolved
#[derive(Debug)]
pub struct ResolveFailure {
    pub pattern: String,
    pub error: GitmeterError,
}

/// Outcome of resolving the repository patterns
#[derive(Debug, Default)]
pub struct Resolution {
    pub entities: Vec<Entity>,
    pub failures: Vec<ResolveFailure>,
}

/// Resolves a [`Target`] against the upstream API
pub struct EntityResolver<'a> {
    api: &'a dyn GithubApi,
    target: &'a Target,
}

impl<'a> EntityResolver<'a> {
    pub fn new(api: &'a dyn GithubApi, target: &'a Target) -> Self {
        Self { api, target }
    }

    pub fn organizations(&self) -> Vec<Entity> {
        self.target
            .orgs
            .iter()
            .map(|name| Entity::Organization(name.clone()))
            .collect()
    }

    pub fn enterprises(&self) -> Vec<Entity> {
        self.target
            .enterprises
            .iter()
            .map(|name| Entity::Enterprise(name.clone()))
            .collect()
    }

    /// Resolve every repository pattern; failed patterns are skipped
    pub async fn repositories(&self) -> Resolution {
        let mut resolution = Resolution::default();
        let mut seen = HashSet::new();

        for raw in &self.target.repos {
            match self.resolve_pattern(raw).await {
                Ok(entities) => {
                    for entity in entities {
                        if seen.insert(entity.clone()) {
                            resolution.entities.push(entity);
                        }
                    }
                }
                Err(error) => resolution.failures.push(ResolveFailure {
                    pattern: raw.clone(),
                    error,
                }),
            }
        }

        resolution
    }

    async fn resolve_pattern(&self, raw: &str) -> Result<Vec<Entity>> {
        let pattern = RepoPattern::parse(raw)?;
        if pattern.is_exact() {
            return Ok(vec![Entity::Repository {
                owner: pattern.owner,
                name: pattern.name,
            }]);
        }

        let glob = Glob::new(&pattern.raw)?;
        let api = self.api;
        let owner = pattern.owner.as_str();
        let repos = fetch_all(
            self.target.per_page.repositories,
            self.target.timeout(),
            move |opts| api.list_repositories_by_owner(owner, opts),
        )
        .await?;

        let total = repos.len();
        let matched: Vec<Entity> = repos
            .into_iter()
            .filter(|repo| glob.is_match(&repo.full_name))
            .map(|repo| Entity::Repository {
                owner: if repo.owner.login.is_empty() {
                    pattern.owner.clone()
                } else {
                    repo.owner.login
                },
                name: repo.name,
            })
            .collect();

        debug!(pattern = raw, total, matched = matched.len(), "Resolved repository pattern");
        Ok(matched)
    }
}
