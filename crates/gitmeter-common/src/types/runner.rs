//! Runner and repository wire types

use super::usage::nullable;
use serde::{Deserialize, Serialize};

/// Self-hosted runner descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Runner {
    #[serde(deserialize_with = "nullable")]
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub os: String,
    /// `online` or `offline`
    #[serde(deserialize_with = "nullable")]
    pub status: String,
    #[serde(deserialize_with = "nullable")]
    pub busy: bool,
    #[serde(deserialize_with = "nullable")]
    pub labels: Vec<RunnerLabel>,
}

impl Runner {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerLabel {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
}

/// Body of the runner listing endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerList {
    pub total_count: u64,
    #[serde(deserialize_with = "nullable")]
    pub runners: Vec<Runner>,
}

/// Repository as returned by the repository listing endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub full_name: String,
    pub owner: RepositoryOwner,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryOwner {
    #[serde(deserialize_with = "nullable")]
    pub login: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_runner_list() {
        let body = r#"{
            "total_count": 2,
            "runners": [
                {"id": 23, "name": "mac-1", "os": "macos", "status": "online", "busy": true,
                 "labels": [{"id": 5, "name": "self-hosted", "type": "read-only"}]},
                {"id": 24, "name": "linux-1", "os": "linux", "status": "offline", "busy": false}
            ]
        }"#;

        let list: RunnerList = serde_json::from_str(body).unwrap();
        assert_eq!(list.total_count, 2);
        assert!(list.runners[0].is_online());
        assert!(list.runners[0].busy);
        assert_eq!(list.runners[0].labels[0].name, "self-hosted");
        assert!(!list.runners[1].is_online());
        assert!(list.runners[1].labels.is_empty());
    }

    #[test]
    fn test_decode_runner_with_null_fields() {
        let body = r#"{
            "total_count": 2,
            "runners": [
                {"id": null, "name": null, "os": "linux", "status": "online", "busy": null},
                {"id": 31, "name": "linux-2", "os": "linux", "status": "offline", "busy": false}
            ]
        }"#;

        let list: RunnerList = serde_json::from_str(body).unwrap();
        assert_eq!(list.runners.len(), 2);
        assert_eq!(list.runners[0].id, 0);
        assert_eq!(list.runners[0].name, "");
        assert!(!list.runners[0].busy);
        assert_eq!(list.runners[1].id, 31);
    }

    #[test]
    fn test_decode_repository() {
        let body = r#"{"name": "widgets", "full_name": "acme/widgets", "owner": {"login": "acme"}}"#;
        let repo: Repository = serde_json::from_str(body).unwrap();
        assert_eq!(repo.full_name, "acme/widgets");
        assert_eq!(repo.owner.login, "acme");
    }
}
