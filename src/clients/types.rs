use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
    pub html_url: Url,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationInfo {
    pub login: String,
    #[serde(default)]
    pub public_repos: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookSpec {
    pub name: &'static str,
    pub active: bool,
    pub events: Vec<String>,
    pub config: HookConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookConfig {
    pub url: Url,
    pub content_type: &'static str,
}

impl HookSpec {
    /// An active JSON hook that only receives `push` events.
    pub fn push(url: Url) -> Self {
        Self {
            name: "web",
            active: true,
            events: vec!["push".to_owned()],
            config: HookConfig {
                url,
                content_type: "json",
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileContents {
    pub content: String,
    pub sha: String,
}

#[derive(Debug, Clone)]
pub struct FileUpdate {
    pub message: String,
    pub content: String,
    pub sha: String,
    pub branch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    /// Missing for binary files and very large diffs
    pub patch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueInfo {
    pub number: u64,
    pub html_url: Url,
}
