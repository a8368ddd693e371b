//! Thin clients for the services orghook drives: GitHub, Jenkins, Slack and the event store.
//!
//! Each service sits behind a trait so the dispatcher can be handed test doubles.

use thiserror::Error;

pub mod github;
pub mod jenkins;
pub mod message_builder;
pub mod slack;
pub mod sqlite;
mod types;

pub use github::GitHubClient;
pub use jenkins::{JenkinsClient, JobTemplate};
pub use message_builder::MessageBuilder;
pub use slack::SlackNotifier;
pub use sqlite::SqliteEventStore;
pub use types::*;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The resource changed since it was read, the write was refused.
    #[error("conflicting update: {0}")]
    Conflict(String),

    #[error("couldn't decode response: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[rocket::async_trait]
pub trait SourceControl: Send + Sync {
    async fn repository(&self, full_name: &str) -> Result<RepositoryInfo, ClientError>;

    async fn organization(&self, name: &str) -> Result<OrganizationInfo, ClientError>;

    async fn create_hook(&self, repo: &RepositoryInfo, hook: &HookSpec) -> Result<(), ClientError>;

    /// Fetches a file along with the blob sha guarding later writes to it.
    async fn file_contents(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<FileContents, ClientError>;

    /// Must fail with [`ClientError::Conflict`] when `update.sha` is stale.
    async fn update_file(&self, repo: &str, path: &str, update: &FileUpdate)
        -> Result<(), ClientError>;

    async fn compare(
        &self,
        repo: &RepositoryInfo,
        base: &str,
        head: &str,
    ) -> Result<Vec<ChangedFile>, ClientError>;

    async fn create_issue(
        &self,
        repo: &RepositoryInfo,
        issue: &NewIssue,
    ) -> Result<IssueInfo, ClientError>;
}

#[rocket::async_trait]
pub trait CiServer: Send + Sync {
    async fn create_job(&self, name: &str, definition: &str) -> Result<(), ClientError>;
}

#[rocket::async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), ClientError>;
}

#[rocket::async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a record and returns the id the store assigned to it.
    async fn insert(&self, event_name: &str, event_content: &str) -> Result<i64, ClientError>;
}
