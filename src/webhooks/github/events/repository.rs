use serde::Deserialize;
use serde_json::Value;

use crate::webhooks::github::events::{parse, FromBody, GitHubUser, PayloadError, Repository};

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    action: String,
    repository: Repository,
    sender: GitHubUser,
}

/// A `repository` event, only acted upon when `action` is `created`.
#[derive(Debug)]
pub struct RepositoryCreatedEvent {
    pub action: String,
    pub repo_full_name: String,
    pub repo_short_name: String,
    pub sender_login: String,
}

impl RepositoryCreatedEvent {
    pub fn is_creation(&self) -> bool {
        self.action == "created"
    }
}

impl FromBody for RepositoryCreatedEvent {
    fn from_body(body: &Value) -> Result<Self, PayloadError> {
        let RepositoryPayload {
            action,
            repository,
            sender,
        } = parse("repository", body)?;

        Ok(Self {
            action,
            repo_short_name: repository.short_name().to_owned(),
            repo_full_name: repository.full_name,
            sender_login: sender.login,
        })
    }
}
