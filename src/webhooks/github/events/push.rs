use serde::Deserialize;
use serde_json::Value;

use crate::webhooks::github::events::{parse, FromBody, PayloadError, Repository};

#[derive(Debug, Deserialize)]
struct PushPayload {
    repository: Repository,
    before: String,
    after: String,
    head_commit: HeadCommit,
}

#[derive(Debug, Deserialize)]
struct HeadCommit {
    author: CommitAuthor,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    username: String,
}

/// The range of commits a push covered, and who authored its head.
#[derive(Debug)]
pub struct PushComparisonEvent {
    pub repo_full_name: String,
    pub before_sha: String,
    pub after_sha: String,
    pub author_login: String,
}

impl FromBody for PushComparisonEvent {
    fn from_body(body: &Value) -> Result<Self, PayloadError> {
        let payload: PushPayload = parse("push", body)?;

        Ok(Self {
            repo_full_name: payload.repository.full_name,
            before_sha: payload.before,
            after_sha: payload.after,
            author_login: payload.head_commit.author.username,
        })
    }
}
