use std::fmt::Write;

use anyhow::Context;
use regex::Regex;
use tracing::{debug, info};

use crate::{
    clients::{ChangedFile, NewIssue},
    config::SecretScanConfig,
    dispatch::{DispatchError, Dispatcher, HandlerOutcome},
    webhooks::github::events::PushComparisonEvent,
};

/// Decides whether a patch leaks a secret.
pub trait SecretMatcher: Send + Sync {
    fn matches(&self, patch: &str) -> bool;
}

/// Flags patches containing a fixed marker or matching any of the configured patterns.
#[derive(Debug, Clone)]
pub struct SecretDetector {
    marker: String,
    patterns: Vec<Regex>,
}

impl SecretDetector {
    pub fn new(marker: impl Into<String>, patterns: Vec<Regex>) -> Self {
        Self {
            marker: marker.into(),
            patterns,
        }
    }

    pub fn from_config(config: &SecretScanConfig) -> Self {
        Self::new(config.marker.clone(), config.patterns.clone())
    }
}

impl SecretMatcher for SecretDetector {
    fn matches(&self, patch: &str) -> bool {
        patch.contains(&self.marker) || self.patterns.iter().any(|re| re.is_match(patch))
    }
}

/// Looks for leaked secrets in the files a push changed, and opens an issue for the author.
///
/// Scanning stops at the first flagged file, a push gets at most one issue.
pub(super) async fn scan(
    dispatcher: &Dispatcher,
    event: PushComparisonEvent,
) -> Result<HandlerOutcome, DispatchError> {
    let clients = &dispatcher.clients;

    let repo = clients
        .source_control
        .repository(&event.repo_full_name)
        .await
        .with_context(|| format!("couldn't fetch repository {}", event.repo_full_name))?;
    let files = clients
        .source_control
        .compare(&repo, &event.before_sha, &event.after_sha)
        .await
        .with_context(|| {
            format!(
                "couldn't compare {}...{} on {}",
                event.before_sha, event.after_sha, repo.full_name
            )
        })?;
    debug!(
        "scanning {} changed files on {}",
        files.len(),
        repo.full_name
    );

    for file in &files {
        let patch = match &file.patch {
            Some(patch) => patch,
            None => continue,
        };
        if !clients.matcher.matches(patch) {
            continue;
        }

        let issue = leak_issue(dispatcher, &event, file);
        let created = clients
            .source_control
            .create_issue(&repo, &issue)
            .await
            .with_context(|| format!("couldn't open issue on {}", repo.full_name))?;
        info!(
            "possible secret in {} on {}, opened issue #{} ({})",
            file.filename, repo.full_name, created.number, created.html_url
        );

        return Ok(HandlerOutcome::Success("issue created".to_owned()));
    }

    Ok(HandlerOutcome::Success("no issue found".to_owned()))
}

fn leak_issue(
    dispatcher: &Dispatcher,
    event: &PushComparisonEvent,
    file: &ChangedFile,
) -> NewIssue {
    let scan_config = &dispatcher.config.secret_scan;

    let mut body = String::new();
    writeln!(
        body,
        "A secret may have been pushed in `{}` between {} and {}.",
        file.filename, event.before_sha, event.after_sha
    )
    .unwrap();
    writeln!(
        body,
        "\n@{} please revoke it and remove it from the history.",
        event.author_login
    )
    .unwrap();

    NewIssue {
        title: scan_config.issue_title.clone(),
        body,
        assignees: vec![event.author_login.clone()],
        labels: vec![scan_config.label.clone()],
    }
}
