use std::fmt::Write;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::{
    clients::{HookSpec, MessageBuilder, OrganizationInfo, RepositoryInfo},
    dispatch::{DispatchError, Dispatcher, HandlerOutcome},
    webhooks::github::events::RepositoryCreatedEvent,
};

/// Wires a freshly created repository: push hook, CI job, then an optional chat announcement.
///
/// Only a failing hook registration is tolerated, every other failure aborts the request.
pub(super) async fn provision(
    dispatcher: &Dispatcher,
    event: RepositoryCreatedEvent,
) -> Result<HandlerOutcome, DispatchError> {
    if !event.is_creation() {
        return Ok(HandlerOutcome::Ignored);
    }

    let clients = &dispatcher.clients;
    let github = &dispatcher.config.github;
    info!(
        "provisioning {} created by {}",
        event.repo_full_name, event.sender_login
    );

    let repo = clients
        .source_control
        .repository(&event.repo_full_name)
        .await
        .with_context(|| format!("couldn't fetch repository {}", event.repo_full_name))?;
    let organization = clients
        .source_control
        .organization(&github.organization)
        .await
        .with_context(|| format!("couldn't fetch organization {}", github.organization))?;

    let hook = HookSpec::push(github.push_callback_url.clone());
    if let Err(e) = clients.source_control.create_hook(&repo, &hook).await {
        warn!("couldn't register push hook on {}: {}", repo.full_name, e);
    }

    let definition = dispatcher.job_template.render(&event.repo_short_name);
    clients
        .ci
        .create_job(&event.repo_short_name, &definition)
        .await
        .with_context(|| format!("couldn't create CI job {}", event.repo_short_name))?;

    match &clients.chat {
        Some(chat) => {
            let text = announcement(&event, &repo, &organization);
            chat.notify(&text)
                .await
                .context("couldn't send chat notification")?;
        }
        None => debug!("chat notifications disabled, not announcing {}", event.repo_short_name),
    }

    Ok(HandlerOutcome::Success(format!(
        "job {} created",
        event.repo_short_name
    )))
}

fn announcement(
    event: &RepositoryCreatedEvent,
    repo: &RepositoryInfo,
    organization: &OrganizationInfo,
) -> String {
    let mut message = MessageBuilder::new();

    message.tag(&organization.login);
    write!(message, " new repository ").unwrap();
    message.link(&event.repo_short_name, &repo.html_url);
    write!(
        message,
        " created by {}, {} now has {} public repositories",
        event.sender_login, organization.login, organization.public_repos
    )
    .unwrap();

    message.build()
}
