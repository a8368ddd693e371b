use anyhow::Context;
use tracing::info;

use crate::{
    dispatch::{DispatchError, Dispatcher, HandlerOutcome},
    webhooks::{
        github::{events::PayloadError, GitHubEventHeader, X_GITHUB_EVENT},
        WebhookEnvelope,
    },
};

/// Appends the delivery to the event store as-is. Redeliveries aren't deduplicated.
pub(super) async fn store(
    dispatcher: &Dispatcher,
    event: &GitHubEventHeader,
    envelope: &WebhookEnvelope,
) -> Result<HandlerOutcome, DispatchError> {
    let event_name = event
        .name()
        .ok_or(PayloadError::MissingHeader(X_GITHUB_EVENT))?;

    let id = dispatcher
        .clients
        .store
        .insert(event_name, envelope.serialized())
        .await
        .with_context(|| format!("couldn't store {} event", event_name))?;
    info!("stored {} event with id {}", event_name, id);

    Ok(HandlerOutcome::Success("event stored".to_owned()))
}
