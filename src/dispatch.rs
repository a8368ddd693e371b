//! Routes a classified delivery to the handler that acts on it.
//!
//! Handlers are short sequences of calls to the external clients owned by the [`Dispatcher`].
//! They report through [`HandlerOutcome`]; errors they don't recover from bubble up as
//! [`DispatchError::Internal`].

use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info};

mod archive;
mod membership;
mod provision;
mod secrets;

#[cfg(test)]
pub(crate) mod testing;

pub use secrets::{SecretDetector, SecretMatcher};

use crate::{
    clients::{
        ChatNotifier, CiServer, EventStore, GitHubClient, JenkinsClient, JobTemplate,
        SlackNotifier, SourceControl, SqliteEventStore,
    },
    config::OrghookConfig,
    webhooks::{
        github::{
            events::{
                EventAction, FromBody, MembershipEvent, PayloadError, PingEvent,
                PushComparisonEvent, RepositoryCreatedEvent,
            },
            EventKind, GitHubEventHeader,
        },
        WebhookEnvelope,
    },
};

/// What a handler did with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Nothing to do for this delivery
    Ignored,
    Success(String),
    /// A concurrent writer won, nothing was overwritten
    Conflict(String),
    Failure(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Every client a handler may call.
pub struct Clients {
    pub source_control: Arc<dyn SourceControl>,
    pub ci: Arc<dyn CiServer>,
    /// `None` when no chat token is configured
    pub chat: Option<Arc<dyn ChatNotifier>>,
    pub store: Arc<dyn EventStore>,
    pub matcher: Arc<dyn SecretMatcher>,
}

pub struct Dispatcher {
    config: OrghookConfig,
    job_template: JobTemplate,
    clients: Clients,
}

impl Dispatcher {
    pub fn new(config: OrghookConfig, job_template: JobTemplate, clients: Clients) -> Self {
        Self {
            config,
            job_template,
            clients,
        }
    }

    /// Builds the real clients described by `config`.
    pub fn from_config(config: OrghookConfig) -> anyhow::Result<Self> {
        let source_control =
            GitHubClient::new(config.github.api_url.clone(), config.github.token.clone())
                .context("couldn't build GitHub client")?;
        let ci = JenkinsClient::new(
            config.ci.base_url.clone(),
            config.ci.username.clone(),
            config.ci.api_token.clone(),
        )
        .context("couldn't build Jenkins client")?;

        let chat = match &config.chat.token {
            Some(token) => {
                let notifier = SlackNotifier::new(
                    &config.chat.api_url,
                    token.clone(),
                    config.chat.channel.clone(),
                )
                .context("couldn't build Slack client")?;
                Some(Arc::new(notifier) as Arc<dyn ChatNotifier>)
            }
            None => {
                info!("no chat token configured, notifications are disabled");
                None
            }
        };

        let store =
            SqliteEventStore::open(&config.database.path).context("couldn't open event store")?;
        let job_template =
            JobTemplate::load(config.ci.job_template.as_deref(), &config.github.organization)?;
        let matcher = SecretDetector::from_config(&config.secret_scan);

        let clients = Clients {
            source_control: Arc::new(source_control),
            ci: Arc::new(ci),
            chat,
            store: Arc::new(store),
            matcher: Arc::new(matcher),
        };

        Ok(Self::new(config, job_template, clients))
    }

    pub async fn dispatch(
        &self,
        endpoint: EventKind,
        event: &GitHubEventHeader,
        envelope: &WebhookEnvelope,
    ) -> Result<HandlerOutcome, DispatchError> {
        let kind = EventKind::classify(event, endpoint);
        debug!("dispatching {:?} delivery ({:?})", kind, event.name());

        match kind {
            EventKind::Ping => {
                let ping = PingEvent::from_body(&envelope.body)?;
                Ok(HandlerOutcome::Success(ping.zen))
            }
            EventKind::RepositoryCreated => self.repository_event(envelope).await,
            EventKind::MembershipChanged => self.membership_event(envelope).await,
            EventKind::Push => {
                let push = PushComparisonEvent::from_body(&envelope.body)?;
                secrets::scan(self, push).await
            }
            EventKind::Generic => archive::store(self, event, envelope).await,
        }
    }

    /// The repository endpoint also accepts membership changes, for organizations that send
    /// every event to a single hook.
    async fn repository_event(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<HandlerOutcome, DispatchError> {
        let EventAction { action } = EventAction::from_body(&envelope.body)?;

        match action.as_deref() {
            Some("created") => {
                let event = RepositoryCreatedEvent::from_body(&envelope.body)?;
                provision::provision(self, event).await
            }
            Some("member_added") | Some("member_removed") => {
                self.membership_event(envelope).await
            }
            other => {
                debug!("ignoring repository event with action {:?}", other);
                Ok(HandlerOutcome::Ignored)
            }
        }
    }

    async fn membership_event(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<HandlerOutcome, DispatchError> {
        match MembershipEvent::from_body(&envelope.body)? {
            Some(event) => Ok(membership::sync(self, event).await),
            None => {
                debug!("organization event isn't a membership change, ignoring");
                Ok(HandlerOutcome::Ignored)
            }
        }
    }
}
