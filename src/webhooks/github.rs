use anyhow::anyhow;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use tracing::{info, warn};

pub mod events;
pub(crate) mod signing;

pub use signing::GitHubSecret;

use crate::{
    dispatch::{DispatchError, Dispatcher, HandlerOutcome},
    webhooks::{RejectReason, WebhookEnvelope},
};

pub(crate) const X_GITHUB_EVENT: &str = "X-GitHub-Event";
const PING: &str = "ping";

/// Value of the `X-GitHub-Event` header, if the sender set one.
#[derive(Debug, Clone, Default)]
pub struct GitHubEventHeader(pub Option<String>);

impl GitHubEventHeader {
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_ping(&self) -> bool {
        self.name() == Some(PING)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GitHubEventHeader {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let event_types = request.headers().get(X_GITHUB_EVENT).collect::<Vec<_>>();

        match event_types.as_slice() {
            [] => Outcome::Success(GitHubEventHeader(None)),
            [event_type] => Outcome::Success(GitHubEventHeader(Some(event_type.to_string()))),
            _ => {
                let reason = format!("request needs at most one {} header", X_GITHUB_EVENT);
                request.local_cache(|| RejectReason(Some(reason.clone())));
                Outcome::Error((Status::BadRequest, anyhow!(reason)))
            }
        }
    }
}

/// What a delivery is about. Apart from pings, which every endpoint answers the same way, the
/// kind is given by the endpoint the delivery was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Ping,
    RepositoryCreated,
    MembershipChanged,
    Push,
    Generic,
}

impl EventKind {
    pub fn classify(header: &GitHubEventHeader, endpoint: EventKind) -> EventKind {
        if header.is_ping() {
            EventKind::Ping
        } else {
            endpoint
        }
    }
}

#[rocket::get("/")]
pub fn index() -> &'static str {
    "Hello World!"
}

#[rocket::post("/repo_created", data = "<envelope>")]
pub async fn repo_created(
    event: GitHubEventHeader,
    envelope: WebhookEnvelope,
    dispatcher: &State<Dispatcher>,
) -> Result<HandlerOutcome, DispatchError> {
    dispatcher
        .dispatch(EventKind::RepositoryCreated, &event, &envelope)
        .await
}

#[rocket::post("/api/github_org_member_hook", data = "<envelope>")]
pub async fn org_member_hook(
    event: GitHubEventHeader,
    envelope: WebhookEnvelope,
    dispatcher: &State<Dispatcher>,
) -> Result<HandlerOutcome, DispatchError> {
    dispatcher
        .dispatch(EventKind::MembershipChanged, &event, &envelope)
        .await
}

#[rocket::post("/store_events", data = "<envelope>")]
pub async fn store_events(
    event: GitHubEventHeader,
    envelope: WebhookEnvelope,
    dispatcher: &State<Dispatcher>,
) -> Result<HandlerOutcome, DispatchError> {
    dispatcher
        .dispatch(EventKind::Generic, &event, &envelope)
        .await
}

#[rocket::post("/search_secrets", data = "<envelope>")]
pub async fn search_secrets(
    event: GitHubEventHeader,
    envelope: WebhookEnvelope,
    dispatcher: &State<Dispatcher>,
) -> Result<HandlerOutcome, DispatchError> {
    dispatcher.dispatch(EventKind::Push, &event, &envelope).await
}

/// Logs whatever was sent and echoes it back, handy to inspect what a sender delivers.
#[rocket::post("/gitlab_event", data = "<envelope>")]
pub fn gitlab_event(event: GitHubEventHeader, envelope: WebhookEnvelope) -> String {
    info!("received {:?} delivery on the echo endpoint", event.name());
    let body = envelope.serialized();
    warn!("{}", body);

    body.to_owned()
}
