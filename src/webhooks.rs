use rocket::{
    catchers,
    http::Status,
    response::{self, Responder},
    routes, Build, Request, Rocket,
};
use tracing::{debug, error};

mod envelope;
pub use envelope::WebhookEnvelope;

pub mod github;
pub use github::GitHubSecret;

use crate::dispatch::{DispatchError, Dispatcher, HandlerOutcome};

const IGNORED: &str = "event ignored";

/// Why a request guard turned a request down, picked up by the 400 catcher.
pub(crate) struct RejectReason(pub Option<String>);

/// Mounts every endpoint on a new Rocket instance that owns the dispatcher.
pub fn build(dispatcher: Dispatcher, secret: GitHubSecret) -> Rocket<Build> {
    rocket::build()
        .mount(
            "/",
            routes![
                github::index,
                github::repo_created,
                github::org_member_hook,
                github::store_events,
                github::search_secrets,
                github::gitlab_event,
            ],
        )
        .register("/", catchers![bad_request, payload_too_large, internal_error])
        .manage(dispatcher)
        .manage(secret)
}

impl<'r> Responder<'r, 'static> for HandlerOutcome {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let (status, body) = match self {
            HandlerOutcome::Ignored => (Status::Ok, IGNORED.to_owned()),
            HandlerOutcome::Success(message) => (Status::Ok, message),
            HandlerOutcome::Conflict(detail) => (Status::Conflict, detail),
            HandlerOutcome::Failure(detail) => (Status::InternalServerError, detail),
        };

        (status, body).respond_to(request)
    }
}

impl<'r> Responder<'r, 'static> for DispatchError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        match self {
            DispatchError::Payload(e) => {
                debug!("rejected payload on {}: {}", request.uri(), e);
                (Status::BadRequest, e.to_string()).respond_to(request)
            }
            DispatchError::Internal(e) => {
                error!("error while handling {}: {:#}", request.uri(), e);
                Err(Status::InternalServerError)
            }
        }
    }
}

#[rocket::catch(400)]
fn bad_request(request: &Request<'_>) -> String {
    request
        .local_cache(|| RejectReason(None))
        .0
        .clone()
        .unwrap_or_else(|| "malformed request".to_owned())
}

#[rocket::catch(413)]
fn payload_too_large() -> &'static str {
    "payload too large"
}

#[rocket::catch(500)]
fn internal_error() -> &'static str {
    ""
}
