//! Typed views over webhook bodies.
//!
//! Each endpoint only needs a handful of fields out of GitHub's payloads. The views below
//! declare exactly those, and [`FromBody::from_body`] refuses a body that lacks any of them
//! before a handler gets to run.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;

mod membership;
mod ping;
mod push;
mod repository;

pub use membership::*;
pub use ping::*;
pub use push::*;
pub use repository::*;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed {event} payload: {source}")]
    Invalid {
        event: &'static str,
        source: serde_json::Error,
    },

    #[error("missing {0} header")]
    MissingHeader(&'static str),
}

pub trait FromBody: Sized {
    fn from_body(body: &Value) -> Result<Self, PayloadError>;
}

pub(crate) fn parse<T: DeserializeOwned>(
    event: &'static str,
    body: &Value,
) -> Result<T, PayloadError> {
    T::deserialize(body).map_err(|source| PayloadError::Invalid { event, source })
}

#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

impl Repository {
    /// The part after the owner, `widgets` for `acme/widgets`.
    pub fn short_name(&self) -> &str {
        self.full_name
            .rsplit_once('/')
            .map_or(self.full_name.as_str(), |(_, name)| name)
    }
}

/// Only the `action` key, used to pick a handler before validating the rest of the body.
#[derive(Debug, Deserialize)]
pub struct EventAction {
    pub action: Option<String>,
}

impl FromBody for EventAction {
    fn from_body(body: &Value) -> Result<Self, PayloadError> {
        parse("event", body)
    }
}
