use serde::Deserialize;
use serde_json::Value;

use crate::webhooks::github::events::{parse, FromBody, PayloadError};

#[derive(Debug, Deserialize)]
pub struct PingEvent {
    pub zen: String,
}

impl FromBody for PingEvent {
    fn from_body(body: &Value) -> Result<Self, PayloadError> {
        parse("ping", body)
    }
}
