use anyhow::anyhow;
use rocket::{
    data::{ByteUnit, FromData, Outcome},
    http::Status,
    Data, Request,
};
use serde_json::{Map, Value};
use tracing::trace;
use url::form_urlencoded;

use crate::webhooks::{
    github::signing::{validate_signature, GitHubSecret, X_GITHUB_SIGNATURE},
    RejectReason,
};

/// Applies to JSON and form deliveries alike, GitHub's form mode carries the full JSON document.
const LIMIT: ByteUnit = ByteUnit::Mebibyte(1);

/// GitHub's form-encoded deliveries carry the whole JSON document in this field.
const FORM_PAYLOAD_FIELD: &str = "payload";

/// A parsed webhook body, whatever encoding it was delivered with.
#[derive(Debug)]
pub struct WebhookEnvelope {
    pub body: Value,
    text: String,
}

impl WebhookEnvelope {
    /// A JSON delivery, kept verbatim.
    pub fn json(content: String) -> Result<Self, serde_json::Error> {
        let body = serde_json::from_str(&content)?;

        Ok(Self {
            body,
            text: content,
        })
    }

    /// A form-encoded delivery. The `payload` field is kept verbatim when present, other forms
    /// are serialized from their nested representation.
    pub fn form(content: &str) -> Result<Self, serde_json::Error> {
        match parse_form(content) {
            FormBody::Payload(text) => Self::json(text),
            FormBody::Fields(body) => Ok(Self {
                text: body.to_string(),
                body,
            }),
        }
    }

    /// The body as text, the way it gets archived.
    pub fn serialized(&self) -> &str {
        &self.text
    }
}

enum FormBody {
    Payload(String),
    Fields(Value),
}

/// Dotted keys (`repository.full_name`) become nested objects so handlers see the same shape
/// as a JSON delivery.
fn parse_form(content: &str) -> FormBody {
    let pairs = form_urlencoded::parse(content.as_bytes()).into_owned();

    let mut root = Map::new();
    for (key, value) in pairs {
        if key == FORM_PAYLOAD_FIELD {
            return FormBody::Payload(value);
        }
        insert_dotted(&mut root, &key, Value::String(value));
    }

    FormBody::Fields(Value::Object(root))
}

fn insert_dotted(root: &mut Map<String, Value>, key: &str, value: Value) {
    let mut segments = key.split('.').peekable();
    let mut current = root;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_owned(), value);
            return;
        }

        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
}

fn reject<'r>(
    request: &'r Request<'_>,
    status: Status,
    reason: String,
) -> Outcome<'r, WebhookEnvelope> {
    trace!("rejecting payload: {}", reason);
    request.local_cache(|| RejectReason(Some(reason.clone())));

    Outcome::Error((status, anyhow!(reason)))
}

#[rocket::async_trait]
impl<'r> FromData<'r> for WebhookEnvelope {
    type Error = anyhow::Error;

    async fn from_data(request: &'r Request<'_>, data: Data<'r>) -> Outcome<'r, Self> {
        trace!("received payload on webhook endpoint: {:?}", request);

        let is_form = request.content_type().map_or(false, |ct| ct.is_form());

        let size_limit = request.limits().get("json").unwrap_or(LIMIT);
        let content = match data.open(size_limit).into_string().await {
            Ok(s) if s.is_complete() => s.into_inner(),
            Ok(_) => {
                trace!("payload was too big");
                return Outcome::Error((
                    Status::PayloadTooLarge,
                    anyhow!("data limit exceeded"),
                ));
            }
            Err(e) => {
                return reject(request, Status::BadRequest, format!("couldn't read body: {}", e))
            }
        };

        if content.trim().is_empty() {
            return reject(request, Status::BadRequest, "request has no body".to_owned());
        }

        let secret = request
            .rocket()
            .state::<GitHubSecret>()
            .and_then(|secret| secret.0.as_deref());
        if let Some(secret) = secret {
            let signatures = request
                .headers()
                .get(X_GITHUB_SIGNATURE)
                .collect::<Vec<_>>();
            if signatures.len() != 1 {
                return reject(
                    request,
                    Status::BadRequest,
                    format!("request needs exactly one {} header", X_GITHUB_SIGNATURE),
                );
            }

            if !validate_signature(secret, signatures[0], &content) {
                return reject(
                    request,
                    Status::BadRequest,
                    "couldn't verify signature".to_owned(),
                );
            }
        }

        let envelope = if is_form {
            WebhookEnvelope::form(&content)
        } else {
            WebhookEnvelope::json(content)
        };

        match envelope {
            Ok(envelope) => {
                trace!("parsed webhook payload");
                Outcome::Success(envelope)
            }
            Err(e) => reject(request, Status::BadRequest, format!("couldn't parse body: {}", e)),
        }
    }
}
