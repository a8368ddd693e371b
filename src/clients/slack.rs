use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::clients::{ChatNotifier, ClientError};

const SERVICE: &str = "slack";

/// Posts messages to a single Slack channel through `chat.postMessage`.
pub struct SlackNotifier {
    http: reqwest::Client,
    post_message_url: Url,
    token: String,
    channel: String,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(api_url: &Url, token: String, channel: String) -> Result<Self, ClientError> {
        let post_message_url = api_url
            .join("chat.postMessage")
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        Ok(Self {
            http: reqwest::Client::builder().build()?,
            post_message_url,
            token,
            channel,
        })
    }
}

#[rocket::async_trait]
impl ChatNotifier for SlackNotifier {
    async fn notify(&self, text: &str) -> Result<(), ClientError> {
        trace!("sending `{}` to #{}", text, self.channel);

        let response = self
            .http
            .post(self.post_message_url.clone())
            .bearer_auth(&self.token)
            .json(&PostMessage {
                channel: &self.channel,
                text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        // Slack reports most failures with a 200 and `ok: false`
        let body: SlackResponse = response.json().await?;
        if !body.ok {
            return Err(ClientError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message: body.error.unwrap_or_else(|| "unknown error".to_owned()),
            });
        }

        debug!("notified #{}", self.channel);
        Ok(())
    }
}
