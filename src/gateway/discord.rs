//! Minimal Discord REST client.
//!
//! Only the handful of endpoints the bot needs: resolving its own
//! application, registering slash commands, opening the operator's DM
//! channel, posting status cards and editing interaction responses.

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use super::embed::Embed;

pub const API_BASE: &str = "https://discord.com/api/v10";

/// Discord rejects message content above this many characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Discord answered {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Deserialize)]
struct Application {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
}

pub struct DiscordClient {
    http: reqwest::Client,
    token: String,
    base: String,
}

impl DiscordClient {
    pub fn new(token: &str) -> Self {
        Self::with_base(token, API_BASE)
    }

    pub fn with_base(token: &str, base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.to_string(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response, TransportError> {
        let url = format!("{}{path}", self.base);
        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }
        Ok(response)
    }

    /// Id of the application the bot token belongs to.
    pub async fn current_application(&self) -> Result<String, TransportError> {
        let app: Application = self
            .request(Method::GET, "/applications/@me", None)
            .await?
            .json()
            .await?;
        Ok(app.id)
    }

    /// Replaces the global slash commands of the application.
    pub async fn register_commands(
        &self,
        application_id: &str,
        definitions: Vec<Value>,
    ) -> Result<(), TransportError> {
        self.request(
            Method::PUT,
            &format!("/applications/{application_id}/commands"),
            Some(Value::Array(definitions)),
        )
        .await?;
        Ok(())
    }

    /// Opens (or reuses) the DM channel with a user and returns its id.
    pub async fn open_dm(&self, user_id: &str) -> Result<String, TransportError> {
        let channel: Channel = self
            .request(
                Method::POST,
                "/users/@me/channels",
                Some(json!({ "recipient_id": user_id })),
            )
            .await?
            .json()
            .await?;
        Ok(channel.id)
    }

    pub async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<(), TransportError> {
        self.request(
            Method::POST,
            &format!("/channels/{channel_id}/messages"),
            Some(json!({ "embeds": [embed] })),
        )
        .await?;
        Ok(())
    }

    /// Replaces the content of the original response to an interaction.
    pub async fn edit_original(
        &self,
        application_id: &str,
        interaction_token: &str,
        content: &str,
    ) -> Result<(), TransportError> {
        self.request(
            Method::PATCH,
            &format!("/webhooks/{application_id}/{interaction_token}/messages/@original"),
            Some(json!({ "content": fit_content(content) })),
        )
        .await?;
        Ok(())
    }
}

/// Makes `content` acceptable as a message body: never empty and at most
/// `MAX_CONTENT_CHARS` characters.
pub fn fit_content(content: &str) -> String {
    if content.trim().is_empty() {
        return "✅ Command finished without output".to_string();
    }
    if content.chars().count() <= MAX_CONTENT_CHARS {
        return content.to_string();
    }

    let marker = "\n…";
    let keep = MAX_CONTENT_CHARS - marker.chars().count();
    let mut fitted: String = content.chars().take(keep).collect();
    fitted.push_str(marker);
    fitted
}
