use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use http::{HeaderMap, StatusCode};
use ring::signature::{ED25519, UnparsedPublicKey};
use serde::Deserialize;
use serde_json::{Value, json};

use super::commands::{Acknowledgement, BotCommand, PROCESSING, Reply, execute};
use super::discord::{DiscordClient, fit_content};
use crate::config::ConfigError;
use crate::service::controller::Controller;

const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;

const PONG: u8 = 1;
const CHANNEL_MESSAGE: u8 = 4;
const DEFERRED_CHANNEL_MESSAGE: u8 = 5;

/// Checks the Ed25519 signature Discord puts on every interaction request.
pub struct SignatureVerifier {
    public_key: Vec<u8>,
}

impl SignatureVerifier {
    pub fn from_hex(public_key: &str) -> Result<Self, ConfigError> {
        let public_key = hex::decode(public_key.trim()).map_err(|e| ConfigError::Invalid {
            name: "DISCORD_PUBLIC_KEY",
            reason: e.to_string(),
        })?;
        if public_key.len() != 32 {
            return Err(ConfigError::Invalid {
                name: "DISCORD_PUBLIC_KEY",
                reason: format!("expected 32 bytes, got {}", public_key.len()),
            });
        }
        Ok(Self { public_key })
    }

    pub fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> bool {
        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };
        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        UnparsedPublicKey::new(&ED25519, &self.public_key)
            .verify(&message, &signature)
            .is_ok()
    }
}

#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub token: String,
    pub data: Option<InteractionData>,
    /// Present for interactions sent from a guild.
    pub member: Option<Member>,
    /// Present for interactions sent from a DM.
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub value: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
}

impl Interaction {
    pub fn invoking_user(&self) -> Option<&str> {
        self.member
            .as_ref()
            .and_then(|member| member.user.as_ref())
            .or(self.user.as_ref())
            .map(|user| user.id.as_str())
    }

    pub fn command(&self) -> Option<BotCommand> {
        let data = self.data.as_ref()?;
        let argument = data
            .options
            .iter()
            .find(|option| option.name == "command")
            .and_then(|option| option.value.as_ref())
            .and_then(|value| value.as_str())
            .map(str::to_string);
        BotCommand::parse(&data.name, argument)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Plan {
    Pong,
    Command(BotCommand),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Somebody other than the operator; ignored without a reply.
    NotOperator,
    Unsupported,
}

/// Decides what to do with a verified interaction.
pub fn plan(operator_id: &str, interaction: &Interaction) -> Result<Plan, Rejection> {
    match interaction.kind {
        PING => Ok(Plan::Pong),
        APPLICATION_COMMAND => {
            if interaction.invoking_user() != Some(operator_id) {
                return Err(Rejection::NotOperator);
            }
            interaction
                .command()
                .map(Plan::Command)
                .ok_or(Rejection::Unsupported)
        }
        _ => Err(Rejection::Unsupported),
    }
}

/// State shared across axum handlers.
pub struct AppState {
    pub controller: Arc<Controller>,
    pub discord: Arc<DiscordClient>,
    pub verifier: SignatureVerifier,
    pub application_id: String,
    pub operator_id: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/interactions", post(handle_interaction))
        .with_state(state)
}

/// Serves the interactions endpoint until the listener fails.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    log::info!("Starting interactions endpoint on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]);
    log::info!("Bot is ready");
    axum::serve(listener, router(state))
        .await
        .map_err(|e| e.into())
}

fn message_response(reply: Reply) -> Response {
    let data = match reply {
        Reply::Text(text) => json!({ "content": fit_content(&text) }),
        Reply::Status(embed) => json!({ "embeds": [embed] }),
    };
    Json(json!({ "type": CHANNEL_MESSAGE, "data": data })).into_response()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

async fn handle_interaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let verified = match (
        header(&headers, SIGNATURE_HEADER),
        header(&headers, TIMESTAMP_HEADER),
    ) {
        (Some(signature), Some(timestamp)) => state.verifier.verify(timestamp, &body, signature),
        _ => false,
    };
    if !verified {
        log::warn!("Rejected interaction with an invalid signature");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(e) => {
            log::error!("Unable to parse interaction: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let command = match plan(&state.operator_id, &interaction) {
        Ok(Plan::Pong) => return Json(json!({ "type": PONG })).into_response(),
        Ok(Plan::Command(command)) => command,
        Err(Rejection::NotOperator) => {
            log::warn!(
                "Ignoring interaction from unauthorized user {:?}",
                interaction.invoking_user()
            );
            return StatusCode::FORBIDDEN.into_response();
        }
        Err(Rejection::Unsupported) => {
            log::warn!("Ignoring unsupported interaction of type {}", interaction.kind);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    log::info!("Received command {command:?}");

    match command.acknowledgement() {
        Acknowledgement::Inline => message_response(execute(&state.controller, &command).await),
        ack => {
            spawn_followup(Arc::clone(&state), interaction.token, command);
            match ack {
                Acknowledgement::Progress => message_response(Reply::Text(PROCESSING.to_string())),
                _ => Json(json!({ "type": DEFERRED_CHANNEL_MESSAGE })).into_response(),
            }
        }
    }
}

/// Runs the command after the interaction was acknowledged and edits the
/// result into the original response.
fn spawn_followup(state: Arc<AppState>, token: String, command: BotCommand) {
    tokio::spawn(async move {
        let reply = execute(&state.controller, &command).await.into_text();
        if let Err(e) = state
            .discord
            .edit_original(&state.application_id, &token, &reply)
            .await
        {
            log::error!("Failed to send reply for {command:?}: {e}");
        }
    });
}
