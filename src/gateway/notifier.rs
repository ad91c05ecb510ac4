use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::discord::{DiscordClient, TransportError};
use super::embed::{Embed, status_embed};
use crate::service::controller::Controller;
use crate::service::schedule::Ticker;

#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn send_status(&self, embed: &Embed) -> Result<(), TransportError>;
}

/// The operator's private channel.
pub struct DirectMessage {
    pub discord: Arc<DiscordClient>,
    pub channel_id: String,
}

#[async_trait]
impl StatusSink for DirectMessage {
    async fn send_status(&self, embed: &Embed) -> Result<(), TransportError> {
        self.discord.send_embed(&self.channel_id, embed).await
    }
}

pub struct StatusNotifier {
    controller: Arc<Controller>,
    sink: Arc<dyn StatusSink>,
    enabled: bool,
}

impl StatusNotifier {
    pub fn new(controller: Arc<Controller>, sink: Arc<dyn StatusSink>, enabled: bool) -> Self {
        Self {
            controller,
            sink,
            enabled,
        }
    }

    /// Pushes a status card if the worker states changed since the last
    /// call. Returns whether a card was sent.
    pub async fn notify_once(&self) -> bool {
        if !self.enabled {
            return false;
        }

        let status = self.controller.status();
        let delta = match status.compare_to_previous().await {
            Ok(delta) => delta,
            Err(e) => {
                log::error!("Unable to compare container statuses: {e}");
                return false;
            }
        };
        if !delta.changed {
            return false;
        }
        for change in &delta.changed_entries {
            log::info!(
                "{} changed from {} to {}",
                change.image_family,
                change.old_state,
                change.new_state
            );
        }

        let snapshot = match status.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("Unable to build status message: {e}");
                return false;
            }
        };
        let embed = status_embed(&snapshot, self.controller.auto_restart(), Utc::now());

        match self.sink.send_status(&embed).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to send status message: {e}");
                false
            }
        }
    }

    pub async fn run(self, ticker: Ticker) {
        log::info!(
            "Starting status notifier (status messages {})",
            if self.enabled { "enabled" } else { "disabled" }
        );
        while ticker.tick().await {
            self.notify_once().await;
        }
        log::warn!("Status schedule has no upcoming ticks, stopping notifier");
    }
}
