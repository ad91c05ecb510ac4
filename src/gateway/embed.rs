use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::service::status::StatusEntry;

const STATUS_COLOR: u32 = 0x0099ff;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub timestamp: String,
    pub color: u32,
    pub footer: EmbedFooter,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

pub fn state_glyph(entry: &StatusEntry) -> &'static str {
    if entry.state.is_running() {
        "🟢"
    } else {
        "🔴"
    }
}

/// The status card shared by `/status` and the change notifications.
pub fn status_embed(snapshot: &[StatusEntry], auto_restart: bool, now: DateTime<Utc>) -> Embed {
    let fields = snapshot
        .iter()
        .map(|entry| EmbedField {
            name: entry.image_family.clone(),
            value: format!("{} {}", state_glyph(entry), entry.state),
        })
        .collect();

    Embed {
        title: "IO Container Status".to_string(),
        description: "Current status of IO containers".to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        color: STATUS_COLOR,
        footer: EmbedFooter {
            text: format!(
                "Worker Auto Restart: {}",
                if auto_restart {
                    "✅ Enabled"
                } else {
                    "❌ Disabled"
                }
            ),
        },
        fields,
    }
}
