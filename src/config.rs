/// Process configuration, read from the environment once at startup.
pub struct BotConfig {
    pub discord_token: String,
    pub operator_id: String,
    /// Hex encoded Ed25519 key of the Discord application.
    pub public_key: String,
    pub auto_restart: bool,
    pub status_messages: bool,
    pub worker_command: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is missing")]
    Missing(&'static str),
    #[error("Environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("discord_token", &"<redacted>")
            .field("operator_id", &self.operator_id)
            .field("public_key", &self.public_key)
            .field("auto_restart", &self.auto_restart)
            .field("status_messages", &self.status_messages)
            .field("worker_command", &self.worker_command)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as missing.
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let discord_token = required("DISCORD_TOKEN")?;
        let operator_id = required("DISCORD_USER_ID")?;
        let public_key = required("DISCORD_PUBLIC_KEY")?;
        let auto_restart = required("ENABLE_WORKER_AUTO_RESTART")? == "true";
        let status_messages = required("ENABLE_WORKER_STATUS_MESSAGE")? == "true";
        let worker_command = get("WORKER_COMMAND");

        // The auto restart loop cannot do anything without it.
        if auto_restart && worker_command.is_none() {
            return Err(ConfigError::Missing("WORKER_COMMAND"));
        }

        if !operator_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Invalid {
                name: "DISCORD_USER_ID",
                reason: "expected a numeric Discord user id".to_string(),
            });
        }

        Ok(Self {
            discord_token,
            operator_id,
            public_key,
            auto_restart,
            status_messages,
            worker_command,
        })
    }
}
