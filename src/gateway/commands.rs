use chrono::Utc;

use super::embed::{Embed, status_embed};
use crate::service::controller::Controller;

pub const PROCESSING: &str = "⏳ Processing command...";
pub const COMMAND_REQUIRED: &str = "❌ Command is required";
pub const NO_ACTIVE_CONTAINERS: &str = "❌ No active containers found";
pub const STOPPED: &str = "✅ All IO containers successfully stopped";
pub const RESTARTED: &str = "✅ All IO containers successfully restarted";
pub const PAUSED: &str = "✅ All IO containers successfully paused";
pub const RESUMED: &str = "✅ All IO containers successfully resumed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Stop,
    Restart,
    Pause,
    Resume,
    Shell(Option<String>),
    Status,
}

impl BotCommand {
    /// `argument` is the `command` option, only meaningful for `shell`.
    pub fn parse(name: &str, argument: Option<String>) -> Option<Self> {
        let command = match name {
            "start" => BotCommand::Start,
            "stop" => BotCommand::Stop,
            "restart" => BotCommand::Restart,
            "pause" => BotCommand::Pause,
            "resume" => BotCommand::Resume,
            "shell" => BotCommand::Shell(argument.filter(|a| !a.is_empty())),
            "status" => BotCommand::Status,
            _ => return None,
        };
        Some(command)
    }

    /// How the interaction is answered before the command runs.
    pub fn acknowledgement(&self) -> Acknowledgement {
        match self {
            BotCommand::Start
            | BotCommand::Stop
            | BotCommand::Restart
            | BotCommand::Pause
            | BotCommand::Resume => Acknowledgement::Progress,
            BotCommand::Shell(Some(_)) => Acknowledgement::Deferred,
            BotCommand::Shell(None) | BotCommand::Status => Acknowledgement::Inline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Reply with `PROCESSING` now, edit in the result later.
    Progress,
    /// Reply with a loading state now, edit in the result later.
    Deferred,
    /// The result is the reply.
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Status(Embed),
}

impl Reply {
    /// Plain text version, used when editing a previous reply.
    pub fn into_text(self) -> String {
        match self {
            Reply::Text(text) => text,
            // Fallback only: status cards are answered inline, never edited in.
            Reply::Status(embed) => embed
                .fields
                .iter()
                .map(|field| format!("{}: {}", field.name, field.value))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

fn error_reply(err: impl std::fmt::Display) -> Reply {
    Reply::Text(format!(
        "❌ An error occurred while executing the command\n\n**Error:**{err}"
    ))
}

/// Runs a command against the controller and renders the final reply.
/// Failures are rendered too; the operator always gets an answer.
pub async fn execute(controller: &Controller, command: &BotCommand) -> Reply {
    match command {
        BotCommand::Start => match controller.start_workers(true).await {
            Ok(message) => Reply::Text(message),
            Err(e) => error_reply(e),
        },
        BotCommand::Stop => {
            controller.stop_all_containers().await;
            Reply::Text(STOPPED.to_string())
        }
        BotCommand::Restart => match controller.restart_all_containers().await {
            Ok(_) => Reply::Text(RESTARTED.to_string()),
            Err(e) => error_reply(e),
        },
        BotCommand::Pause => {
            if !has_containers(controller).await {
                return Reply::Text(NO_ACTIVE_CONTAINERS.to_string());
            }
            controller.pause_all_containers().await;
            Reply::Text(PAUSED.to_string())
        }
        BotCommand::Resume => {
            if !has_containers(controller).await {
                return Reply::Text(NO_ACTIVE_CONTAINERS.to_string());
            }
            controller.resume_all_containers().await;
            Reply::Text(RESUMED.to_string())
        }
        BotCommand::Shell(None) => Reply::Text(COMMAND_REQUIRED.to_string()),
        BotCommand::Shell(Some(command_line)) => match controller.run_shell(command_line).await {
            Ok(stdout) => Reply::Text(stdout),
            Err(e) => error_reply(e),
        },
        BotCommand::Status => match controller.status().snapshot().await {
            Ok(snapshot) => Reply::Status(status_embed(
                &snapshot,
                controller.auto_restart(),
                Utc::now(),
            )),
            Err(e) => error_reply(e),
        },
    }
}

// A listing failure reads as "nothing to act on".
async fn has_containers(controller: &Controller) -> bool {
    match controller.managed_containers().await {
        Ok(containers) => !containers.is_empty(),
        Err(e) => {
            log::error!("Unable to list worker containers: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::embed::EmbedField;
    use crate::service::bootstrap::Platform;
    use crate::service::controller::{ControllerConfig, WORKER_STARTED};
    use crate::service::testing::{FakeLauncher, FakeRuntime};
    use std::sync::Arc;

    fn controller(runtime: Arc<FakeRuntime>, launcher: Arc<FakeLauncher>) -> Controller {
        Controller::new(
            runtime,
            launcher,
            ControllerConfig {
                auto_restart: true,
                worker_command: Some("./launch_binary_linux".to_string()),
                platform: Platform::Other,
            },
        )
    }

    #[test]
    fn test_parse() {
        assert_eq!(BotCommand::parse("start", None), Some(BotCommand::Start));
        assert_eq!(
            BotCommand::parse("shell", Some("uptime".into())),
            Some(BotCommand::Shell(Some("uptime".into())))
        );
        assert_eq!(
            BotCommand::parse("shell", Some(String::new())),
            Some(BotCommand::Shell(None))
        );
        assert_eq!(BotCommand::parse("reboot", None), None);
    }

    #[test]
    fn test_acknowledgement() {
        assert_eq!(BotCommand::Stop.acknowledgement(), Acknowledgement::Progress);
        assert_eq!(
            BotCommand::Shell(Some("ls".into())).acknowledgement(),
            Acknowledgement::Deferred
        );
        assert_eq!(BotCommand::Shell(None).acknowledgement(), Acknowledgement::Inline);
        assert_eq!(BotCommand::Status.acknowledgement(), Acknowledgement::Inline);
    }

    #[tokio::test]
    async fn test_start_replies_with_result() {
        let controller = controller(FakeRuntime::with_containers(&[]), FakeLauncher::new());
        assert_eq!(
            execute(&controller, &BotCommand::Start).await,
            Reply::Text(WORKER_STARTED.to_string())
        );
    }

    #[tokio::test]
    async fn test_start_failure_is_replied() {
        let launcher = FakeLauncher::new();
        launcher.fail_on("./launch_binary_linux");
        let controller = controller(FakeRuntime::with_containers(&[]), launcher);

        let reply = execute(&controller, &BotCommand::Start).await.into_text();
        assert!(reply.starts_with("❌ An error occurred"));
        assert!(reply.contains("exit status: 1"));
    }

    #[tokio::test]
    async fn test_stop_replies_fixed_text() {
        let runtime = FakeRuntime::with_containers(&[("a", "ionetcontainers/w", "running")]);
        let controller = controller(runtime.clone(), FakeLauncher::new());

        assert_eq!(
            execute(&controller, &BotCommand::Stop).await,
            Reply::Text(STOPPED.to_string())
        );
        assert_eq!(runtime.count_calls("remove"), 1);
    }

    #[tokio::test]
    async fn test_pause_without_containers() {
        let runtime = FakeRuntime::with_containers(&[]);
        let controller = controller(runtime.clone(), FakeLauncher::new());

        assert_eq!(
            execute(&controller, &BotCommand::Pause).await,
            Reply::Text(NO_ACTIVE_CONTAINERS.to_string())
        );
        assert_eq!(runtime.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_resume_with_containers() {
        let runtime = FakeRuntime::with_containers(&[("a", "ionetcontainers/w", "paused")]);
        let controller = controller(runtime.clone(), FakeLauncher::new());

        assert_eq!(
            execute(&controller, &BotCommand::Resume).await,
            Reply::Text(RESUMED.to_string())
        );
        assert_eq!(runtime.calls(), vec!["list", "list", "resume a"]);
    }

    #[tokio::test]
    async fn test_shell_returns_stdout() {
        let launcher = FakeLauncher::new();
        launcher.set_output(" 12:00:00 up 3 days\n");
        let controller = controller(FakeRuntime::with_containers(&[]), launcher.clone());

        let reply = execute(&controller, &BotCommand::Shell(Some("uptime".into()))).await;
        assert_eq!(reply, Reply::Text(" 12:00:00 up 3 days\n".to_string()));
        assert_eq!(launcher.commands(), vec!["uptime".to_string()]);
    }

    #[tokio::test]
    async fn test_shell_error_reports_message_only() {
        let launcher = FakeLauncher::new();
        launcher.set_output("should not be shown");
        launcher.fail_on("false");
        let controller = controller(FakeRuntime::with_containers(&[]), launcher);

        let reply = execute(&controller, &BotCommand::Shell(Some("false".into())))
            .await
            .into_text();
        assert_eq!(
            reply,
            "❌ An error occurred while executing the command\n\n**Error:**Command failed: false\nexit status: 1"
        );
    }

    #[test]
    fn test_status_card_as_text_lists_fields() {
        let embed = crate::gateway::embed::Embed {
            fields: vec![
                EmbedField {
                    name: "ionetcontainers/io-worker-vc".into(),
                    value: "🟢 running".into(),
                },
                EmbedField {
                    name: "ionetcontainers/io-launch".into(),
                    value: "🔴 paused".into(),
                },
            ],
            ..status_embed(&[], false, Utc::now())
        };
        assert_eq!(
            Reply::Status(embed).into_text(),
            "ionetcontainers/io-worker-vc: 🟢 running\nionetcontainers/io-launch: 🔴 paused"
        );
        assert_eq!(Reply::Text(PAUSED.into()).into_text(), PAUSED);
    }

    #[tokio::test]
    async fn test_status_renders_running_worker() {
        let runtime = FakeRuntime::with_containers(&[(
            "a",
            "ionetcontainers/worker@sha256:abc",
            "running",
        )]);
        let controller = controller(runtime, FakeLauncher::new());

        let Reply::Status(embed) = execute(&controller, &BotCommand::Status).await else {
            panic!("expected a status card");
        };
        assert_eq!(
            embed.fields,
            vec![EmbedField {
                name: "ionetcontainers/worker".into(),
                value: "🟢 running".into(),
            }]
        );
        assert_eq!(embed.footer.text, "Worker Auto Restart: ✅ Enabled");
    }
}
