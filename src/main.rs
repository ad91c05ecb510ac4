use std::process::ExitCode;
use std::sync::Arc;

use config::BotConfig;
use gateway::definitions::command_definitions;
use gateway::discord::DiscordClient;
use gateway::interactions::{AppState, SignatureVerifier};
use gateway::notifier::{DirectMessage, StatusNotifier};
use service::bootstrap::Platform;
use service::controller::{Controller, ControllerConfig, run_reconcile_loop};
use service::launcher::ShellLauncher;
use service::runtime::DockerRuntime;
use service::schedule::Ticker;

mod cli;
mod config;
mod gateway;
mod service;
mod signals;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::get_cli_args();

    // Load the dotenv file first so it can also carry RUST_LOG
    let dotenv_result = dotenv::from_path(&args.env_file);

    // Initialize the logger
    env_logger::init();

    if let Err(e) = dotenv_result {
        log::debug!("No env file loaded from {:?}: {e}", args.env_file);
    }

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let verifier = match SignatureVerifier::from_hex(&config.public_key) {
        Ok(verifier) => verifier,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let ticker = match Ticker::parse(&args.interval_cron) {
        Ok(ticker) => ticker,
        Err(e) => {
            log::error!("Invalid interval cron {:?}: {e}", args.interval_cron);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match DockerRuntime::connect() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Docker not found: {e}");
            return ExitCode::FAILURE;
        }
    };

    let controller = Arc::new(Controller::new(
        Arc::new(runtime),
        Arc::new(ShellLauncher),
        ControllerConfig {
            auto_restart: config.auto_restart,
            worker_command: config.worker_command.clone(),
            platform: Platform::current(),
        },
    ));

    let discord = Arc::new(DiscordClient::new(&config.discord_token));

    let application_id = match discord.current_application().await {
        Ok(id) => id,
        Err(e) => {
            log::error!("Unable to resolve the bot application: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Nobody to report to without the operator's DM channel
    let channel_id = match discord.open_dm(&config.operator_id).await {
        Ok(id) => id,
        Err(e) => {
            log::error!("Unable to open a DM channel with the operator: {e}");
            return ExitCode::FAILURE;
        }
    };

    match discord
        .register_commands(&application_id, command_definitions())
        .await
    {
        Ok(()) => log::info!("Successfully registered application commands."),
        Err(e) => log::error!("Failed to register application commands: {e}"),
    }

    tokio::spawn(run_reconcile_loop(Arc::clone(&controller), ticker.clone()));

    let notifier = StatusNotifier::new(
        Arc::clone(&controller),
        Arc::new(DirectMessage {
            discord: Arc::clone(&discord),
            channel_id,
        }),
        config.status_messages,
    );
    tokio::spawn(notifier.run(ticker));

    if let Err(e) = signals::handle_shutdown() {
        log::error!("Unable to install signal handler: {e}");
        return ExitCode::FAILURE;
    }

    let state = Arc::new(AppState {
        controller,
        discord,
        verifier,
        application_id,
        operator_id: config.operator_id.clone(),
    });

    match gateway::interactions::serve(args.listen, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Interactions endpoint failed: {e}");
            ExitCode::FAILURE
        }
    }
}
