use std::{net::SocketAddr, path::PathBuf, sync::OnceLock};

use clap::Parser;

use crate::service::schedule::DEFAULT_INTERVAL_CRON;

/// Keep io.net workers running and control them from Discord.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Dotenv file loaded before reading the environment. A missing file is ignored.
    #[arg(short, long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Address of the Discord interactions endpoint.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Cron expression (with seconds) driving auto restart and status messages.
    #[arg(long, default_value = DEFAULT_INTERVAL_CRON)]
    pub interval_cron: String,
}

static ARGS: OnceLock<Args> = OnceLock::new();

pub fn get_cli_args() -> &'static Args {
    ARGS.get_or_init(Args::parse)
}
