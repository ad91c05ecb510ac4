use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::bootstrap::Platform;
use super::launcher::{ExecutionError, ProcessLauncher};
use super::runtime::{ContainerRuntime, ManagedContainer, RuntimeQueryError};
use super::schedule::Ticker;
use super::status::StatusReporter;

pub const WORKER_STARTED: &str = "✅ Worker Command executed successfully";

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("An error occurred while downloading the binary: {0}")]
    Download(ExecutionError),
    #[error("An error occurred while updating the binary permissions: {0}")]
    GrantExecute(ExecutionError),
    #[error("An error occurred while executing the worker command: {0}")]
    Launch(ExecutionError),
    #[error("WORKER_COMMAND is not configured")]
    MissingWorkerCommand,
}

/// Result of a single reconciliation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Disabled,
    Busy,
    Healthy,
    QueryFailed,
    Launched,
    LaunchFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchAction {
    Pause,
    Resume,
    Remove,
}

impl BatchAction {
    fn verb(self) -> &'static str {
        match self {
            BatchAction::Pause => "pause",
            BatchAction::Resume => "resume",
            BatchAction::Remove => "remove",
        }
    }
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ControllerConfig {
    pub auto_restart: bool,
    pub worker_command: Option<String>,
    pub platform: Platform,
}

/// The only place that tears down or launches workers.
///
/// `busy` only guards the reconciliation loop against itself. Chat commands
/// go straight through and may overlap a running cycle.
pub struct Controller {
    runtime: Arc<dyn ContainerRuntime>,
    launcher: Arc<dyn ProcessLauncher>,
    status: StatusReporter,
    config: ControllerConfig,
    busy: AtomicBool,
}

impl Controller {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        launcher: Arc<dyn ProcessLauncher>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            status: StatusReporter::new(Arc::clone(&runtime)),
            runtime,
            launcher,
            config,
            busy: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    pub fn auto_restart(&self) -> bool {
        self.config.auto_restart
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn managed_containers(&self) -> Result<Vec<ManagedContainer>, RuntimeQueryError> {
        self.runtime.list_managed_containers().await
    }

    /// Optionally tears down the current workers, refreshes the launch binary
    /// and runs the worker command.
    pub async fn start_workers(&self, remove_existing: bool) -> Result<String, ControllerError> {
        if remove_existing {
            self.stop_all_containers().await;
        }

        match self.config.platform.bootstrap() {
            Some(bootstrap) => {
                self.launcher
                    .run(&bootstrap.download)
                    .await
                    .map_err(ControllerError::Download)?;
                log::info!("Launch binary downloaded successfully");

                self.launcher
                    .run(&bootstrap.grant_execute)
                    .await
                    .map_err(ControllerError::GrantExecute)?;
                log::info!("Launch binary permissions updated successfully");
            }
            None => log::debug!("No launch binary for this platform, skipping bootstrap"),
        }

        let worker_command = self
            .config
            .worker_command
            .as_deref()
            .ok_or(ControllerError::MissingWorkerCommand)?;

        self.launcher
            .run(worker_command)
            .await
            .map_err(ControllerError::Launch)?;

        log::info!("Worker command executed successfully");
        Ok(WORKER_STARTED.to_string())
    }

    // Recreating io containers is not good practice, but it is what the
    // restart command has always done.
    pub async fn restart_all_containers(&self) -> Result<String, ControllerError> {
        self.start_workers(true).await
    }

    /// Returns how many containers were attempted.
    pub async fn stop_all_containers(&self) -> usize {
        self.batch(BatchAction::Remove).await
    }

    pub async fn pause_all_containers(&self) -> usize {
        self.batch(BatchAction::Pause).await
    }

    pub async fn resume_all_containers(&self) -> usize {
        self.batch(BatchAction::Resume).await
    }

    /// Raw passthrough for the operator's shell command.
    pub async fn run_shell(&self, command_line: &str) -> Result<String, ExecutionError> {
        log::info!("Running operator shell command `{command_line}`");
        self.launcher.run(command_line).await
    }

    async fn batch(&self, action: BatchAction) -> usize {
        let containers = match self.runtime.list_managed_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                log::error!(
                    "Unable to list worker containers to {}: {e}",
                    action.verb()
                );
                return 0;
            }
        };

        // Sequential, in listing order. One failure does not stop the batch.
        for container in &containers {
            let result = match action {
                BatchAction::Pause => self.runtime.pause(&container.id).await,
                BatchAction::Resume => self.runtime.resume(&container.id).await,
                BatchAction::Remove => self.runtime.force_remove(&container.id).await,
            };
            if let Err(e) = result {
                log::error!(
                    "Failed to {} container {} ({}): {e}",
                    action.verb(),
                    container.id,
                    container.image
                );
            }
        }

        containers.len()
    }

    /// One tick of the auto-restart loop.
    pub async fn reconcile_once(&self) -> ReconcileOutcome {
        if !self.config.auto_restart {
            return ReconcileOutcome::Disabled;
        }
        if self.is_busy() {
            log::debug!("Previous launch still in flight, skipping tick");
            return ReconcileOutcome::Busy;
        }

        match self.runtime.list_managed_containers().await {
            Ok(containers) if !containers.is_empty() => return ReconcileOutcome::Healthy,
            Ok(_) => {}
            Err(e) => {
                log::error!("Unable to list worker containers: {e}");
                return ReconcileOutcome::QueryFailed;
            }
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return ReconcileOutcome::Busy;
        }
        let _guard = BusyGuard(&self.busy);

        log::warn!("No worker containers running, relaunching workers");
        match self.start_workers(true).await {
            Ok(_) => {
                log::info!("Workers relaunched");
                ReconcileOutcome::Launched
            }
            Err(e) => {
                log::error!("Failed to relaunch workers: {e}");
                ReconcileOutcome::LaunchFailed
            }
        }
    }
}

/// Drives `reconcile_once` on every tick. Each cycle runs in its own task so
/// a slow launch never delays the schedule; overlapping ticks see `busy`.
pub async fn run_reconcile_loop(controller: Arc<Controller>, ticker: Ticker) {
    log::info!(
        "Starting reconciliation loop (auto restart {})",
        if controller.auto_restart() {
            "enabled"
        } else {
            "disabled"
        }
    );

    while ticker.tick().await {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            let outcome = controller.reconcile_once().await;
            log::trace!("Reconciliation tick: {outcome:?}");
        });
    }

    log::warn!("Reconciliation schedule has no upcoming ticks, stopping loop");
}
