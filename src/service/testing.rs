//! In-memory engine and launcher used by the unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::launcher::{ExecutionError, ProcessLauncher};
use super::runtime::{
    ContainerRuntime, ListedContainer, ManagedContainer, RuntimeQueryError, filter_managed,
};

#[derive(Default)]
pub struct FakeRuntime {
    listing: Mutex<Vec<ListedContainer>>,
    failing: Mutex<HashSet<String>>,
    list_fails: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn with_containers(containers: &[(&str, &str, &str)]) -> Arc<Self> {
        let runtime = Arc::new(Self::default());
        runtime.set_containers(containers);
        runtime
    }

    /// Replace the engine listing with `(id, image, state)` triples.
    pub fn set_containers(&self, containers: &[(&str, &str, &str)]) {
        *self.listing.lock().unwrap() = containers
            .iter()
            .map(|(id, image, state)| ListedContainer {
                id: Some(id.to_string()),
                image: Some(image.to_string()),
                state: Some(state.to_string()),
            })
            .collect();
    }

    pub fn fail_on(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_listing(&self) {
        *self.list_fails.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn act(&self, action: &str, id: &str) -> Result<(), RuntimeQueryError> {
        self.calls.lock().unwrap().push(format!("{action} {id}"));
        if self.failing.lock().unwrap().contains(id) {
            return Err(engine_error());
        }
        if action == "remove" {
            self.listing
                .lock()
                .unwrap()
                .retain(|c| c.id.as_deref() != Some(id));
        }
        Ok(())
    }
}

fn engine_error() -> RuntimeQueryError {
    RuntimeQueryError::DockerApi(bollard::errors::Error::DockerResponseServerError {
        status_code: 500,
        message: "engine exploded".to_string(),
    })
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_managed_containers(&self) -> Result<Vec<ManagedContainer>, RuntimeQueryError> {
        self.calls.lock().unwrap().push("list".to_string());
        if *self.list_fails.lock().unwrap() {
            return Err(engine_error());
        }
        Ok(filter_managed(self.listing.lock().unwrap().clone()))
    }

    async fn pause(&self, id: &str) -> Result<(), RuntimeQueryError> {
        self.act("pause", id)
    }

    async fn resume(&self, id: &str) -> Result<(), RuntimeQueryError> {
        self.act("resume", id)
    }

    async fn force_remove(&self, id: &str) -> Result<(), RuntimeQueryError> {
        self.act("remove", id)
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    commands: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
    output: Mutex<String>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A launcher that signals `started` on each run and then waits for
    /// `release` before returning.
    pub fn gated(started: Arc<Notify>, release: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some((started, release)),
            ..Self::default()
        })
    }

    /// Commands starting with `prefix` exit non-zero.
    pub fn fail_on(&self, prefix: &str) {
        self.failing.lock().unwrap().push(prefix.to_string());
    }

    pub fn set_output(&self, output: &str) {
        *self.output.lock().unwrap() = output.to_string();
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn run(&self, command_line: &str) -> Result<String, ExecutionError> {
        self.commands.lock().unwrap().push(command_line.to_string());

        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }

        let fails = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| command_line.starts_with(prefix.as_str()));
        if fails {
            return Err(ExecutionError {
                command: command_line.to_string(),
                detail: "exit status: 1".to_string(),
            });
        }
        Ok(self.output.lock().unwrap().clone())
    }
}
