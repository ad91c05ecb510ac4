use std::sync::Arc;

use tokio::sync::Mutex;

use super::runtime::{ContainerRuntime, RunState, RuntimeQueryError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub image_family: String,
    pub state: RunState,
}

pub type StatusSnapshot = Vec<StatusEntry>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub image_family: String,
    pub old_state: RunState,
    pub new_state: RunState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusDelta {
    pub changed: bool,
    pub changed_entries: Vec<StateChange>,
}

/// Entries present in both snapshots whose state differs, matched by image
/// family. Entries only present in `new` are not reported.
pub fn diff(old: &[StatusEntry], new: &[StatusEntry]) -> Vec<StateChange> {
    new.iter()
        .filter_map(|entry| {
            let previous = old.iter().find(|o| o.image_family == entry.image_family)?;
            (previous.state != entry.state).then(|| StateChange {
                image_family: entry.image_family.clone(),
                old_state: previous.state.clone(),
                new_state: entry.state.clone(),
            })
        })
        .collect()
}

pub struct StatusReporter {
    runtime: Arc<dyn ContainerRuntime>,
    previous: Mutex<Option<StatusSnapshot>>,
}

impl StatusReporter {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime,
            previous: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> Result<StatusSnapshot, RuntimeQueryError> {
        let containers = self.runtime.list_managed_containers().await?;
        Ok(containers
            .into_iter()
            .map(|c| StatusEntry {
                image_family: c.image_family,
                state: c.state,
            })
            .collect())
    }

    /// Compares a fresh snapshot with the one taken by the previous call and
    /// stores the fresh one. The first call always reports a change.
    pub async fn compare_to_previous(&self) -> Result<StatusDelta, RuntimeQueryError> {
        let current = self.snapshot().await?;
        let mut previous = self.previous.lock().await;

        let delta = match previous.as_deref() {
            None => StatusDelta {
                changed: true,
                changed_entries: Vec::new(),
            },
            Some(old) => {
                let changed_entries = diff(old, &current);
                StatusDelta {
                    changed: !changed_entries.is_empty(),
                    changed_entries,
                }
            }
        };

        *previous = Some(current);
        Ok(delta)
    }
}
