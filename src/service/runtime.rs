//! Container engine access using bollard.
//!
//! Workers are launched by an external command and show up as plain Docker
//! containers. This module never creates them, it only observes the ones
//! whose image carries the worker namespace and acts on them by id.

use async_trait::async_trait;
use bollard::Docker;
use bollard::models::ContainerSummary;
use bollard::query_parameters::{
    ListContainersOptions, ListContainersOptionsBuilder, RemoveContainerOptions,
    RemoveContainerOptionsBuilder,
};

/// Image namespace of the worker containers.
pub const WORKER_IMAGE_PREFIX: &str = "ionetcontainers";

#[derive(Debug, thiserror::Error)]
pub enum RuntimeQueryError {
    #[error("Docker API error: {0}")]
    DockerApi(#[from] bollard::errors::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Exited,
    /// Any other engine state (created, restarting, dead...), kept verbatim.
    Other(String),
}

impl RunState {
    pub fn from_engine(state: &str) -> Self {
        match state {
            "running" => RunState::Running,
            "paused" => RunState::Paused,
            "exited" => RunState::Exited,
            other => RunState::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Running => f.write_str("running"),
            RunState::Paused => f.write_str("paused"),
            RunState::Exited => f.write_str("exited"),
            RunState::Other(state) => f.write_str(state),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedContainer {
    pub id: String,
    pub image: String,
    pub image_family: String,
    pub state: RunState,
}

impl ManagedContainer {
    pub fn new(id: impl Into<String>, image: impl Into<String>, state: &str) -> Self {
        let image = image.into();
        Self {
            id: id.into(),
            image_family: image_family(&image).to_string(),
            image,
            state: RunState::from_engine(state),
        }
    }
}

/// A container as reported by the engine listing, before filtering.
#[derive(Debug, Clone, Default)]
pub struct ListedContainer {
    pub id: Option<String>,
    pub image: Option<String>,
    pub state: Option<String>,
}

impl From<ContainerSummary> for ListedContainer {
    fn from(summary: ContainerSummary) -> Self {
        Self {
            id: summary.id,
            image: summary.image,
            state: summary.state.map(|state| state.to_string()),
        }
    }
}

pub fn is_managed(image: &str) -> bool {
    image.starts_with(WORKER_IMAGE_PREFIX)
}

/// Keep the worker containers of a listing, in listing order.
pub fn filter_managed<I>(listing: I) -> Vec<ManagedContainer>
where
    I: IntoIterator<Item = ListedContainer>,
{
    listing
        .into_iter()
        .filter_map(|listed| {
            let image = listed.image?;
            if !is_managed(&image) {
                return None;
            }
            Some(ManagedContainer::new(
                listed.id.unwrap_or_default(),
                image,
                listed.state.as_deref().unwrap_or_default(),
            ))
        })
        .collect()
}

/// Strip the digest or tag from an image reference.
pub fn image_family(image: &str) -> &str {
    // Digest references (image@sha256:...), possibly tagged as well
    let image = match image.find('@') {
        Some(at_pos) => &image[..at_pos],
        None => image,
    };

    // Tag references (image:tag). A colon followed by a slash belongs to a
    // registry port, e.g. localhost:5000/myimage
    if let Some(colon_pos) = image.rfind(':') {
        if !image[colon_pos + 1..].contains('/') {
            return &image[..colon_pos];
        }
    }

    image
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn list_managed_containers(&self) -> Result<Vec<ManagedContainer>, RuntimeQueryError>;
    async fn pause(&self, id: &str) -> Result<(), RuntimeQueryError>;
    async fn resume(&self, id: &str) -> Result<(), RuntimeQueryError>;
    async fn force_remove(&self, id: &str) -> Result<(), RuntimeQueryError>;
}

/// The local Docker daemon. The handle is cheap to clone and shared by every
/// task of the bot.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects using the default method (Unix socket on Linux/macOS, named
    /// pipe on Windows).
    pub fn connect() -> Result<Self, RuntimeQueryError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_managed_containers(&self) -> Result<Vec<ManagedContainer>, RuntimeQueryError> {
        // Same listing as `docker ps`: running and paused containers only.
        let options: ListContainersOptions = ListContainersOptionsBuilder::new().all(false).build();

        let summaries = self.docker.list_containers(Some(options)).await?;
        let managed = filter_managed(summaries.into_iter().map(ListedContainer::from));
        log::debug!("Found {} worker containers", managed.len());
        Ok(managed)
    }

    async fn pause(&self, id: &str) -> Result<(), RuntimeQueryError> {
        log::info!("Pausing container: {id}");
        self.docker.pause_container(id).await.inspect_err(|e| {
            log::error!("Failed to pause container {id}: {e}");
        })?;
        log::info!("Container {id} paused successfully");
        Ok(())
    }

    async fn resume(&self, id: &str) -> Result<(), RuntimeQueryError> {
        log::info!("Resuming container: {id}");
        self.docker.unpause_container(id).await.inspect_err(|e| {
            log::error!("Failed to resume container {id}: {e}");
        })?;
        log::info!("Container {id} resumed successfully");
        Ok(())
    }

    async fn force_remove(&self, id: &str) -> Result<(), RuntimeQueryError> {
        log::info!("Removing container: {id}");

        let options: RemoveContainerOptions =
            RemoveContainerOptionsBuilder::new().force(true).build();

        match self.docker.remove_container(id, Some(options)).await {
            Ok(_) => {
                log::info!("Container {id} removed successfully");
                Ok(())
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                log::info!("Container {id} not found, skipping removal");
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to remove container {id}: {e}");
                Err(RuntimeQueryError::DockerApi(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    #[derive(Debug, Clone)]
    struct Listing(Vec<(String, bool, String)>);

    impl Arbitrary for Listing {
        fn arbitrary(g: &mut Gen) -> Self {
            let suffixes = ["/worker", "/worker@sha256:abc", "/worker:v2", "", "-x/worker"];
            let len = usize::arbitrary(g) % 12;
            Listing(
                (0..len)
                    .map(|i| {
                        let managed = bool::arbitrary(g);
                        let suffix = g.choose(&suffixes).copied().unwrap_or_default();
                        (format!("c{i}"), managed, suffix.to_string())
                    })
                    .collect(),
            )
        }
    }

    fn listed(id: &str, image: &str, state: &str) -> ListedContainer {
        ListedContainer {
            id: Some(id.to_string()),
            image: Some(image.to_string()),
            state: Some(state.to_string()),
        }
    }

    #[quickcheck]
    fn filter_keeps_exactly_prefixed_images_in_order(listing: Listing) -> bool {
        let containers: Vec<ListedContainer> = listing
            .0
            .iter()
            .map(|(id, managed, suffix)| {
                let image = if *managed {
                    format!("{WORKER_IMAGE_PREFIX}{suffix}")
                } else {
                    format!("nginx{suffix}")
                };
                listed(id, &image, "running")
            })
            .collect();

        let expected: Vec<String> = listing
            .0
            .iter()
            .filter(|(_, managed, _)| *managed)
            .map(|(id, _, _)| id.clone())
            .collect();

        let ids: Vec<String> = filter_managed(containers).into_iter().map(|c| c.id).collect();
        ids == expected
    }

    #[quickcheck]
    fn image_family_never_keeps_a_digest(name: String) -> bool {
        let name: String = name.chars().filter(|c| *c != '@').collect();
        let image = format!("{name}@sha256:abc");
        !image_family(&image).contains('@')
    }

    #[quickcheck]
    fn image_family_strips_tag_and_digest(name: String, tag: String, pinned: bool) -> bool {
        let keep = |c: &char| c.is_ascii_alphanumeric() || *c == '-' || *c == '.';
        let name: String = name.chars().filter(keep).collect();
        let tag: String = tag.chars().filter(keep).collect();
        let family = format!("{WORKER_IMAGE_PREFIX}/{name}");
        let mut image = format!("{family}:{tag}");
        if pinned {
            image.push_str("@sha256:abc");
        }
        image_family(&image) == family
    }

    #[test]
    fn test_filter_skips_entries_without_image() {
        let listing = vec![
            ListedContainer {
                id: Some("a".into()),
                image: None,
                state: Some("running".into()),
            },
            listed("b", "ionetcontainers/io-worker-vc", "running"),
        ];
        let managed = filter_managed(listing);
        assert_eq!(managed.len(), 1);
        assert_eq!(managed[0].id, "b");
    }

    #[test]
    fn test_filter_on_empty_listing() {
        assert!(filter_managed(Vec::new()).is_empty());
    }

    #[test]
    fn test_image_family_strips_digest() {
        assert_eq!(
            image_family("ionetcontainers/worker@sha256:abc"),
            "ionetcontainers/worker"
        );
    }

    #[test]
    fn test_image_family_strips_tag() {
        assert_eq!(
            image_family("ionetcontainers/io-launch:v0.1"),
            "ionetcontainers/io-launch"
        );
    }

    #[test]
    fn test_image_family_strips_tag_and_digest() {
        let family = "ionetcontainers/io-worker-vc";
        assert_eq!(image_family("ionetcontainers/io-worker-vc:v2@sha256:abc"), family);
        assert_eq!(image_family("ionetcontainers/io-worker-vc:v2"), family);
        assert_eq!(image_family("ionetcontainers/io-worker-vc@sha256:abc"), family);
        assert_eq!(image_family(family), family);
        assert_eq!(
            image_family("localhost:5000/ionetcontainers:v1@sha256:abc"),
            "localhost:5000/ionetcontainers"
        );
    }

    #[test]
    fn test_image_family_keeps_registry_port() {
        assert_eq!(
            image_family("localhost:5000/ionetcontainers"),
            "localhost:5000/ionetcontainers"
        );
        assert_eq!(
            image_family("localhost:5000/ionetcontainers:v1"),
            "localhost:5000/ionetcontainers"
        );
    }

    #[test]
    fn test_run_state_from_engine() {
        assert_eq!(RunState::from_engine("running"), RunState::Running);
        assert_eq!(RunState::from_engine("paused"), RunState::Paused);
        assert_eq!(RunState::from_engine("exited"), RunState::Exited);
        assert_eq!(
            RunState::from_engine("restarting"),
            RunState::Other("restarting".to_string())
        );
        assert_eq!(RunState::Other("dead".into()).to_string(), "dead");
        assert!(RunState::Running.is_running());
        assert!(!RunState::Paused.is_running());
    }
}
