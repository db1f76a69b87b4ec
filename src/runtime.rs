//! Contract with the container engine. Everything the rest of the crate
//! knows about Docker goes through [`ContainerRuntime`], so the registry and
//! session logic can be driven by a fake engine in tests.

use std::future::Future;

use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::metrics::RawStatsPair;

/// One container as enumerated by the engine's list call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContainerRecord {
    /// Full engine ID, stable across refreshes.
    pub id: String,
    /// First 12 characters of the ID, for display.
    pub short_id: String,
    pub name: String,
    /// Raw state string: "running", "exited", "paused", ...
    pub status: String,
    pub image: String,
    /// Creation time as a unix timestamp, 0 when unreported.
    pub created: i64,
    /// Pre-formatted port mapping summary, empty when none.
    pub ports: String,
}

/// One point-in-time stats sample. The engine reports the pre/current CPU
/// counter pair itself, so a single call is enough to compute a rate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSample {
    pub cpu: RawStatsPair,
    pub mem_usage: u64,
    pub mem_limit: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleOp {
    Start,
    Stop,
    Restart,
    Remove,
}

impl LifecycleOp {
    /// Present-progressive label for in-flight notices.
    pub fn progress(self) -> &'static str {
        match self {
            Self::Start => "Starting",
            Self::Stop => "Stopping",
            Self::Restart => "Restarting",
            Self::Remove => "Removing",
        }
    }

    /// Past-tense label for completion notices.
    pub fn done(self) -> &'static str {
        match self {
            Self::Start => "Started",
            Self::Stop => "Stopped",
            Self::Restart => "Restarted",
            Self::Remove => "Removed",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("container engine unreachable: {0}")]
    Unavailable(String),
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Api(String),
}

/// The container engine as the rest of the crate sees it. Implemented by the
/// bollard-backed [`crate::docker::DockerClient`] and by test fakes.
///
/// Methods return `impl Future + Send` rather than plain `async fn` so
/// callers can spawn work onto the runtime behind a generic bound.
pub trait ContainerRuntime: Send + Sync {
    /// Verify the engine is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    /// Enumerate containers. `include_stopped = false` lists running only.
    fn list_containers(
        &self,
        include_stopped: bool,
    ) -> impl Future<Output = Result<Vec<ContainerRecord>, RuntimeError>> + Send;

    /// One non-streaming stats sample for a container.
    fn stats_sample(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<StatsSample, RuntimeError>> + Send;

    /// Stream log lines, already decoded (invalid UTF-8 replaced, trailing
    /// whitespace trimmed). Finite when `follow` is false; infinite and not
    /// restartable when true. `tail` limits history to the most recent N
    /// lines, None means no history.
    fn stream_logs(
        &self,
        id: &str,
        tail: Option<usize>,
        follow: bool,
    ) -> BoxStream<'static, Result<String, RuntimeError>>;

    /// Invoke a lifecycle operation on a container.
    fn lifecycle(
        &self,
        id: &str,
        op: LifecycleOp,
    ) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    /// Re-read a container's current status string.
    fn container_status(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<String, RuntimeError>> + Send;
}
