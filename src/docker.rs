//! Bollard-backed implementation of the [`ContainerRuntime`] contract.

use bollard::Docker;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, RestartContainerOptions, Stats, StatsOptions, StopContainerOptions,
};
use bollard::models::ContainerSummary;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tracing::debug;

use crate::metrics::{CpuCounters, RawStatsPair};
use crate::runtime::{ContainerRecord, ContainerRuntime, LifecycleOp, RuntimeError, StatsSample};

/// Wrapper around bollard's Docker client.
#[derive(Clone)]
pub struct DockerClient {
    client: Docker,
}

impl DockerClient {
    /// Try to connect to the Docker daemon using the platform defaults.
    /// Returns None if no connection could be configured; reachability is
    /// only known after [`ContainerRuntime::ping`].
    pub fn try_new() -> Option<Self> {
        let client = Docker::connect_with_local_defaults().ok()?;
        Some(Self { client })
    }
}

impl ContainerRuntime for DockerClient {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.client
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))
    }

    async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerRecord>, RuntimeError> {
        let options: ListContainersOptions<String> = ListContainersOptions {
            all: include_stopped,
            ..Default::default()
        };

        let summaries = self.client.list_containers(Some(options)).await?;
        debug!(count = summaries.len(), include_stopped, "listed containers");
        Ok(summaries.iter().map(summary_to_record).collect())
    }

    async fn stats_sample(&self, id: &str) -> Result<StatsSample, RuntimeError> {
        // stream: false without one_shot makes the daemon supply the
        // pre/current counter pair in a single reading.
        let options = StatsOptions {
            stream: false,
            one_shot: false,
        };

        let mut stream = self.client.stats(id, Some(options));
        match stream.next().await {
            Some(Ok(stats)) => Ok(stats_to_sample(&stats)),
            Some(Err(e)) => Err(e.into()),
            None => Err(RuntimeError::Api("empty stats response".to_string())),
        }
    }

    fn stream_logs(
        &self,
        id: &str,
        tail: Option<usize>,
        follow: bool,
    ) -> BoxStream<'static, Result<String, RuntimeError>> {
        let options: LogsOptions<String> = LogsOptions {
            stdout: true,
            stderr: true,
            follow,
            tail: tail.map_or_else(|| "0".to_string(), |n| n.to_string()),
            timestamps: true,
            ..Default::default()
        };

        let stream = self.client.logs(id, Some(options));
        Box::pin(stream.filter_map(|result| async move {
            match result {
                Ok(LogOutput::StdIn { .. }) => None,
                Ok(output) => {
                    // Invalid byte sequences become U+FFFD instead of
                    // killing the stream.
                    let bytes = output.into_bytes();
                    Some(Ok(String::from_utf8_lossy(&bytes).trim_end().to_string()))
                }
                Err(e) => Some(Err(RuntimeError::from(e))),
            }
        }))
    }

    async fn lifecycle(&self, id: &str, op: LifecycleOp) -> Result<(), RuntimeError> {
        debug!(id, ?op, "lifecycle call");
        match op {
            LifecycleOp::Start => self.client.start_container::<String>(id, None).await?,
            LifecycleOp::Stop => {
                let options = StopContainerOptions { t: 10 };
                self.client.stop_container(id, Some(options)).await?;
            }
            LifecycleOp::Restart => {
                let options = RestartContainerOptions { t: 10 };
                self.client.restart_container(id, Some(options)).await?;
            }
            LifecycleOp::Remove => {
                let options = RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                };
                self.client.remove_container(id, Some(options)).await?;
            }
        }
        Ok(())
    }

    async fn container_status(&self, id: &str) -> Result<String, RuntimeError> {
        let inspect = self
            .client
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        Ok(inspect
            .state
            .and_then(|s| s.status)
            .map(|s| s.to_string())
            .unwrap_or_default())
    }
}

impl From<bollard::errors::Error> for RuntimeError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => Self::NotFound(message),
            other => Self::Api(other.to_string()),
        }
    }
}

// --- Mapping helpers ---

fn summary_to_record(s: &ContainerSummary) -> ContainerRecord {
    let id = s.id.clone().unwrap_or_default();
    let short_id = id.chars().take(12).collect::<String>();

    let name = s
        .names
        .as_ref()
        .and_then(|n| n.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| short_id.clone());

    ContainerRecord {
        short_id,
        name,
        status: s.state.clone().unwrap_or_default(),
        image: s.image.clone().unwrap_or_default(),
        created: s.created.unwrap_or(0),
        ports: format_ports(s),
        id,
    }
}

fn stats_to_sample(stats: &Stats) -> StatsSample {
    let num_cores = stats
        .cpu_stats
        .cpu_usage
        .percpu_usage
        .as_ref()
        .map_or(1, |v| v.len() as u64);

    StatsSample {
        cpu: RawStatsPair {
            current: CpuCounters {
                total_usage: stats.cpu_stats.cpu_usage.total_usage,
                system_usage: stats.cpu_stats.system_cpu_usage.unwrap_or(0),
            },
            previous: CpuCounters {
                total_usage: stats.precpu_stats.cpu_usage.total_usage,
                system_usage: stats.precpu_stats.system_cpu_usage.unwrap_or(0),
            },
            num_cores,
        },
        mem_usage: stats.memory_stats.usage.unwrap_or(0),
        mem_limit: stats.memory_stats.limit.unwrap_or(0),
    }
}

/// Summarize port mappings, capped at two entries to keep the column narrow.
fn format_ports(s: &ContainerSummary) -> String {
    let Some(ports) = &s.ports else {
        return String::new();
    };
    let mut parts = Vec::new();
    for p in ports {
        let container_port = p.private_port;
        let proto = p
            .typ
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "tcp".to_string());
        if let (Some(ip), Some(pub_port)) = (&p.ip, p.public_port) {
            parts.push(format!("{}:{}->{}/{}", ip, pub_port, container_port, proto));
        } else {
            parts.push(format!("{}/{}", container_port, proto));
        }
    }
    if parts.len() > 2 {
        format!("{}, ...", parts[..2].join(", "))
    } else {
        parts.join(", ")
    }
}
