//! Container registry: the polled table of containers and the row-to-handle
//! mapping that lifecycle actions resolve against. Both are rebuilt wholesale
//! on every refresh, never patched in place.

use thiserror::Error;

use crate::metrics;
use crate::runtime::{ContainerRuntime, RuntimeError};

/// Displayed when a value is unavailable due to a recovered local failure.
pub const PLACEHOLDER: &str = "-";

/// Which containers the next refresh asks the engine for. Process-wide,
/// flipped only by the explicit toggle action; never changes mid-refresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    All,
    RunningOnly,
}

impl FilterMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::All => Self::RunningOnly,
            Self::RunningOnly => Self::All,
        }
    }

    pub fn include_stopped(self) -> bool {
        matches!(self, Self::All)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::RunningOnly => "running only",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Exited,
    Paused,
    Other(String),
}

impl ContainerStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "running" => Self::Running,
            "exited" => Self::Exited,
            "paused" => Self::Paused,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Display label with iconography.
    pub fn label(&self) -> String {
        match self {
            Self::Running => "● running".to_string(),
            Self::Exited => "■ exited".to_string(),
            Self::Paused => "‖ paused".to_string(),
            Self::Other(s) => format!("○ {}", s),
        }
    }
}

/// Opaque stable reference to a container, valid relative to the refresh it
/// was resolved from. Not a row index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Full engine ID.
    pub id: String,
    pub name: String,
    pub short_id: String,
}

/// One row's worth of display data at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerSnapshot {
    pub short_id: String,
    pub name: String,
    pub status: ContainerStatus,
    pub image: String,
    pub ports: String,
    /// Formatted CPU percentage, or [`PLACEHOLDER`].
    pub cpu: String,
    /// Formatted memory usage, or [`PLACEHOLDER`].
    pub mem: String,
    /// Formatted uptime for running containers, or [`PLACEHOLDER`].
    pub uptime: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollupCounts {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    pub paused: usize,
}

/// Ordered rows plus rollup counts, computed from the same list call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub rows: Vec<ContainerSnapshot>,
    pub counts: RollupCounts,
    /// Wall-clock HH:MM:SS of the refresh that produced this snapshot.
    pub taken_at: String,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no container at row {0}")]
    NotFound(usize),
}

/// Owns the current snapshot and the row-to-handle mapping. Readers always
/// see either the fully-old or fully-new state: both fields are replaced
/// together at the end of a successful refresh, and a failed refresh leaves
/// them untouched.
#[derive(Default)]
pub struct Registry {
    handles: Vec<ContainerHandle>,
    snapshot: RegistrySnapshot,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &RegistrySnapshot {
        &self.snapshot
    }

    pub fn row_count(&self) -> usize {
        self.snapshot.rows.len()
    }

    /// Rebuild the snapshot and handle mapping from a fresh list call.
    /// Rows are processed independently: a failed stats sample degrades that
    /// row's CPU/memory to a placeholder without dropping other rows.
    pub async fn refresh<R: ContainerRuntime>(
        &mut self,
        runtime: &R,
        filter: FilterMode,
    ) -> Result<(), RuntimeError> {
        let records = runtime.list_containers(filter.include_stopped()).await?;
        let now = chrono::Utc::now().timestamp();

        let mut counts = RollupCounts {
            total: records.len(),
            ..Default::default()
        };
        let mut handles = Vec::with_capacity(records.len());
        let mut rows = Vec::with_capacity(records.len());

        for rec in records {
            let status = ContainerStatus::parse(&rec.status);
            match status {
                ContainerStatus::Running => counts.running += 1,
                ContainerStatus::Exited => counts.stopped += 1,
                ContainerStatus::Paused => counts.paused += 1,
                ContainerStatus::Other(_) => {}
            }

            let (cpu, mem) = if status.is_running() {
                match runtime.stats_sample(&rec.id).await {
                    Ok(sample) => (
                        format!("{:.1}", metrics::compute_cpu_percent(&sample.cpu)),
                        metrics::format_bytes(sample.mem_usage),
                    ),
                    Err(_) => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
                }
            } else {
                (PLACEHOLDER.to_string(), PLACEHOLDER.to_string())
            };

            // Uptime only means something while running.
            let uptime = if status.is_running() && rec.created > 0 {
                metrics::format_uptime(rec.created, now)
            } else {
                PLACEHOLDER.to_string()
            };

            let ports = if rec.ports.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                rec.ports
            };

            handles.push(ContainerHandle {
                id: rec.id,
                name: rec.name.clone(),
                short_id: rec.short_id.clone(),
            });
            rows.push(ContainerSnapshot {
                short_id: rec.short_id,
                name: rec.name,
                status,
                image: rec.image,
                ports,
                cpu,
                mem,
                uptime,
            });
        }

        self.handles = handles;
        self.snapshot = RegistrySnapshot {
            rows,
            counts,
            taken_at: chrono::Local::now().format("%H:%M:%S").to_string(),
        };
        Ok(())
    }

    /// Resolve a row index against the most recent refresh. Fails explicitly
    /// when the index no longer maps to a container rather than silently
    /// acting on whatever occupies the row now.
    pub fn resolve_row(&self, index: usize) -> Result<ContainerHandle, RegistryError> {
        self.handles
            .get(index)
            .cloned()
            .ok_or(RegistryError::NotFound(index))
    }
}
