//! Shared fake container engine for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::stream::BoxStream;

use crate::metrics::{CpuCounters, RawStatsPair};
use crate::runtime::{ContainerRecord, ContainerRuntime, LifecycleOp, RuntimeError, StatsSample};

#[derive(Default)]
struct FakeState {
    containers: Vec<ContainerRecord>,
    stats_failures: HashMap<String, RuntimeError>,
    list_failure: Option<RuntimeError>,
    log_history: HashMap<String, Vec<String>>,
    lifecycle_calls: Vec<(String, LifecycleOp)>,
    /// When set, follow-mode log streams never end on their own.
    endless_follow: bool,
}

/// In-memory [`ContainerRuntime`]. Cloning shares the underlying state so a
/// test can mutate the "engine" while registry/session code holds a clone.
#[derive(Clone, Default)]
pub(crate) struct FakeRuntime {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRuntime {
    pub fn new(containers: Vec<ContainerRecord>) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().containers = containers;
        fake
    }

    pub fn endless_follow(self) -> Self {
        self.state.lock().unwrap().endless_follow = true;
        self
    }

    pub fn running(id: &str, name: &str) -> ContainerRecord {
        Self::record(id, name, "running")
    }

    pub fn exited(id: &str, name: &str) -> ContainerRecord {
        Self::record(id, name, "exited")
    }

    fn record(id: &str, name: &str, status: &str) -> ContainerRecord {
        ContainerRecord {
            id: id.to_string(),
            short_id: id.chars().take(12).collect(),
            name: name.to_string(),
            status: status.to_string(),
            image: format!("{}:latest", name),
            created: chrono::Utc::now().timestamp() - 3600,
            ports: String::new(),
        }
    }

    pub fn fail_stats(&self, id: &str, err: RuntimeError) {
        self.state
            .lock()
            .unwrap()
            .stats_failures
            .insert(id.to_string(), err);
    }

    pub fn fail_list(&self, err: RuntimeError) {
        self.state.lock().unwrap().list_failure = Some(err);
    }

    pub fn remove_container(&self, id: &str) {
        self.state.lock().unwrap().containers.retain(|c| c.id != id);
    }

    pub fn set_log_history(&self, id: &str, lines: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .log_history
            .insert(id.to_string(), lines.iter().map(|l| l.to_string()).collect());
    }

    pub fn lifecycle_calls(&self) -> Vec<(String, LifecycleOp)> {
        self.state.lock().unwrap().lifecycle_calls.clone()
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerRecord>, RuntimeError> {
        let state = self.state.lock().unwrap();
        if let Some(err) = &state.list_failure {
            return Err(err.clone());
        }
        Ok(state
            .containers
            .iter()
            .filter(|c| include_stopped || c.status == "running")
            .cloned()
            .collect())
    }

    async fn stats_sample(&self, id: &str) -> Result<StatsSample, RuntimeError> {
        let state = self.state.lock().unwrap();
        if let Some(err) = state.stats_failures.get(id) {
            return Err(err.clone());
        }
        if !state.containers.iter().any(|c| c.id == id) {
            return Err(RuntimeError::NotFound(id.to_string()));
        }
        // A sample that computes to 20% CPU on 4 cores, 256MB of 1GB.
        Ok(StatsSample {
            cpu: RawStatsPair {
                current: CpuCounters {
                    total_usage: 500_000_000,
                    system_usage: 10_000_000_000,
                },
                previous: CpuCounters::default(),
                num_cores: 4,
            },
            mem_usage: 256 * 1024 * 1024,
            mem_limit: 1024 * 1024 * 1024,
        })
    }

    fn stream_logs(
        &self,
        id: &str,
        tail: Option<usize>,
        follow: bool,
    ) -> BoxStream<'static, Result<String, RuntimeError>> {
        let state = self.state.lock().unwrap();
        if follow && state.endless_follow {
            return Box::pin(futures_util::stream::pending());
        }
        let mut lines = state.log_history.get(id).cloned().unwrap_or_default();
        if let Some(n) = tail {
            let skip = lines.len().saturating_sub(n);
            lines.drain(..skip);
        }
        Box::pin(futures_util::stream::iter(lines.into_iter().map(Ok)))
    }

    async fn lifecycle(&self, id: &str, op: LifecycleOp) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        if !state.containers.iter().any(|c| c.id == id) {
            return Err(RuntimeError::NotFound(id.to_string()));
        }
        state.lifecycle_calls.push((id.to_string(), op));
        Ok(())
    }

    async fn container_status(&self, id: &str) -> Result<String, RuntimeError> {
        let state = self.state.lock().unwrap();
        state
            .containers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.status.clone())
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }
}
