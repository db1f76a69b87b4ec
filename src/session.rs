//! The list/detail mode state machine, the per-container detail session with
//! its two background activities, and non-blocking lifecycle dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::metrics;
use crate::registry::{ContainerHandle, FilterMode, Registry};
use crate::runtime::{ContainerRuntime, LifecycleOp};

/// How many historical log lines a detail session loads before following.
const LOG_TAIL_LINES: usize = 100;
/// Stats sampling period while the container is running.
const STATS_INTERVAL: Duration = Duration::from_millis(1500);
/// Cheaper poll while the container is not running.
const IDLE_STATS_INTERVAL: Duration = Duration::from_millis(2000);

/// Which UI surface is active. LIST and DETAIL are the stable states; the
/// transitioning states gate out every other operation while a detail
/// session is being built or torn down.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    List,
    EnteringDetail,
    Detail,
    LeavingDetail,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SessionRejected {
    #[error("a detail session is already active")]
    AlreadyActive,
    #[error("a mode transition is in progress")]
    Transitioning,
    #[error("an action is already in progress")]
    ActionInFlight,
    #[error("not available in detail view")]
    NotInList,
}

/// A detail session for exactly one container: a log-tailing task and a
/// periodic stats task, both feeding channels the app loop polls. Neither
/// task ever blocks the control thread; both observe a shared stop flag at
/// their cooperative checkpoints and are joined by [`DetailSession::drain`].
pub struct DetailSession {
    pub container_id: String,
    pub container_name: String,
    pub log_rx: mpsc::Receiver<String>,
    pub stats_rx: mpsc::Receiver<String>,
    stop: Arc<AtomicBool>,
    log_task: JoinHandle<()>,
    stats_task: JoinHandle<()>,
}

impl DetailSession {
    /// Spawn both activities on the given runtime handle.
    pub fn open<R>(runtime: R, rt: &Handle, container: ContainerHandle) -> Self
    where
        R: ContainerRuntime + Clone + Send + Sync + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (log_tx, log_rx) = mpsc::channel(256);
        let (stats_tx, stats_rx) = mpsc::channel(16);

        let log_task = rt.spawn(log_activity(
            runtime.clone(),
            container.id.clone(),
            log_tx,
            Arc::clone(&stop),
        ));
        let stats_task = rt.spawn(stats_activity(
            runtime,
            container.id.clone(),
            stats_tx,
            Arc::clone(&stop),
        ));

        Self {
            container_id: container.id,
            container_name: container.name,
            log_rx,
            stats_rx,
            stop,
            log_task,
            stats_task,
        }
    }

    /// True once both activities have provably terminated.
    pub fn is_terminated(&self) -> bool {
        self.log_task.is_finished() && self.stats_task.is_finished()
    }

    /// Mandatory teardown: raise the stop flag, cancel both activities, and
    /// block until both have terminated. After this returns, neither task
    /// holds a live reference to the engine's log or stats streams.
    /// Idempotent with respect to activities that already ended on their own.
    pub async fn drain(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.log_task.abort();
        self.stats_task.abort();
        // The join errors here are the expected cancellation signal.
        let _ = (&mut self.log_task).await;
        let _ = (&mut self.stats_task).await;
        debug!(id = %self.container_id, "detail session drained");
    }
}

/// Fetch recent history once, then follow the live stream until canceled.
/// A hard failure emits one visible error line and ends the activity.
async fn log_activity<R: ContainerRuntime>(
    runtime: R,
    id: String,
    tx: mpsc::Sender<String>,
    stop: Arc<AtomicBool>,
) {
    if tx
        .send(format!("Loading last {} log lines...", LOG_TAIL_LINES))
        .await
        .is_err()
    {
        return;
    }

    let mut history = runtime.stream_logs(&id, Some(LOG_TAIL_LINES), false);
    while let Some(result) = history.next().await {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        match result {
            Ok(line) => {
                if !line.is_empty() && tx.send(line).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(format!("[error] streaming logs: {}", e)).await;
                return;
            }
        }
    }

    if tx.send("--- streaming new logs ---".to_string()).await.is_err() {
        return;
    }

    let mut follow = runtime.stream_logs(&id, None, true);
    while let Some(result) = follow.next().await {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        match result {
            Ok(line) => {
                if !line.is_empty() && tx.send(line).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(format!("[error] streaming logs: {}", e)).await;
                return;
            }
        }
        // Yield so a burst of lines cannot starve the control thread.
        tokio::task::yield_now().await;
    }
}

/// Periodically re-check status and sample stats. A failed iteration emits a
/// visible error line and the loop continues; one bad sample never kills the
/// activity.
async fn stats_activity<R: ContainerRuntime>(
    runtime: R,
    id: String,
    tx: mpsc::Sender<String>,
    stop: Arc<AtomicBool>,
) {
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }

        let (line, pause) = match stats_readout(&runtime, &id).await {
            Ok(StatsReadout::Line(line)) => (line, STATS_INTERVAL),
            Ok(StatsReadout::NotRunning(status)) => {
                (format!("status: {}", status), IDLE_STATS_INTERVAL)
            }
            Err(e) => (format!("[error] {}", e), STATS_INTERVAL),
        };

        if tx.send(line).await.is_err() {
            return;
        }
        tokio::time::sleep(pause).await;
    }
}

enum StatsReadout {
    Line(String),
    NotRunning(String),
}

async fn stats_readout<R: ContainerRuntime>(
    runtime: &R,
    id: &str,
) -> Result<StatsReadout, crate::runtime::RuntimeError> {
    let status = runtime.container_status(id).await?;
    if status != "running" {
        return Ok(StatsReadout::NotRunning(status));
    }

    let sample = runtime.stats_sample(id).await?;
    let cpu = metrics::compute_cpu_percent(&sample.cpu);
    let mem = metrics::compute_memory(sample.mem_usage, sample.mem_limit);
    let mut line = format!("CPU: {:.1}%  |  Memory: {} / {}", cpu, mem.usage, mem.limit);
    if let Some(pct) = mem.percent {
        line.push_str(&format!(" ({:.1}%)", pct));
    }
    Ok(StatsReadout::Line(line))
}

/// Single source of truth for which UI surface is active. Owns the detail
/// session exclusively and serializes lifecycle actions; nothing outside
/// this type starts or stops a [`DetailSession`].
#[derive(Default)]
pub struct SessionManager {
    state: SessionState,
    session: Option<DetailSession>,
    action_rx: Option<oneshot::Receiver<String>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session_mut(&mut self) -> Option<&mut DetailSession> {
        self.session.as_mut()
    }

    pub fn action_in_progress(&self) -> bool {
        self.action_rx.is_some()
    }

    /// Open a detail session for the resolved container. A second request
    /// while one is open or mid-transition is rejected, never stacked.
    pub fn enter_detail<R>(
        &mut self,
        runtime: &R,
        rt: &Handle,
        container: ContainerHandle,
    ) -> Result<(), SessionRejected>
    where
        R: ContainerRuntime + Clone + Send + Sync + 'static,
    {
        match self.state {
            SessionState::List => {}
            SessionState::Detail => return Err(SessionRejected::AlreadyActive),
            SessionState::EnteringDetail | SessionState::LeavingDetail => {
                return Err(SessionRejected::Transitioning);
            }
        }

        self.state = SessionState::EnteringDetail;
        debug!(id = %container.id, name = %container.name, "entering detail");
        self.session = Some(DetailSession::open(runtime.clone(), rt, container));
        self.state = SessionState::Detail;
        Ok(())
    }

    /// Tear down the current detail session, joining both activities before
    /// returning. No-op when already in list mode. The caller triggers a
    /// registry refresh afterwards so the list reflects anything that
    /// changed while the detail view was up.
    pub async fn exit_detail(&mut self) {
        if self.state == SessionState::List {
            return;
        }
        self.state = SessionState::LeavingDetail;
        if let Some(mut session) = self.session.take() {
            session.drain().await;
        }
        self.state = SessionState::List;
    }

    /// Dispatch a lifecycle action against a row of the given registry.
    /// The engine call runs on the runtime so the UI stays responsive; the
    /// returned string is the immediate in-flight notice, and completion is
    /// observed through [`SessionManager::poll_action`]. Rejected while not
    /// in list mode or while another action is in flight.
    pub fn dispatch_lifecycle<R>(
        &mut self,
        runtime: &R,
        rt: &Handle,
        registry: &Registry,
        op: LifecycleOp,
        row: usize,
    ) -> String
    where
        R: ContainerRuntime + Clone + Send + Sync + 'static,
    {
        if self.state != SessionState::List {
            return SessionRejected::NotInList.to_string();
        }
        if self.action_rx.is_some() {
            return SessionRejected::ActionInFlight.to_string();
        }
        let handle = match registry.resolve_row(row) {
            Ok(h) => h,
            Err(e) => return e.to_string(),
        };

        let (tx, rx) = oneshot::channel();
        self.action_rx = Some(rx);

        let runtime = runtime.clone();
        let notice = format!("{} {}...", op.progress(), handle.name);
        let _task = rt.spawn(async move {
            let message = match runtime.lifecycle(&handle.id, op).await {
                Ok(()) => format!("{} {}", op.done(), handle.name),
                Err(e) => format!("Error: {}", e),
            };
            let _ = tx.send(message);
        });
        notice
    }

    /// Poll for completion of a dispatched action. Returns the completion
    /// notice once, then clears the in-flight state.
    pub fn poll_action(&mut self) -> Option<String> {
        let rx = self.action_rx.as_mut()?;
        match rx.try_recv() {
            Ok(message) => {
                self.action_rx = None;
                Some(message)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.action_rx = None;
                Some("Error: action ended unexpectedly".to_string())
            }
        }
    }

    /// Flip the filter mode. Only valid from list mode.
    pub fn toggle_filter(&self, current: FilterMode) -> Result<FilterMode, SessionRejected> {
        if self.state != SessionState::List {
            return Err(SessionRejected::NotInList);
        }
        Ok(current.toggled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::registry::FilterMode;
    use crate::runtime::LifecycleOp;
    use crate::testutil::FakeRuntime;

    fn handle_for(id: &str, name: &str) -> ContainerHandle {
        ContainerHandle {
            id: id.to_string(),
            name: name.to_string(),
            short_id: id.chars().take(12).collect(),
        }
    }

    #[tokio::test]
    async fn drain_joins_both_activities_even_with_endless_stream() {
        // The fake's follow stream never ends on its own; only cancellation
        // can stop the log activity.
        let fake = FakeRuntime::new(vec![FakeRuntime::running("aaa", "web")]).endless_follow();
        let mut session = DetailSession::open(fake, &Handle::current(), handle_for("aaa", "web"));

        // Let both tasks actually start before tearing down.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!session.is_terminated());

        session.drain().await;
        assert!(session.is_terminated());
    }

    #[tokio::test]
    async fn drain_tolerates_already_finished_activities() {
        // Finite history, no follow stream: the log activity ends on its own.
        let fake = FakeRuntime::new(vec![FakeRuntime::running("aaa", "web")]);
        let mut session = DetailSession::open(fake, &Handle::current(), handle_for("aaa", "web"));

        // Drain the log channel so the task is not parked on a full buffer.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while !session.log_task.is_finished() && tokio::time::Instant::now() < deadline {
            let _ = session.log_rx.try_recv();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        session.drain().await;
        assert!(session.is_terminated());
    }

    #[tokio::test]
    async fn log_activity_emits_history_then_divider() {
        let fake = FakeRuntime::new(vec![FakeRuntime::running("aaa", "web")]);
        fake.set_log_history("aaa", &["2024-01-01T00:00:00Z hello", "2024-01-01T00:00:01Z world"]);
        let mut session = DetailSession::open(fake, &Handle::current(), handle_for("aaa", "web"));

        let mut lines = Vec::new();
        for _ in 0..4 {
            let line = tokio::time::timeout(Duration::from_secs(1), session.log_rx.recv())
                .await
                .expect("log line within deadline")
                .expect("channel open");
            lines.push(line);
        }
        assert_eq!(lines[0], "Loading last 100 log lines...");
        assert!(lines[1].ends_with("hello"));
        assert!(lines[2].ends_with("world"));
        assert_eq!(lines[3], "--- streaming new logs ---");

        session.drain().await;
    }

    #[tokio::test]
    async fn stats_activity_reports_cpu_and_memory_while_running() {
        let fake = FakeRuntime::new(vec![FakeRuntime::running("aaa", "web")]).endless_follow();
        let mut session = DetailSession::open(fake, &Handle::current(), handle_for("aaa", "web"));

        let line = tokio::time::timeout(Duration::from_secs(1), session.stats_rx.recv())
            .await
            .expect("stats line within deadline")
            .expect("channel open");
        assert!(line.starts_with("CPU: "), "unexpected line: {}", line);
        assert!(line.contains("Memory:"));

        session.drain().await;
    }

    #[tokio::test]
    async fn stats_activity_reports_status_when_not_running() {
        let fake = FakeRuntime::new(vec![FakeRuntime::exited("aaa", "web")]).endless_follow();
        let mut session = DetailSession::open(fake, &Handle::current(), handle_for("aaa", "web"));

        let line = tokio::time::timeout(Duration::from_secs(1), session.stats_rx.recv())
            .await
            .expect("stats line within deadline")
            .expect("channel open");
        assert_eq!(line, "status: exited");

        session.drain().await;
    }

    #[tokio::test]
    async fn enter_detail_rejects_reentry() {
        let fake = FakeRuntime::new(vec![FakeRuntime::running("aaa", "web")]).endless_follow();
        let mut manager = SessionManager::new();
        let rt = Handle::current();

        manager
            .enter_detail(&fake, &rt, handle_for("aaa", "web"))
            .unwrap();
        assert_eq!(*manager.state(), SessionState::Detail);

        let second = manager.enter_detail(&fake, &rt, handle_for("bbb", "db"));
        assert_eq!(second, Err(SessionRejected::AlreadyActive));
        assert_eq!(manager.session_mut().unwrap().container_id, "aaa");

        manager.exit_detail().await;
        assert_eq!(*manager.state(), SessionState::List);
    }

    #[tokio::test]
    async fn exit_detail_is_a_noop_in_list_mode() {
        let mut manager = SessionManager::new();
        manager.exit_detail().await;
        assert_eq!(*manager.state(), SessionState::List);
    }

    #[tokio::test]
    async fn dispatch_reaches_the_engine_and_reports_completion() {
        let fake = FakeRuntime::new(vec![FakeRuntime::running("aaa", "web")]);
        let mut registry = Registry::new();
        registry.refresh(&fake, FilterMode::All).await.unwrap();

        let mut manager = SessionManager::new();
        let notice = manager.dispatch_lifecycle(
            &fake,
            &Handle::current(),
            &registry,
            LifecycleOp::Stop,
            0,
        );
        assert_eq!(notice, "Stopping web...");
        assert!(manager.action_in_progress());

        let mut completion = None;
        for _ in 0..100 {
            if let Some(message) = manager.poll_action() {
                completion = Some(message);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(completion.as_deref(), Some("Stopped web"));
        assert!(!manager.action_in_progress());
        assert_eq!(fake.lifecycle_calls(), vec![("aaa".to_string(), LifecycleOp::Stop)]);
    }

    #[tokio::test]
    async fn dispatch_rejects_unresolvable_row() {
        let fake = FakeRuntime::new(vec![]);
        let mut registry = Registry::new();
        registry.refresh(&fake, FilterMode::All).await.unwrap();

        let mut manager = SessionManager::new();
        let notice = manager.dispatch_lifecycle(
            &fake,
            &Handle::current(),
            &registry,
            LifecycleOp::Start,
            2,
        );
        assert_eq!(notice, "no container at row 2");
        assert!(!manager.action_in_progress());
        assert!(fake.lifecycle_calls().is_empty());
    }

    #[tokio::test]
    async fn dispatch_rejected_while_detail_session_active() {
        let fake = FakeRuntime::new(vec![FakeRuntime::running("aaa", "web")]).endless_follow();
        let mut registry = Registry::new();
        registry.refresh(&fake, FilterMode::All).await.unwrap();

        let mut manager = SessionManager::new();
        let rt = Handle::current();
        manager
            .enter_detail(&fake, &rt, handle_for("aaa", "web"))
            .unwrap();

        let notice =
            manager.dispatch_lifecycle(&fake, &rt, &registry, LifecycleOp::Remove, 0);
        assert_eq!(notice, SessionRejected::NotInList.to_string());
        assert!(fake.lifecycle_calls().is_empty());

        manager.exit_detail().await;
    }

    #[tokio::test]
    async fn toggle_filter_gated_on_list_mode() {
        let fake = FakeRuntime::new(vec![FakeRuntime::running("aaa", "web")]).endless_follow();
        let mut manager = SessionManager::new();
        assert_eq!(
            manager.toggle_filter(FilterMode::All),
            Ok(FilterMode::RunningOnly)
        );

        let rt = Handle::current();
        manager
            .enter_detail(&fake, &rt, handle_for("aaa", "web"))
            .unwrap();
        assert_eq!(
            manager.toggle_filter(FilterMode::All),
            Err(SessionRejected::NotInList)
        );
        manager.exit_detail().await;
    }
}
