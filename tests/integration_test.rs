//! Integration tests over the public API: model/registry types, the metrics
//! calculator, and the view helpers work together as exported.

use contop::metrics::{self, CpuCounters, RawStatsPair};
use contop::model::{ContainerUIState, LogViewState};
use contop::registry::{ContainerStatus, FilterMode, RegistrySnapshot, RollupCounts, PLACEHOLDER};
use contop::session::{SessionManager, SessionState};
use contop::view::{Presenter, safe_truncate, truncate_str};

#[test]
fn model_types_construct() {
    let _ = ContainerUIState::default();
    let state = LogViewState::new("cid".into(), "cname".into());
    assert!(state.auto_follow);
    assert!(state.stats_line.is_none());
}

#[test]
fn filter_mode_round_trips() {
    assert_eq!(FilterMode::All.toggled(), FilterMode::RunningOnly);
    assert_eq!(FilterMode::RunningOnly.toggled(), FilterMode::All);
    assert!(FilterMode::All.include_stopped());
    assert!(!FilterMode::RunningOnly.include_stopped());
    assert_eq!(FilterMode::RunningOnly.label(), "running only");
}

#[test]
fn container_status_labels() {
    assert!(ContainerStatus::parse("running").is_running());
    assert_eq!(ContainerStatus::parse("exited").label(), "■ exited");
    assert_eq!(ContainerStatus::parse("weird").label(), "○ weird");
}

#[test]
fn empty_registry_snapshot_defaults() {
    let snap = RegistrySnapshot::default();
    assert!(snap.rows.is_empty());
    assert_eq!(snap.counts, RollupCounts::default());
    assert_eq!(PLACEHOLDER, "-");
}

#[test]
fn session_manager_starts_in_list_mode() {
    let manager = SessionManager::new();
    assert_eq!(*manager.state(), SessionState::List);
    assert!(!manager.action_in_progress());
}

#[test]
fn metrics_are_pure_and_deterministic() {
    let pair = RawStatsPair {
        current: CpuCounters { total_usage: 500_000_000, system_usage: 10_000_000_000 },
        previous: CpuCounters::default(),
        num_cores: 4,
    };
    let pct = metrics::compute_cpu_percent(&pair);
    assert!((pct - 20.0).abs() < 1e-9);
    assert_eq!(metrics::format_bytes(1_073_741_824), "1.00GB");
    assert_eq!(metrics::compute_memory(50, 0).percent, None);
    assert_eq!(metrics::format_uptime(0, 90_061), "1d1h");
}

#[test]
fn view_helpers_pure() {
    assert_eq!(truncate_str("hello", 5), "hello");
    assert_eq!(truncate_str("hello world", 8), "hello...");
    let s = "café";
    assert_eq!(safe_truncate(s, 10), "café");
}

#[test]
fn presenter_render_size_guard_checks_terminal() {
    // Headless environments have no tty, so terminal::size() may fail.
    // The outcome depends on whether a real terminal is attached, so only
    // verify the call itself.
    let _result = Presenter::render_size_guard();
}
