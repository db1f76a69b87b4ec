use std::time::Instant;

use tokio::sync::mpsc::error::TryRecvError;
use tracing::warn;

use crate::session::SessionState;

use super::App;

impl App {
    /// Timer-driven registry refresh, active only in list mode. Detail mode
    /// has its own sampling cadence inside the session.
    pub fn process_tick(&mut self) -> bool {
        if *self.session.state() != SessionState::List {
            return false;
        }
        let now = Instant::now();
        if now.duration_since(self.last_tick) < self.tick_rate {
            return false;
        }
        self.last_tick = now;
        self.refresh_now();
        true
    }

    /// Rebuild the registry snapshot. A failed cycle surfaces a notice and
    /// keeps the previous snapshot; the next tick retries.
    pub fn refresh_now(&mut self) {
        let App { rt, client, registry, filter, .. } = self;
        match rt.block_on(registry.refresh(client, *filter)) {
            Ok(()) => {
                self.ui_state.clamp_to(self.registry.row_count());
            }
            Err(e) => {
                warn!(error = %e, "registry refresh failed");
                self.status_message = Some(format!("Docker error: {}", e));
            }
        }
    }

    /// Drain pending output from the detail session's two activities into
    /// the log view. Called every loop iteration while in detail mode.
    pub fn poll_detail(&mut self) -> bool {
        let Some(session) = self.session.session_mut() else {
            return false;
        };
        let Some(log_state) = self.log_state.as_mut() else {
            return false;
        };

        let mut changed = false;

        // Cap per poll so a log burst cannot stall the loop.
        for _ in 0..100 {
            match session.log_rx.try_recv() {
                Ok(line) => {
                    log_state.push_line(line);
                    changed = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !log_state.stream_ended {
                        log_state.push_line("[log stream ended]".to_string());
                        log_state.stream_ended = true;
                        changed = true;
                    }
                    break;
                }
            }
        }

        // Only the most recent stats readout matters.
        while let Ok(line) = session.stats_rx.try_recv() {
            log_state.stats_line = Some(line);
            changed = true;
        }

        changed
    }
}
