use std::io;

use crossterm::{cursor::MoveTo, execute, terminal::Clear, terminal::ClearType};

use crate::session::SessionState;
use crate::view::Presenter;

use super::App;

pub fn render(app: &mut App) -> io::Result<()> {
    match app.session.state() {
        SessionState::Detail => {
            if let Some(ref log_state) = app.log_state {
                Presenter::render_detail(log_state)?;
            }
        }
        // Transitioning states are never observable here: both transitions
        // complete within a single input-handling call.
        _ => {
            let mut out = io::stdout();
            execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
            Presenter::render_containers(
                app.registry.snapshot(),
                &app.ui_state,
                app.filter,
                &app.status_message,
            )?;
        }
    }
    Ok(())
}
