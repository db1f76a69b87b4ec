use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::LogViewState;
use crate::runtime::LifecycleOp;
use crate::session::SessionState;

use super::App;

/// Result of handling a key: Quit the app, or key was consumed (needs render).
/// None means the key was not handled.
pub enum InputResult {
    Quit,
    Consumed,
}

/// Handle a key event. Returns Some(Quit) to exit, Some(Consumed) if key was
/// handled and a render is needed, None if the key was not handled.
pub fn handle_key(app: &mut App, key_event: KeyEvent) -> Option<InputResult> {
    let KeyEvent { code, modifiers, .. } = key_event;

    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Some(InputResult::Quit);
    }

    match app.session.state() {
        SessionState::Detail => handle_detail(app, code),
        _ => handle_list(app, code),
    }
}

fn handle_list(app: &mut App, code: KeyCode) -> Option<InputResult> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(InputResult::Quit),
        KeyCode::Up => {
            if app.ui_state.selected_index > 0 {
                app.ui_state.selected_index -= 1;
                app.status_message = None;
                return Some(InputResult::Consumed);
            }
        }
        KeyCode::Down => {
            if app.ui_state.selected_index + 1 < app.registry.row_count() {
                app.ui_state.selected_index += 1;
                app.status_message = None;
                return Some(InputResult::Consumed);
            }
        }
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => {
            open_detail(app);
            return Some(InputResult::Consumed);
        }
        KeyCode::Char('t') => return Some(dispatch(app, LifecycleOp::Start)),
        KeyCode::Char('s') => return Some(dispatch(app, LifecycleOp::Stop)),
        KeyCode::Char('r') => return Some(dispatch(app, LifecycleOp::Restart)),
        KeyCode::Char('d') => return Some(dispatch(app, LifecycleOp::Remove)),
        KeyCode::Char('f') => {
            match app.session.toggle_filter(app.filter) {
                Ok(flipped) => {
                    app.filter = flipped;
                    app.status_message = Some(format!("Showing: {}", flipped.label()));
                    app.refresh_now();
                }
                Err(rejected) => {
                    app.status_message = Some(rejected.to_string());
                }
            }
            return Some(InputResult::Consumed);
        }
        _ => {}
    }
    None
}

fn open_detail(app: &mut App) {
    let handle = match app.registry.resolve_row(app.ui_state.selected_index) {
        Ok(h) => h,
        Err(e) => {
            app.status_message = Some(e.to_string());
            return;
        }
    };

    let log_state = LogViewState::new(handle.short_id.clone(), handle.name.clone());
    let rt_handle = app.rt.handle().clone();
    match app.session.enter_detail(&app.client, &rt_handle, handle) {
        Ok(()) => {
            app.log_state = Some(log_state);
            app.status_message = None;
        }
        Err(rejected) => {
            app.status_message = Some(rejected.to_string());
        }
    }
}

fn dispatch(app: &mut App, op: LifecycleOp) -> InputResult {
    let rt_handle = app.rt.handle().clone();
    let notice = app.session.dispatch_lifecycle(
        &app.client,
        &rt_handle,
        &app.registry,
        op,
        app.ui_state.selected_index,
    );
    // The next timer tick reconciles the table; a completed action does not
    // force an immediate refresh.
    app.status_message = Some(notice);
    InputResult::Consumed
}

fn handle_detail(app: &mut App, code: KeyCode) -> Option<InputResult> {
    let page_size = crossterm::terminal::size()
        .map(|(_, h)| h as usize)
        .unwrap_or(24)
        .saturating_sub(5);

    if app.log_state.as_ref().is_some_and(|s| s.search_mode) {
        return match code {
            KeyCode::Enter => {
                if let Some(ref mut log_state) = app.log_state {
                    log_state.search_mode = false;
                }
                Some(InputResult::Consumed)
            }
            KeyCode::Esc => {
                if let Some(ref mut log_state) = app.log_state {
                    log_state.search_mode = false;
                    log_state.search_query.clear();
                }
                Some(InputResult::Consumed)
            }
            KeyCode::Backspace => {
                if let Some(ref mut log_state) = app.log_state {
                    log_state.search_query.pop();
                }
                Some(InputResult::Consumed)
            }
            KeyCode::Char(c) => {
                if let Some(ref mut log_state) = app.log_state {
                    log_state.search_query.push(c);
                }
                Some(InputResult::Consumed)
            }
            _ => None,
        };
    }

    match code {
        KeyCode::Char('q') | KeyCode::Esc => {
            // Join both activities before the list comes back, then refresh
            // so the table reflects anything that changed meanwhile.
            let rt = std::sync::Arc::clone(&app.rt);
            rt.block_on(app.session.exit_detail());
            app.log_state = None;
            app.status_message = None;
            app.refresh_now();
            Some(InputResult::Consumed)
        }
        KeyCode::Up => {
            if let Some(ref mut log_state) = app.log_state {
                log_state.auto_follow = false;
                let max_offset = log_state.lines.len().saturating_sub(1);
                if log_state.scroll_offset < max_offset {
                    log_state.scroll_offset += 1;
                }
            }
            Some(InputResult::Consumed)
        }
        KeyCode::Down => {
            if let Some(ref mut log_state) = app.log_state {
                if log_state.scroll_offset > 0 {
                    log_state.scroll_offset -= 1;
                    if log_state.scroll_offset == 0 {
                        log_state.auto_follow = true;
                    }
                }
            }
            Some(InputResult::Consumed)
        }
        KeyCode::Char('f') | KeyCode::End => {
            if let Some(ref mut log_state) = app.log_state {
                log_state.auto_follow = true;
                log_state.scroll_offset = 0;
            }
            Some(InputResult::Consumed)
        }
        KeyCode::Char('/') => {
            if let Some(ref mut log_state) = app.log_state {
                log_state.search_mode = true;
                log_state.search_query.clear();
            }
            Some(InputResult::Consumed)
        }
        KeyCode::Char('n') => {
            if let Some(ref mut log_state) = app.log_state {
                log_state.search_query.clear();
            }
            Some(InputResult::Consumed)
        }
        KeyCode::PageUp => {
            if let Some(ref mut log_state) = app.log_state {
                log_state.auto_follow = false;
                let max_offset = log_state.lines.len().saturating_sub(1);
                log_state.scroll_offset = (log_state.scroll_offset + page_size).min(max_offset);
            }
            Some(InputResult::Consumed)
        }
        KeyCode::PageDown => {
            if let Some(ref mut log_state) = app.log_state {
                if log_state.scroll_offset > page_size {
                    log_state.scroll_offset -= page_size;
                } else {
                    log_state.scroll_offset = 0;
                    log_state.auto_follow = true;
                }
            }
            Some(InputResult::Consumed)
        }
        _ => None,
    }
}
