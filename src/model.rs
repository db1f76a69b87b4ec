//! UI-side state owned by the app loop, kept separate from the registry's
//! data model and from any widget.

use std::collections::VecDeque;

/// Cursor state for the container table.
#[derive(Default)]
pub struct ContainerUIState {
    pub selected_index: usize,
    pub total_rows: usize,
}

impl ContainerUIState {
    /// Keep the cursor on a valid row after the table shrinks.
    pub fn clamp_to(&mut self, total_rows: usize) {
        self.total_rows = total_rows;
        if self.selected_index >= total_rows && total_rows > 0 {
            self.selected_index = total_rows - 1;
        }
    }
}

// --- Detail viewer state ---

pub struct LogViewState {
    pub container_id: String,
    pub container_name: String,
    /// Latest formatted stats readout, None until the first sample lands.
    pub stats_line: Option<String>,
    pub lines: VecDeque<String>,
    pub scroll_offset: usize, // 0 = at bottom (following)
    pub auto_follow: bool,
    pub search_mode: bool,    // true when typing a search query
    pub search_query: String, // current search text
    pub stream_ended: bool,
}

impl LogViewState {
    pub fn new(container_id: String, container_name: String) -> Self {
        Self {
            container_id,
            container_name,
            stats_line: None,
            lines: VecDeque::with_capacity(5000),
            scroll_offset: 0,
            auto_follow: true,
            search_mode: false,
            search_query: String::new(),
            stream_ended: false,
        }
    }

    pub fn push_line(&mut self, line: String) {
        if self.lines.len() >= 5000 {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_view_state_push_line_caps_at_5000() {
        let mut state = LogViewState::new("abc123".into(), "my-container".into());
        for i in 0..5010 {
            state.push_line(format!("line {}", i));
        }
        assert_eq!(state.lines.len(), 5000);
        assert_eq!(state.lines.front(), Some(&"line 10".to_string()));
        assert_eq!(state.lines.back(), Some(&"line 5009".to_string()));
    }

    #[test]
    fn container_ui_state_clamps_cursor() {
        let mut state = ContainerUIState::default();
        state.selected_index = 5;
        state.clamp_to(3);
        assert_eq!(state.selected_index, 2);
        state.clamp_to(0);
        assert_eq!(state.selected_index, 2); // nothing to clamp onto
        assert_eq!(state.total_rows, 0);
    }
}
