#[cfg(test)]
#[path = "app_state_test.rs"]
mod tests;

use std::time::Duration;
use std::time::Instant;

use ratatui::prelude::Rect;

use super::ApplicationState;
use super::ChatList;
use super::Scroll;
use crate::domain::models::Agent;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Sessions,
    Input,
}

/// View-local state layered over the latest Store snapshot: focus, the
/// session cursor, chat scrolling and the error toast timer.
#[derive(Default)]
pub struct AppState {
    pub chat_list: ChatList,
    pub error_since: Option<Instant>,
    pub focus: Focus,
    pub last_known_height: u16,
    pub last_known_width: u16,
    pub scroll: Scroll,
    pub session_cursor: usize,
    pub state: ApplicationState,
}

impl AppState {
    pub fn sync(&mut self, state: ApplicationState, now: Instant) {
        if state.last_error != self.state.last_error {
            self.error_since = state.last_error.as_ref().map(|_| return now);
        }

        let messages_changed = state.messages != self.state.messages;
        self.state = state;

        let sessions_len = self.state.sessions.len();
        if sessions_len == 0 {
            self.session_cursor = 0;
        } else if self.session_cursor >= sessions_len {
            self.session_cursor = sessions_len - 1;
        }

        if messages_changed {
            self.sync_dependants();
            self.scroll.last();
        }
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.last_known_width = rect.width;
        self.last_known_height = rect.height;

        let pinned = self.scroll.is_at_bottom();
        self.sync_dependants();
        if pinned {
            self.scroll.last();
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Sessions => Focus::Input,
            Focus::Input => Focus::Sessions,
        };
    }

    pub fn cursor_up(&mut self) {
        self.session_cursor = self.session_cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        if self.session_cursor + 1 < self.state.sessions.len() {
            self.session_cursor += 1;
        }
    }

    pub fn cursor_session(&self) -> Option<&Agent> {
        return self.state.sessions.get(self.session_cursor);
    }

    /// Header for the chat pane. A selection missing from the latest session
    /// list falls back to its raw key.
    pub fn selected_label(&self) -> Option<String> {
        if let Some(agent) = self.state.selected_session() {
            return Some(format!("{} {}", agent.icon(), agent.display_label()));
        }

        return self.state.selected_session_key.clone();
    }

    pub fn error_expired(&self, now: Instant, lifetime: Duration) -> bool {
        return match self.error_since {
            Some(since) => now.saturating_duration_since(since) >= lifetime,
            None => false,
        };
    }

    fn sync_dependants(&mut self) {
        self.chat_list
            .set_messages(&self.state.messages, self.last_known_width as usize);

        self.scroll
            .set_state(self.chat_list.len() as u16, self.last_known_height);
    }
}
