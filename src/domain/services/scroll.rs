#[cfg(test)]
#[path = "scroll_test.rs"]
mod tests;

use ratatui::widgets::ScrollbarState;

/// Line offset into the chat pane. Positions are clamped so the last page is
/// always full when there is more content than fits the viewport.
#[derive(Default)]
pub struct Scroll {
    list_length: u16,
    viewport_length: u16,
    pub position: u16,
    pub scrollbar_state: ScrollbarState,
}

impl Scroll {
    fn max_position(&self) -> u16 {
        return self.list_length.saturating_sub(self.viewport_length);
    }

    fn page_length(&self) -> u16 {
        return self.viewport_length.saturating_sub(1).max(1);
    }

    fn set_position(&mut self, position: u16) {
        self.position = position.min(self.max_position());
        self.scrollbar_state = self.scrollbar_state.position(self.position);
    }

    pub fn up(&mut self) {
        self.set_position(self.position.saturating_sub(1));
    }

    pub fn up_page(&mut self) {
        self.set_position(self.position.saturating_sub(self.page_length()));
    }

    pub fn down(&mut self) {
        self.set_position(self.position.saturating_add(1));
    }

    pub fn down_page(&mut self) {
        self.set_position(self.position.saturating_add(self.page_length()));
    }

    pub fn last(&mut self) {
        self.set_position(self.max_position());
    }

    pub fn is_at_bottom(&self) -> bool {
        return self.position >= self.max_position();
    }

    pub fn set_state(&mut self, list_length: u16, viewport_length: u16) {
        self.list_length = list_length;
        self.viewport_length = viewport_length;
        self.scrollbar_state = self
            .scrollbar_state
            .content_length(self.max_position())
            .viewport_content_length(viewport_length);
        self.set_position(self.position);
    }
}
