use ratatui::prelude::Alignment;
use ratatui::prelude::Rect;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Padding;
use ratatui::widgets::Paragraph;
use ratatui::backend::Backend;
use ratatui::Frame;

/// Centered notice rendered in place of an empty pane.
pub struct Placeholder<'a> {
    text: &'a str,
    title: String,
}

impl<'a> Placeholder<'a> {
    pub fn new(title: &str, text: &'a str) -> Placeholder<'a> {
        return Placeholder {
            text,
            title: title.to_string(),
        };
    }

    pub fn render<B: Backend>(&self, frame: &mut Frame<B>, rect: Rect) {
        frame.render_widget(
            Paragraph::new(self.text)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(self.title.to_string())
                        .padding(Padding::new(1, 1, rect.height.saturating_sub(3) / 2, 0)),
                )
                .alignment(Alignment::Center),
            rect,
        );
    }
}
