use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::widgets::Block;
use ratatui::widgets::BorderType;
use ratatui::widgets::Borders;
use ratatui::widgets::Padding;

pub struct TextArea {}

impl<'a> TextArea {
    pub fn default() -> tui_textarea::TextArea<'a> {
        let mut textarea = tui_textarea::TextArea::default();
        TextArea::set_focus(&mut textarea, true);

        return textarea;
    }

    pub fn set_focus(textarea: &mut tui_textarea::TextArea<'a>, focused: bool) {
        let mut title = "Message";
        let mut cursor_style = Style::default().add_modifier(Modifier::REVERSED);
        if !focused {
            title = "Message (Tab to focus)";
            cursor_style = Style::default();
        }

        textarea.set_cursor_style(cursor_style);
        textarea.set_block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .title(title)
                .padding(Padding::new(1, 1, 0, 0)),
        );
    }
}
