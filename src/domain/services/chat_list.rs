#[cfg(test)]
#[path = "chat_list_test.rs"]
mod tests;

use ratatui::prelude::Rect;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Paragraph;
use ratatui::backend::Backend;
use ratatui::Frame;

use crate::domain::models::DisplayMessage;
use crate::domain::models::Role;

// Left border plus padding, and the scrollbar column.
const BORDER_ELEMENTS_LENGTH: usize = 3;

struct ChatCacheEntry {
    message: DisplayMessage,
    lines: Vec<Line<'static>>,
}

/// Renders the selected session's messages as wrapped terminal lines, caching
/// each message's lines until it changes or the width does.
#[derive(Default)]
pub struct ChatList {
    cache: Vec<ChatCacheEntry>,
    line_width: usize,
    lines_len: usize,
}

fn role_style(role: &Role) -> Style {
    let colour = match role {
        Role::User => Color::Green,
        Role::Assistant => Color::Cyan,
        Role::Other(_) => Color::Gray,
    };

    return Style::default().fg(colour).add_modifier(Modifier::BOLD);
}

fn message_lines(message: &DisplayMessage, line_width: usize) -> Vec<Line<'static>> {
    let style = role_style(&message.role);
    let mut header = vec![Span::styled(message.role.to_string(), style)];
    let time = message.formatted_time();
    if !time.is_empty() {
        header.push(Span::styled(
            format!(" {time}"),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let max_line_length = line_width.saturating_sub(BORDER_ELEMENTS_LENGTH).max(1);
    let mut lines = vec![Line::from(header)];
    for text in message.as_string_lines(max_line_length) {
        lines.push(Line::from(vec![
            Span::styled("│ ", style),
            Span::from(text),
        ]));
    }
    lines.push(Line::from(""));

    return lines;
}

impl ChatList {
    pub fn set_messages(&mut self, messages: &[DisplayMessage], line_width: usize) {
        if self.line_width != line_width {
            self.cache.clear();
            self.line_width = line_width;
        }

        self.cache.truncate(messages.len());
        for (idx, message) in messages.iter().enumerate() {
            if let Some(entry) = self.cache.get(idx) {
                if &entry.message == message {
                    continue;
                }
            }

            let entry = ChatCacheEntry {
                message: message.clone(),
                lines: message_lines(message, line_width),
            };
            if idx < self.cache.len() {
                self.cache[idx] = entry;
            } else {
                self.cache.push(entry);
            }
        }

        self.lines_len = self.cache.iter().map(|e| return e.lines.len()).sum();
    }

    pub fn len(&self) -> usize {
        return self.lines_len;
    }

    pub fn is_empty(&self) -> bool {
        return self.cache.is_empty();
    }

    pub fn render<B: Backend>(&self, frame: &mut Frame<B>, rect: Rect, scroll: u16) {
        let lines: Vec<Line<'static>> = self
            .cache
            .iter()
            .flat_map(|entry| {
                return entry.lines.to_owned();
            })
            .collect();

        frame.render_widget(
            Paragraph::new(lines)
                .block(Block::default())
                .scroll((scroll, 0)),
            rect,
        );
    }
}
