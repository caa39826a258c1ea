#[cfg(test)]
#[path = "display_message_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Local;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Role;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub url: String,
}

impl MediaItem {
    pub fn image(url: &str) -> MediaItem {
        return MediaItem {
            kind: MediaKind::Image,
            url: url.to_string(),
        };
    }
}

/// Canonical form of a gateway message. `text` is the markdown source left
/// after media extraction, `rendered_text` is its HTML rendering. Never empty
/// in both `text` and `media`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub role: Role,
    pub timestamp: Option<String>,
    pub text: String,
    pub rendered_text: String,
    pub media: Vec<MediaItem>,
}

impl DisplayMessage {
    /// Local wall clock time of the message, or an empty string when the
    /// timestamp is absent or unparsable.
    pub fn formatted_time(&self) -> String {
        return self
            .timestamp
            .as_ref()
            .and_then(|timestamp| return DateTime::parse_from_rfc3339(timestamp).ok())
            .map(|date| return date.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_default();
    }

    pub fn as_string_lines(&self, line_max_width: usize) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();

        for full_line in self.text.replace('\t', "  ").split('\n') {
            if full_line.trim().is_empty() {
                lines.push(" ".to_string());
                continue;
            }

            let mut char_count = 0;
            let mut current_lines: Vec<&str> = vec![];

            for word in full_line.split(' ') {
                let word_len = word.chars().count();
                if !current_lines.is_empty() && word_len + char_count + 1 > line_max_width {
                    lines.push(current_lines.join(" ").trim_end().to_string());
                    current_lines = vec![word];
                    char_count = word_len + 1;
                } else {
                    current_lines.push(word);
                    char_count += word_len + 1;
                }
            }
            if !current_lines.is_empty() {
                lines.push(current_lines.join(" ").trim_end().to_string());
            }
        }

        if self.text.is_empty() {
            lines.clear();
        }

        for media in self.media.iter() {
            lines.push(format!("[image] {}", media.url));
        }

        return lines;
    }
}
