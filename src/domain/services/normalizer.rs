#[cfg(test)]
#[path = "normalizer_test.rs"]
mod tests;

use once_cell::sync::Lazy;
use pulldown_cmark::html;
use pulldown_cmark::Event;
use pulldown_cmark::Options;
use pulldown_cmark::Parser;
use regex::Captures;
use regex::Regex;
use serde_json::Value;

use crate::domain::models::ContentBlock;
use crate::domain::models::DisplayMessage;
use crate::domain::models::MediaItem;
use crate::domain::models::MessageContent;
use crate::domain::models::RawMessage;

/// Served location of server generated artifacts referenced by bare filename.
pub const MEDIA_PREFIX: &str = "/media/";

static MEDIA_MARKER: Lazy<Regex> = Lazy::new(|| {
    return Regex::new(r"(?i)\bMEDIA:\s+(\S+\.(?:png|jpe?g|gif|webp))\b").unwrap();
});

static BARE_FILENAME: Lazy<Regex> = Lazy::new(|| {
    return Regex::new(r"(?i)^[\w.\-]+\.(?:png|jpe?g|gif|webp)$").unwrap();
});

static WORD: Lazy<Regex> = Lazy::new(|| {
    return Regex::new(r"\S+").unwrap();
});

pub struct MessageNormalizer {}

impl MessageNormalizer {
    /// Converts a gateway message into its renderable form. Returns `None` for
    /// messages that carry neither text nor media, such as tool calls.
    pub fn normalize(raw: &RawMessage) -> Option<DisplayMessage> {
        let (text, mut media) = MessageNormalizer::extract_content(&raw.content);

        let (text, marked) = extract_marked_media(&text, &mut media);
        let text = extract_bare_media(&text, &marked, &mut media);
        let text = text.trim();

        if text.is_empty() && media.is_empty() {
            tracing::debug!(role = %raw.role, "Dropping message without renderable content");
            return None;
        }

        return Some(DisplayMessage {
            role: raw.role.clone(),
            timestamp: raw.timestamp.clone(),
            text: text.to_string(),
            rendered_text: render_markdown(text),
            media,
        });
    }

    /// Normalizes a full history, dropping messages without content.
    pub fn normalize_all(raw: &[RawMessage]) -> Vec<DisplayMessage> {
        return raw
            .iter()
            .filter_map(|msg| {
                return MessageNormalizer::normalize(msg);
            })
            .collect();
    }

    fn extract_content(content: &MessageContent) -> (String, Vec<MediaItem>) {
        match content {
            MessageContent::Text(text) => {
                return (text.to_string(), vec![]);
            }
            MessageContent::Object { text } => {
                return (text.to_string(), vec![]);
            }
            MessageContent::Blocks(blocks) => {
                let mut text = "".to_string();
                let mut media = vec![];

                for block in blocks {
                    match block {
                        ContentBlock::Text { text: block_text } => {
                            text += block_text;
                            text += "\n";
                        }
                        ContentBlock::Image { source } => {
                            if let Some(url) = image_url(source) {
                                media.push(MediaItem::image(&url));
                            } else {
                                tracing::warn!(source = ?source, "Skipping image block with unknown source");
                            }
                        }
                        ContentBlock::Other => {}
                    }
                }

                return (text, media);
            }
            MessageContent::Unknown(_) => {
                return ("".to_string(), vec![]);
            }
        }
    }
}

/// Removes every `MEDIA: <file>` token from the text, recording each file as
/// media. Returns the remaining text and the consumed filenames.
fn extract_marked_media(text: &str, media: &mut Vec<MediaItem>) -> (String, Vec<String>) {
    let mut marked = vec![];
    let remaining = MEDIA_MARKER.replace_all(text, |caps: &Captures| {
        let filename = &caps[1];
        media.push(MediaItem::image(filename));
        marked.push(filename.to_string());
        return "";
    });

    return (remaining.to_string(), marked);
}

/// Removes standalone image filenames from the text and records them under
/// `MEDIA_PREFIX`. Filenames already taken by the marker pass are removed
/// without being recorded again.
fn extract_bare_media(text: &str, marked: &[String], media: &mut Vec<MediaItem>) -> String {
    let mut remaining = String::with_capacity(text.len());
    let mut last_end = 0;

    for word in WORD.find_iter(text) {
        let filename = word.as_str();
        if !BARE_FILENAME.is_match(filename) {
            continue;
        }

        remaining.push_str(&text[last_end..word.start()]);
        last_end = word.end();

        if marked.iter().any(|e| return e == filename) {
            continue;
        }
        media.push(MediaItem::image(&format!("{MEDIA_PREFIX}{filename}")));
    }
    remaining.push_str(&text[last_end..]);

    return remaining;
}

fn image_url(source: &Value) -> Option<String> {
    match source {
        Value::String(url) if !url.is_empty() => {
            return Some(url.to_string());
        }
        Value::Object(fields) => {
            if let Some(url) = fields.get("url").and_then(|e| return e.as_str()) {
                return Some(url.to_string());
            }

            let media_type = fields.get("media_type").and_then(|e| return e.as_str());
            let data = fields.get("data").and_then(|e| return e.as_str());
            if let (Some(media_type), Some(data)) = (media_type, data) {
                return Some(format!("data:{media_type};base64,{data}"));
            }

            return None;
        }
        _ => {
            return None;
        }
    }
}

/// Renders markdown to HTML. Raw HTML in the source is escaped rather than
/// passed through.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(text, options).map(|event| {
        return match event {
            Event::Html(raw) => Event::Text(raw),
            event => event,
        };
    });

    let mut rendered = String::with_capacity(text.len() * 2);
    html::push_html(&mut rendered, parser);

    return rendered;
}
