#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use std::fmt;

use chrono::SecondsFormat;
use chrono::TimeZone;
use chrono::Utc;
use serde::Deserializer;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    Other(String),
}

impl Default for Role {
    fn default() -> Role {
        return Role::Other("unknown".to_string());
    }
}

impl From<String> for Role {
    fn from(value: String) -> Role {
        return match value.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(value),
        };
    }
}

impl From<Role> for String {
    fn from(role: Role) -> String {
        return role.to_string();
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Other(role) => write!(f, "{role}"),
        };
    }
}

/// A single structured content block. Anything other than text and images,
/// such as tool calls, thinking records or malformed blocks, is kept as
/// `Other` and carries no renderable payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: Value },
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedBlock {
    Text {
        text: String,
    },
    Image {
        #[serde(default)]
        source: Value,
    },
    #[serde(other)]
    Other,
}

impl<'de> serde::Deserialize<'de> for ContentBlock {
    fn deserialize<D>(deserializer: D) -> Result<ContentBlock, D::Error>
    where
        D: Deserializer<'de>,
    {
        // A malformed block degrades to `Other` without failing the array.
        let value = <Value as serde::Deserialize>::deserialize(deserializer)?;
        let block = match serde_json::from_value::<TaggedBlock>(value) {
            Ok(TaggedBlock::Text { text }) => ContentBlock::Text { text },
            Ok(TaggedBlock::Image { source }) => ContentBlock::Image { source },
            Ok(TaggedBlock::Other) | Err(_) => ContentBlock::Other,
        };

        return Ok(block);
    }
}

/// The three payload shapes a gateway message can carry. The shape is decided
/// once while deserializing; anything unrecognised lands in `Unknown`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Object { text: String },
    Unknown(Value),
}

impl Default for MessageContent {
    fn default() -> MessageContent {
        return MessageContent::Unknown(Value::Null);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default, deserialize_with = "deserialize_role")]
    pub role: Role,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub content: MessageContent,
}

impl RawMessage {
    pub fn from_text(role: Role, text: &str, timestamp: Option<String>) -> RawMessage {
        return RawMessage {
            role,
            timestamp,
            content: MessageContent::Text(text.to_string()),
        };
    }
}

pub fn now_timestamp() -> String {
    return Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
}

// Gateways send either ISO-8601 strings or epoch milliseconds.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = <Option<Value> as serde::Deserialize>::deserialize(deserializer)?;
    let res = match value {
        Some(Value::String(timestamp)) => Some(timestamp),
        Some(Value::Number(millis)) => millis
            .as_i64()
            .and_then(|millis| return Utc.timestamp_millis_opt(millis).single())
            .map(|date| return date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        _ => None,
    };

    return Ok(res);
}

// Records without a usable role still carry content worth showing.
fn deserialize_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let value = <Option<Value> as serde::Deserialize>::deserialize(deserializer)?;
    let res = match value {
        Some(Value::String(role)) => Role::from(role),
        _ => Role::default(),
    };

    return Ok(res);
}
