#[cfg(test)]
#[path = "agent_test.rs"]
mod tests;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_derive::Deserialize;
use serde_derive::Serialize;

static AGENT_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    return HashMap::from([("main", "Jarvis"), ("default", "Default Agent")]);
});

static AGENT_ICONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    return HashMap::from([("main", "😸"), ("jarvis", "😸")]);
});

const KIND_MAIN_ICON: &str = "👑";
const KIND_ISOLATED_ICON: &str = "🤖";
const DEFAULT_ICON: &str = "👤";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentKind {
    Main,
    Isolated,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One addressable session on the gateway. Sessions are replaced wholesale on
/// every refresh, so this is a plain value snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(alias = "sessionKey")]
    pub key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: AgentKind,
}

impl Agent {
    pub fn new(key: &str, kind: AgentKind) -> Agent {
        return Agent {
            key: key.to_string(),
            display_name: None,
            label: None,
            kind,
        };
    }

    pub fn agent_id(&self) -> Option<String> {
        return extract_agent_id(&self.key);
    }

    /// Name shown in lists and headers. Gateway supplied names win over the
    /// name derived from the session key.
    pub fn display_label(&self) -> String {
        if let Some(name) = self.display_name.as_ref().filter(|e| return !e.is_empty()) {
            return name.to_string();
        }
        if let Some(label) = self.label.as_ref().filter(|e| return !e.is_empty()) {
            return label.to_string();
        }

        return friendly_name(self.agent_id().as_deref(), &self.key);
    }

    pub fn icon(&self) -> &'static str {
        return icon_for(self, self.agent_id().as_deref());
    }
}

/// Returns the second `:` delimited segment of a session key, such as `cleo`
/// for `agent:cleo:main-1`.
pub fn extract_agent_id(session_key: &str) -> Option<String> {
    let segments = session_key.split(':').collect::<Vec<&str>>();
    if segments.len() < 2 {
        return None;
    }

    return Some(segments[1].to_string());
}

pub fn friendly_name(agent_id: Option<&str>, fallback_key: &str) -> String {
    let id = match agent_id {
        Some(id) if !id.is_empty() => id,
        _ => return fallback_key.to_string(),
    };

    if let Some(name) = AGENT_NAMES.get(id) {
        return name.to_string();
    }

    let mut chars = id.chars();
    return match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => fallback_key.to_string(),
    };
}

pub fn icon_for(agent: &Agent, agent_id: Option<&str>) -> &'static str {
    if let Some(icon) = agent_id.and_then(|id| return AGENT_ICONS.get(id)) {
        return *icon;
    }

    return match agent.kind {
        AgentKind::Main => KIND_MAIN_ICON,
        AgentKind::Isolated => KIND_ISOLATED_ICON,
        AgentKind::Unknown => DEFAULT_ICON,
    };
}
