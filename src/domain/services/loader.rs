#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;

use anyhow::Result;

use super::MessageNormalizer;
use super::Store;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::now_timestamp;
use crate::domain::models::Agent;
use crate::domain::models::Gateway;
use crate::domain::models::RawMessage;
use crate::domain::models::Role;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoaderSettings {
    pub session_limit: usize,
    pub history_limit: usize,
    pub send_timeout: u64,
}

impl LoaderSettings {
    pub fn from_config() -> Result<LoaderSettings> {
        return Ok(LoaderSettings {
            session_limit: Config::get(ConfigKey::SessionLimit).parse::<usize>()?,
            history_limit: Config::get(ConfigKey::HistoryLimit).parse::<usize>()?,
            send_timeout: Config::get(ConfigKey::SendTimeout).parse::<u64>()?,
        });
    }
}

impl Default for LoaderSettings {
    fn default() -> LoaderSettings {
        return LoaderSettings {
            session_limit: 50,
            history_limit: 100,
            send_timeout: 60,
        };
    }
}

/// Replaces the session list with the gateway's latest snapshot.
pub async fn load_sessions(gateway: &dyn Gateway, store: &Store, limit: usize) {
    store.set_loading(true);

    match gateway.list_sessions(limit).await {
        Ok(sessions) => {
            tracing::debug!(count = sessions.len(), "Loaded sessions");
            store.set_sessions(sessions);
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to load sessions");
            store.set_error(Some(format!("Failed to load agents: {err}")));
        }
    }

    store.set_loading(false);
}

pub async fn select_session(gateway: &dyn Gateway, store: &Store, agent: &Agent, limit: usize) {
    store.select_session(agent);
    load_history(gateway, store, &agent.key, limit).await;
}

/// Fetches and normalizes the history of `session_key`. The result is
/// discarded if another session was selected while the fetch was in flight.
pub async fn load_history(gateway: &dyn Gateway, store: &Store, session_key: &str, limit: usize) {
    store.set_loading(true);

    match gateway.fetch_history(session_key, limit).await {
        Ok(raw) => {
            let messages = MessageNormalizer::normalize_all(&raw);
            tracing::debug!(
                session_key,
                raw = raw.len(),
                kept = messages.len(),
                "Loaded history"
            );

            if store.selected_session_key().as_deref() == Some(session_key) {
                store.set_messages(messages);
            } else {
                tracing::debug!(session_key, "Discarding history of a deselected session");
            }
        }
        Err(err) => {
            tracing::error!(session_key, error = %err, "Failed to load history");
            store.set_error(Some(format!("Failed to load history: {err}")));
        }
    }

    store.set_loading(false);
}

/// Echoes the user's message right away, then appends the agent's reply once
/// the gateway answers. The echo stays in place if sending fails.
pub async fn send_message(
    gateway: &dyn Gateway,
    store: &Store,
    session_key: &str,
    text: &str,
    timeout_seconds: u64,
) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    let echo = RawMessage::from_text(Role::User, text, Some(now_timestamp()));
    if let Some(msg) = MessageNormalizer::normalize(&echo) {
        store.append_message(msg);
    }

    match gateway.send(session_key, text, timeout_seconds).await {
        Ok(Some(reply)) => {
            if store.selected_session_key().as_deref() != Some(session_key) {
                tracing::debug!(session_key, "Discarding reply for a deselected session");
                return;
            }

            let raw = RawMessage::from_text(Role::Assistant, &reply, Some(now_timestamp()));
            if let Some(msg) = MessageNormalizer::normalize(&raw) {
                store.append_message(msg);
            }
        }
        Ok(None) => {
            tracing::debug!(session_key, "Gateway returned no reply");
        }
        Err(err) => {
            tracing::error!(session_key, error = %err, "Failed to send message");
            store.set_error(Some(format!("Failed to send message: {err}")));
        }
    }
}
