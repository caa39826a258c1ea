use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::Value;
use strum::EnumVariantNames;

use super::Agent;
use super::RawMessage;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The call failed on the wire, or the gateway answered with a failure.
    #[error("{0}")]
    Transport(String),
    /// The gateway answered successfully but the payload was not the expected
    /// shape.
    #[error("{0}")]
    Protocol(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> GatewayError {
        return GatewayError::Transport(err.to_string());
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumVariantNames, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CleanupPolicy {
    #[default]
    Keep,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRequest {
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_timeout_seconds: Option<u64>,
    pub cleanup: CleanupPolicy,
}

impl SpawnRequest {
    pub fn new(task: &str) -> SpawnRequest {
        return SpawnRequest {
            task: task.to_string(),
            label: None,
            model: None,
            agent_id: "default".to_string(),
            run_timeout_seconds: None,
            cleanup: CleanupPolicy::Keep,
        };
    }
}

#[async_trait]
pub trait Gateway {
    /// Lists the sessions currently known to the gateway, newest snapshot
    /// wins on every call.
    async fn list_sessions(&self, limit: usize) -> GatewayResult<Vec<Agent>>;

    /// Fetches up to `limit` raw messages of a session, oldest first.
    async fn fetch_history(&self, session_key: &str, limit: usize)
        -> GatewayResult<Vec<RawMessage>>;

    /// Sends a message to a session and waits up to `timeout_seconds` for the
    /// agent to reply. A missing reply is not an error.
    async fn send(
        &self,
        session_key: &str,
        text: &str,
        timeout_seconds: u64,
    ) -> GatewayResult<Option<String>>;

    async fn status(&self, session_key: &str) -> GatewayResult<Value>;

    async fn spawn(&self, request: SpawnRequest) -> GatewayResult<Value>;
}
