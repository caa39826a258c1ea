#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::json;
use serde_json::Value;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Agent;
use crate::domain::models::Gateway;
use crate::domain::models::GatewayError;
use crate::domain::models::GatewayResult;
use crate::domain::models::RawMessage;
use crate::domain::models::SpawnRequest;

// Extra time granted to the HTTP call on top of the agent reply timeout.
const SEND_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ToolRequest<'a> {
    tool: &'a str,
    args: Value,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct ToolError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
struct ToolResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ToolError>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
struct SessionsPayload {
    sessions: Option<Vec<Value>>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
struct HistoryPayload {
    messages: Option<Vec<Value>>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct SendPayload {
    #[serde(default)]
    reply: Option<String>,
}

fn parse_payload<T: serde::de::DeserializeOwned>(tool: &str, payload: Value) -> GatewayResult<T> {
    return serde_json::from_value::<T>(payload).map_err(|err| {
        tracing::warn!(tool, error = %err, "Unexpected tool payload");
        return GatewayError::Protocol(format!("Invalid response from '{tool}': {err}"));
    });
}

/// Parses list items one at a time. A malformed item is skipped so the rest
/// of the list still reaches the user.
fn parse_items<T: serde::de::DeserializeOwned>(tool: &str, items: Vec<Value>) -> Vec<T> {
    return items
        .into_iter()
        .filter_map(|item| {
            let res = serde_json::from_value::<T>(item);
            if let Err(err) = &res {
                tracing::warn!(tool, error = %err, "Skipping malformed item");
            }

            return res.ok();
        })
        .collect();
}

/// Talks to the gateway's `/tools/invoke` endpoint.
pub struct HttpGateway {
    client: reqwest::Client,
    token: String,
    url: String,
}

impl Default for HttpGateway {
    fn default() -> HttpGateway {
        return HttpGateway::new(
            &Config::get(ConfigKey::GatewayURL),
            &Config::get(ConfigKey::GatewayToken),
        );
    }
}

impl HttpGateway {
    pub fn new(url: &str, token: &str) -> HttpGateway {
        return HttpGateway {
            client: reqwest::Client::new(),
            token: token.to_string(),
            url: url.trim_end_matches('/').to_string(),
        };
    }

    #[allow(clippy::implicit_return)]
    async fn invoke(&self, tool: &str, args: Value, timeout: Option<Duration>) -> GatewayResult<Value> {
        tracing::debug!(tool, args = %args, "Invoking tool");

        let mut req = self
            .client
            .post(format!("{url}/tools/invoke", url = self.url))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&ToolRequest { tool, args });
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }

        let res = req.send().await.map_err(|err| {
            tracing::error!(tool, error = ?err, "Gateway is not reachable");
            return GatewayError::from(err);
        })?;

        let status = res.status();
        if !status.is_success() {
            tracing::error!(tool, status = status.as_u16(), "Tool invocation failed");
            let message = match status {
                StatusCode::UNAUTHORIZED => "Unauthorized: Invalid token".to_string(),
                StatusCode::NOT_FOUND => format!("Tool '{tool}' not available"),
                _ => format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            };
            return Err(GatewayError::Transport(message));
        }

        let body = res.json::<ToolResponse>().await.map_err(|err| {
            tracing::warn!(tool, error = ?err, "Gateway returned an unreadable envelope");
            return GatewayError::Protocol(format!("Invalid response from '{tool}': {err}"));
        })?;

        if !body.ok {
            let message = body
                .error
                .and_then(|err| return err.message)
                .filter(|message| return !message.is_empty())
                .unwrap_or_else(|| return "Tool invocation failed".to_string());
            tracing::error!(tool, error = %message, "Tool reported a failure");
            return Err(GatewayError::Transport(message));
        }

        let result = body.result.unwrap_or(Value::Null);
        tracing::debug!(tool, result = %result, "Tool result");

        if let Some(details) = result.get("details").filter(|e| return !e.is_null()) {
            return Ok(details.clone());
        }

        return Ok(result);
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    #[allow(clippy::implicit_return)]
    async fn list_sessions(&self, limit: usize) -> GatewayResult<Vec<Agent>> {
        let payload = self
            .invoke("sessions_list", json!({ "limit": limit }), None)
            .await?;

        let sessions = parse_payload::<SessionsPayload>("sessions_list", payload)?
            .sessions
            .ok_or_else(|| {
                return GatewayError::Protocol("Invalid response from Gateway".to_string());
            })?;

        return Ok(parse_items::<Agent>("sessions_list", sessions));
    }

    #[allow(clippy::implicit_return)]
    async fn fetch_history(&self, session_key: &str, limit: usize) -> GatewayResult<Vec<RawMessage>> {
        let payload = self
            .invoke(
                "sessions_history",
                json!({ "sessionKey": session_key, "limit": limit }),
                None,
            )
            .await?;

        let messages = parse_payload::<HistoryPayload>("sessions_history", payload)?
            .messages
            .ok_or_else(|| {
                return GatewayError::Protocol("Invalid response from Gateway".to_string());
            })?;

        return Ok(parse_items::<RawMessage>("sessions_history", messages));
    }

    #[allow(clippy::implicit_return)]
    async fn send(
        &self,
        session_key: &str,
        text: &str,
        timeout_seconds: u64,
    ) -> GatewayResult<Option<String>> {
        let payload = self
            .invoke(
                "sessions_send",
                json!({
                    "sessionKey": session_key,
                    "message": text,
                    "timeoutSeconds": timeout_seconds,
                }),
                Some(Duration::from_secs(timeout_seconds) + SEND_TIMEOUT_MARGIN),
            )
            .await?;

        if !payload.is_object() {
            return Ok(None);
        }

        let reply = parse_payload::<SendPayload>("sessions_send", payload)?
            .reply
            .filter(|reply| return !reply.is_empty());

        return Ok(reply);
    }

    #[allow(clippy::implicit_return)]
    async fn status(&self, session_key: &str) -> GatewayResult<Value> {
        return self
            .invoke("session_status", json!({ "sessionKey": session_key }), None)
            .await;
    }

    #[allow(clippy::implicit_return)]
    async fn spawn(&self, request: SpawnRequest) -> GatewayResult<Value> {
        let args = serde_json::to_value(&request)
            .map_err(|err| return GatewayError::Protocol(err.to_string()))?;

        return self.invoke("sessions_spawn", args, None).await;
    }
}
