use anyhow::Result;
use mockito::Matcher;
use serde_json::json;
use test_utils::history_fixture;
use test_utils::sessions_fixture;

use super::HttpGateway;
use crate::domain::models::AgentKind;
use crate::domain::models::CleanupPolicy;
use crate::domain::models::Gateway;
use crate::domain::models::GatewayError;
use crate::domain::models::MessageContent;
use crate::domain::models::Role;
use crate::domain::models::SpawnRequest;
use crate::domain::services::MessageNormalizer;

impl HttpGateway {
    fn with_url(url: String) -> HttpGateway {
        return HttpGateway::new(&url, "abc");
    }
}

#[tokio::test]
async fn it_lists_sessions() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .match_header("authorization", "Bearer abc")
        .match_body(Matcher::Json(json!({
            "tool": "sessions_list",
            "args": { "limit": 50 }
        })))
        .with_status(200)
        .with_body(sessions_fixture().to_string())
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let sessions = gateway.list_sessions(50).await?;
    mock.assert_async().await;

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].key, "agent:main:main");
    assert_eq!(sessions[0].kind, AgentKind::Main);
    assert_eq!(sessions[0].display_name, Some("Jarvis".to_string()));
    assert_eq!(sessions[1].key, "agent:researcher:task-7");
    assert_eq!(sessions[1].kind, AgentKind::Isolated);
    assert_eq!(sessions[1].display_label(), "paper digest");

    return Ok(());
}

#[tokio::test]
async fn it_reads_results_without_details() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(200)
        .with_body(
            json!({
                "ok": true,
                "result": { "sessions": [{ "key": "agent:ops:main" }] }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let sessions = gateway.list_sessions(50).await?;
    mock.assert_async().await;

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].kind, AgentKind::Unknown);

    return Ok(());
}

#[tokio::test]
async fn it_fetches_history() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .match_body(Matcher::Json(json!({
            "tool": "sessions_history",
            "args": { "sessionKey": "agent:main:main", "limit": 100 }
        })))
        .with_status(200)
        .with_body(history_fixture().to_string())
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let history = gateway.fetch_history("agent:main:main", 100).await?;
    mock.assert_async().await;

    assert_eq!(history.len(), 3);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(
        history[0].content,
        MessageContent::Text("Plot the results".to_string())
    );
    assert_eq!(
        history[1].timestamp,
        Some("2024-01-02T03:04:05.000Z".to_string())
    );

    let messages = MessageNormalizer::normalize_all(&history);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, "Done!");
    assert_eq!(messages[1].media.len(), 2);

    return Ok(());
}

#[tokio::test]
async fn it_sends_messages() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .match_body(Matcher::Json(json!({
            "tool": "sessions_send",
            "args": {
                "sessionKey": "agent:main:main",
                "message": "ping",
                "timeoutSeconds": 30
            }
        })))
        .with_status(200)
        .with_body(json!({ "ok": true, "result": { "details": { "reply": "pong" } } }).to_string())
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let reply = gateway.send("agent:main:main", "ping", 30).await?;
    mock.assert_async().await;

    assert_eq!(reply, Some("pong".to_string()));

    return Ok(());
}

#[tokio::test]
async fn it_accepts_sends_without_a_reply() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(200)
        .with_body(json!({ "ok": true, "result": { "status": "queued" } }).to_string())
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let reply = gateway.send("agent:main:main", "ping", 30).await?;
    mock.assert_async().await;

    assert_eq!(reply, None);

    return Ok(());
}

#[tokio::test]
async fn it_spawns_agents() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .match_body(Matcher::Json(json!({
            "tool": "sessions_spawn",
            "args": {
                "task": "Summarize the inbox",
                "label": "inbox",
                "agentId": "default",
                "cleanup": "delete"
            }
        })))
        .with_status(200)
        .with_body(
            json!({ "ok": true, "result": { "details": { "sessionKey": "agent:default:sub-1" } } })
                .to_string(),
        )
        .create_async()
        .await;

    let mut request = SpawnRequest::new("Summarize the inbox");
    request.label = Some("inbox".to_string());
    request.cleanup = CleanupPolicy::Delete;

    let gateway = HttpGateway::with_url(server.url());
    let res = gateway.spawn(request).await?;
    mock.assert_async().await;

    assert_eq!(res, json!({ "sessionKey": "agent:default:sub-1" }));

    return Ok(());
}

#[tokio::test]
async fn it_reads_status() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .match_body(Matcher::PartialJson(json!({ "tool": "session_status" })))
        .with_status(200)
        .with_body(json!({ "ok": true, "result": { "model": "opus", "tokens": 1200 } }).to_string())
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let res = gateway.status("agent:main:main").await?;
    mock.assert_async().await;

    assert_eq!(res, json!({ "model": "opus", "tokens": 1200 }));

    return Ok(());
}

#[tokio::test]
async fn it_fails_on_unauthorized() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(401)
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let err = gateway.list_sessions(50).await.unwrap_err();
    mock.assert_async().await;

    assert!(matches!(err, GatewayError::Transport(_)));
    assert_eq!(err.to_string(), "Unauthorized: Invalid token");

    return Ok(());
}

#[tokio::test]
async fn it_fails_on_missing_tools() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(404)
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let err = gateway.status("agent:main:main").await.unwrap_err();
    mock.assert_async().await;

    assert_eq!(err.to_string(), "Tool 'session_status' not available");

    return Ok(());
}

#[tokio::test]
async fn it_fails_on_server_errors() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(500)
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let err = gateway.fetch_history("agent:main:main", 100).await.unwrap_err();
    mock.assert_async().await;

    assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");

    return Ok(());
}

#[tokio::test]
async fn it_fails_on_tool_errors() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(200)
        .with_body(json!({ "ok": false, "error": { "message": "Session not found" } }).to_string())
        .expect(2)
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let err = gateway.fetch_history("agent:gone:main", 100).await.unwrap_err();
    assert_eq!(err.to_string(), "Session not found");

    let err = gateway.send("agent:gone:main", "ping", 30).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
    mock.assert_async().await;

    return Ok(());
}

#[tokio::test]
async fn it_falls_back_to_a_generic_tool_error() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(200)
        .with_body(json!({ "ok": false }).to_string())
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let err = gateway.list_sessions(50).await.unwrap_err();
    mock.assert_async().await;

    assert_eq!(err.to_string(), "Tool invocation failed");

    return Ok(());
}

#[tokio::test]
async fn it_rejects_payloads_without_sessions() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(200)
        .with_body(json!({ "ok": true, "result": { "details": { "count": 0 } } }).to_string())
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let err = gateway.list_sessions(50).await.unwrap_err();
    mock.assert_async().await;

    assert!(matches!(err, GatewayError::Protocol(_)));
    assert_eq!(err.to_string(), "Invalid response from Gateway");

    return Ok(());
}

#[tokio::test]
async fn it_rejects_unreadable_envelopes() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(200)
        .with_body("<html>proxy error</html>")
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let err = gateway.list_sessions(50).await.unwrap_err();
    mock.assert_async().await;

    assert!(matches!(err, GatewayError::Protocol(_)));

    return Ok(());
}

#[tokio::test]
async fn it_skips_malformed_sessions() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(200)
        .with_body(
            json!({
                "ok": true,
                "result": {
                    "sessions": [
                        { "label": "no key" },
                        { "key": "agent:ops:main", "kind": "main" }
                    ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let sessions = gateway.list_sessions(50).await?;
    mock.assert_async().await;

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].key, "agent:ops:main");

    return Ok(());
}

#[tokio::test]
async fn it_keeps_history_with_odd_records() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/invoke")
        .with_status(200)
        .with_body(
            json!({
                "ok": true,
                "result": {
                    "messages": [
                        { "role": "user", "content": "hi" },
                        { "role": null, "content": "tool output" },
                        "not a message"
                    ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let gateway = HttpGateway::with_url(server.url());
    let history = gateway.fetch_history("agent:main:main", 100).await?;
    mock.assert_async().await;

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].role, Role::Other("unknown".to_string()));
    assert_eq!(
        history[1].content,
        MessageContent::Text("tool output".to_string())
    );

    return Ok(());
}
