use serde_json::json;
use serde_json::Value;

/// A `sessions_list` envelope as returned by the gateway, with the payload
/// wrapped in `result.details`.
pub fn sessions_fixture() -> Value {
    return json!({
        "ok": true,
        "result": {
            "content": [{ "type": "text", "text": "2 sessions" }],
            "details": {
                "count": 2,
                "sessions": [
                    {
                        "key": "agent:main:main",
                        "kind": "main",
                        "displayName": "Jarvis",
                        "updatedAt": 1700000000000u64
                    },
                    {
                        "sessionKey": "agent:researcher:task-7",
                        "kind": "isolated",
                        "label": "paper digest"
                    }
                ]
            }
        }
    });
}

/// A `sessions_history` envelope mixing plain text, content blocks, tool
/// calls and an epoch millisecond timestamp.
pub fn history_fixture() -> Value {
    return json!({
        "ok": true,
        "result": {
            "details": {
                "sessionKey": "agent:main:main",
                "messages": [
                    {
                        "role": "user",
                        "timestamp": "2024-01-02T03:04:05.000Z",
                        "content": "Plot the results"
                    },
                    {
                        "role": "assistant",
                        "timestamp": 1704164645000u64,
                        "content": [
                            { "type": "toolCall", "name": "python", "arguments": {} }
                        ]
                    },
                    {
                        "role": "assistant",
                        "content": [
                            { "type": "text", "text": "Done! MEDIA: chart1.png" },
                            { "type": "image", "source": { "type": "url", "url": "https://example.com/x.png" } }
                        ]
                    }
                ]
            }
        }
    });
}
