//! Wire envelopes exchanged with the agent backend over `/ws`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Envelope sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEnvelope {
    Message { content: String },
    Clear,
    Status,
}

impl OutboundEnvelope {
    /// User text message; `None` when the text is blank.
    pub fn message(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self::Message {
            content: trimmed.to_string(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Clear => "clear",
            Self::Status => "status",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Health snapshot reported by the backend. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    #[serde(rename = "agent", default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(
        rename = "ollama_connected",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub backend_connected: Option<bool>,
    #[serde(rename = "model", default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_count: Option<u64>,
    #[serde(default)]
    pub available_models: Vec<String>,
}

/// Envelope received from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEnvelope {
    Response { content: String },
    Error { content: String },
    Status(AgentStatus),
    Typing,
    /// A kind this client does not know yet.
    Unknown { kind: String },
}

impl InboundEnvelope {
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Response { .. } => "response",
            Self::Error { .. } => "error",
            Self::Status(_) => "status",
            Self::Typing => "typing",
            Self::Unknown { kind } => kind.as_str(),
        }
    }
}

/// Decode one inbound text frame.
pub fn parse_inbound(text: &str) -> Result<InboundEnvelope, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .ok_or(ProtocolError::MissingKind)?;

    match kind {
        "response" => Ok(InboundEnvelope::Response {
            content: text_content(kind, object.get("content"))?,
        }),
        "error" => Ok(InboundEnvelope::Error {
            content: text_content(kind, object.get("content"))?,
        }),
        "status" => {
            let content = object
                .get("content")
                .cloned()
                .ok_or_else(|| invalid(kind, "missing content"))?;
            let status: AgentStatus = serde_json::from_value(content)
                .map_err(|error| invalid(kind, &error.to_string()))?;
            Ok(InboundEnvelope::Status(status))
        }
        "typing" => Ok(InboundEnvelope::Typing),
        other => Ok(InboundEnvelope::Unknown {
            kind: other.to_string(),
        }),
    }
}

fn text_content(kind: &str, content: Option<&Value>) -> Result<String, ProtocolError> {
    match content {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Null) | None => Err(invalid(kind, "missing content")),
        Some(_) => Err(invalid(kind, "content must be a string")),
    }
}

fn invalid(kind: &str, reason: &str) -> ProtocolError {
    ProtocolError::InvalidContent {
        kind: kind.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AgentStatus, InboundEnvelope, OutboundEnvelope, parse_inbound};
    use crate::error::ProtocolError;

    #[test]
    fn outbound_envelopes_match_wire_shape() -> Result<(), serde_json::Error> {
        let message = OutboundEnvelope::message("  abrir o navegador  ");
        assert_eq!(
            message.as_ref().map(OutboundEnvelope::to_json).transpose()?,
            Some(r#"{"type":"message","content":"abrir o navegador"}"#.to_string())
        );
        assert_eq!(OutboundEnvelope::Clear.to_json()?, r#"{"type":"clear"}"#);
        assert_eq!(OutboundEnvelope::Status.to_json()?, r#"{"type":"status"}"#);
        Ok(())
    }

    #[test]
    fn blank_message_is_not_an_envelope() {
        assert_eq!(OutboundEnvelope::message(""), None);
        assert_eq!(OutboundEnvelope::message(" \n\t "), None);
    }

    #[test]
    fn outbound_kind_is_never_empty() {
        for envelope in [
            OutboundEnvelope::Message {
                content: "oi".to_string(),
            },
            OutboundEnvelope::Clear,
            OutboundEnvelope::Status,
        ] {
            assert!(!envelope.kind().is_empty());
        }
    }

    #[test]
    fn parse_known_inbound_kinds() -> Result<(), ProtocolError> {
        assert_eq!(
            parse_inbound(r#"{"type":"response","content":"Olá"}"#)?,
            InboundEnvelope::Response {
                content: "Olá".to_string()
            }
        );
        assert_eq!(
            parse_inbound(r#"{"type":"error","content":"timeout"}"#)?,
            InboundEnvelope::Error {
                content: "timeout".to_string()
            }
        );
        assert_eq!(parse_inbound(r#"{"type":"typing"}"#)?, InboundEnvelope::Typing);

        let status = json!({
            "type": "status",
            "content": {
                "agent": "JARVIS",
                "ollama_connected": true,
                "model": "llama3.1:8b",
                "model_available": false,
                "tools_count": 42,
                "available_models": ["llama3.1:8b", "qwen2.5:7b"]
            }
        });
        assert_eq!(
            parse_inbound(&status.to_string())?,
            InboundEnvelope::Status(AgentStatus {
                agent_name: Some("JARVIS".to_string()),
                backend_connected: Some(true),
                model_name: Some("llama3.1:8b".to_string()),
                model_available: Some(false),
                tools_count: Some(42),
                available_models: vec!["llama3.1:8b".to_string(), "qwen2.5:7b".to_string()],
            })
        );
        Ok(())
    }

    #[test]
    fn status_with_missing_fields_still_parses() -> Result<(), ProtocolError> {
        let parsed = parse_inbound(r#"{"type":"status","content":{"agent":"JARVIS"}}"#)?;
        let InboundEnvelope::Status(status) = parsed else {
            panic!("expected status envelope, got {parsed:?}");
        };
        assert_eq!(status.agent_name.as_deref(), Some("JARVIS"));
        assert_eq!(status.backend_connected, None);
        assert!(status.available_models.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_kind_is_preserved_not_rejected() -> Result<(), ProtocolError> {
        let parsed = parse_inbound(r#"{"type":"unknown_future_kind","content":{"x":1}}"#)?;
        assert_eq!(
            parsed,
            InboundEnvelope::Unknown {
                kind: "unknown_future_kind".to_string()
            }
        );
        assert_eq!(parsed.kind(), "unknown_future_kind");
        Ok(())
    }

    #[test]
    fn malformed_frames_are_errors() {
        struct Case {
            name: &'static str,
            input: &'static str,
            expected_error_fragment: &'static str,
        }

        let cases = vec![
            Case {
                name: "not json",
                input: "{type: response",
                expected_error_fragment: "malformed JSON frame",
            },
            Case {
                name: "array payload",
                input: r#"["response","hi"]"#,
                expected_error_fragment: "expected JSON object envelope",
            },
            Case {
                name: "missing type",
                input: r#"{"content":"hi"}"#,
                expected_error_fragment: "missing envelope type",
            },
            Case {
                name: "empty type",
                input: r#"{"type":"  ","content":"hi"}"#,
                expected_error_fragment: "missing envelope type",
            },
            Case {
                name: "response without content",
                input: r#"{"type":"response"}"#,
                expected_error_fragment: "invalid response envelope: missing content",
            },
            Case {
                name: "error with object content",
                input: r#"{"type":"error","content":{"message":"x"}}"#,
                expected_error_fragment: "invalid error envelope: content must be a string",
            },
            Case {
                name: "status with wrong field type",
                input: r#"{"type":"status","content":{"tools_count":"many"}}"#,
                expected_error_fragment: "invalid status envelope",
            },
        ];

        for case in cases {
            let result = parse_inbound(case.input);
            match result {
                Ok(envelope) => panic!("{}: expected an error, got {envelope:?}", case.name),
                Err(error) => {
                    let rendered = error.to_string();
                    assert!(
                        rendered.contains(case.expected_error_fragment),
                        "{}: expected error fragment '{}' in '{}'",
                        case.name,
                        case.expected_error_fragment,
                        rendered
                    );
                }
            }
        }
    }
}
