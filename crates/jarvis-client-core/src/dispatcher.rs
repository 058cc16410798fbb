//! Routes inbound envelopes to exactly one session action.

use tracing::debug;

use crate::protocol::{AgentStatus, InboundEnvelope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    /// Clear the pending indicator and append an assistant message.
    AssistantMessage(String),
    /// Clear the pending indicator and append an assistant message with the error marker.
    AssistantError(String),
    Status(AgentStatus),
    Ignore,
}

#[derive(Debug, Clone)]
pub struct ProtocolDispatcher {
    error_marker: String,
}

impl ProtocolDispatcher {
    pub fn new(error_marker: impl Into<String>) -> Self {
        Self {
            error_marker: error_marker.into(),
        }
    }

    #[must_use]
    pub fn error_marker(&self) -> &str {
        &self.error_marker
    }

    #[must_use]
    pub fn dispatch(&self, envelope: InboundEnvelope) -> DispatchAction {
        match envelope {
            InboundEnvelope::Response { content } => DispatchAction::AssistantMessage(content),
            InboundEnvelope::Error { content } => {
                DispatchAction::AssistantError(format!("{}{content}", self.error_marker))
            }
            InboundEnvelope::Status(status) => DispatchAction::Status(status),
            // Reserved by the backend; nothing to show yet.
            InboundEnvelope::Typing => DispatchAction::Ignore,
            InboundEnvelope::Unknown { kind } => {
                debug!(kind = %kind, "ignoring unknown inbound envelope kind");
                DispatchAction::Ignore
            }
        }
    }
}

impl Default for ProtocolDispatcher {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ERROR_MARKER)
    }
}
