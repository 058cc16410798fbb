//! On-demand backend health panel.

use serde::Serialize;
use tracing::debug;

use crate::connection::ConnectionManager;
use crate::protocol::{AgentStatus, OutboundEnvelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub label: String,
    pub value: String,
    pub tone: Tone,
}

impl StatusRow {
    fn new(label: &str, value: impl Into<String>, tone: Tone) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
            tone,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "rows", rename_all = "snake_case")]
pub enum StatusView {
    #[default]
    Idle,
    Loading,
    Offline(Vec<StatusRow>),
    Snapshot(Vec<StatusRow>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusPanel {
    visible: bool,
    view: StatusView,
}

impl StatusPanel {
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn view(&self) -> &StatusView {
        &self.view
    }

    /// Show the panel and ask the backend for a fresh snapshot when connected.
    pub fn request(&mut self, connection: &mut ConnectionManager) -> bool {
        self.visible = true;
        if connection.is_connected() && connection.send(&OutboundEnvelope::Status) {
            self.view = StatusView::Loading;
        } else {
            debug!(
                state = connection.state().as_str(),
                "status requested while offline"
            );
            self.view = StatusView::Offline(vec![StatusRow::new(
                "Connection",
                "Disconnected",
                Tone::Error,
            )]);
        }
        true
    }

    pub fn on_status(&mut self, status: &AgentStatus) -> bool {
        self.view = StatusView::Snapshot(status_rows(status));
        true
    }

    pub fn close(&mut self) -> bool {
        let was_visible = self.visible;
        self.visible = false;
        was_visible
    }
}

/// One row per present field, in display order.
#[must_use]
pub fn status_rows(status: &AgentStatus) -> Vec<StatusRow> {
    let mut rows = Vec::new();
    if let Some(agent) = &status.agent_name {
        rows.push(StatusRow::new("Agent", agent.clone(), Tone::Neutral));
    }
    if let Some(connected) = status.backend_connected {
        rows.push(if connected {
            StatusRow::new("Backend", "Connected", Tone::Success)
        } else {
            StatusRow::new("Backend", "Disconnected", Tone::Error)
        });
    }
    if let Some(model) = &status.model_name {
        rows.push(StatusRow::new("Model", model.clone(), Tone::Neutral));
    }
    if let Some(available) = status.model_available {
        rows.push(if available {
            StatusRow::new("Model status", "Available", Tone::Success)
        } else {
            StatusRow::new("Model status", "Not found", Tone::Error)
        });
    }
    if let Some(count) = status.tools_count {
        rows.push(StatusRow::new(
            "Tools",
            format!("{count} available"),
            Tone::Neutral,
        ));
    }
    if !status.available_models.is_empty() {
        rows.push(StatusRow::new(
            "Installed models",
            status.available_models.join(", "),
            Tone::Neutral,
        ));
    }
    rows
}
