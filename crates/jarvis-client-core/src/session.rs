//! Composition root for one chat page.
//!
//! `ChatSession` is a reducer over typed display state. Every handler returns
//! `true` when something a host renders has changed, so hosts can re-render
//! lazily without the session touching any display surface.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::connection::{
    Channel, ChannelEvent, ChannelId, ConnectionManager, ConnectionSnapshot,
    ConnectivityIndicator, ReconnectPolicy, Timer, TimerToken,
};
use crate::dispatcher::{DispatchAction, ProtocolDispatcher};
use crate::protocol::{OutboundEnvelope, parse_inbound};
use crate::render::{Fragment, MessageRenderer};
use crate::status_panel::StatusPanel;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Collaborators injected by the host.
pub struct SessionDeps {
    pub channel: Box<dyn Channel>,
    pub timer: Box<dyn Timer>,
    pub clock: Box<dyn Clock>,
    pub renderer: MessageRenderer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayMessage {
    pub role: Role,
    pub text: String,
    pub fragments: Vec<Fragment>,
    pub timestamp: DateTime<Utc>,
}

/// User-originated events, as delivered by a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Submit(String),
    Clear,
    RequestStatus,
    CloseStatus,
    Retry,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub connection: ConnectionSnapshot,
    pub indicator: ConnectivityIndicator,
    pub indicator_label: String,
    pub messages: Vec<DisplayMessage>,
    pub typing_pending: bool,
    pub welcome_visible: bool,
    pub status_panel: StatusPanel,
}

pub struct ChatSession {
    connection: ConnectionManager,
    dispatcher: ProtocolDispatcher,
    renderer: MessageRenderer,
    clock: Box<dyn Clock>,
    messages: Vec<DisplayMessage>,
    typing_pending: bool,
    welcome_visible: bool,
    status_panel: StatusPanel,
}

impl ChatSession {
    pub fn new(config: &ClientConfig, url: impl Into<String>, deps: SessionDeps) -> Self {
        let SessionDeps {
            channel,
            timer,
            clock,
            renderer,
        } = deps;
        Self {
            connection: ConnectionManager::new(url, ReconnectPolicy::from(config), channel, timer),
            dispatcher: ProtocolDispatcher::new(config.error_marker.clone()),
            renderer,
            clock,
            messages: Vec::new(),
            typing_pending: false,
            welcome_visible: true,
            status_panel: StatusPanel::default(),
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.typing_pending
    }

    #[must_use]
    pub fn is_welcome_visible(&self) -> bool {
        self.welcome_visible
    }

    #[must_use]
    pub fn status_panel(&self) -> &StatusPanel {
        &self.status_panel
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    #[must_use]
    pub fn indicator(&self) -> ConnectivityIndicator {
        self.connection.indicator()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let indicator = self.indicator();
        SessionSnapshot {
            connection: self.connection.snapshot(),
            indicator,
            indicator_label: indicator.label(),
            messages: self.messages.clone(),
            typing_pending: self.typing_pending,
            welcome_visible: self.welcome_visible,
            status_panel: self.status_panel.clone(),
        }
    }

    /// The snapshot as JSON, as exported to hosts for diagnostics.
    pub fn snapshot_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    pub fn connect(&mut self) -> bool {
        self.connection.connect()
    }

    pub fn retry(&mut self) -> bool {
        self.connection.retry()
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    /// Send user text. Refused when blank or when not connected; the host keeps the input then.
    pub fn submit_message(&mut self, text: &str) -> bool {
        let Some(envelope) = OutboundEnvelope::message(text) else {
            return false;
        };
        if !self.connection.is_connected() {
            debug!("message submitted while not connected");
            return false;
        }
        self.welcome_visible = false;
        if let OutboundEnvelope::Message { content } = &envelope {
            self.push_message(Role::User, content.clone());
        }
        if self.connection.send(&envelope) {
            self.typing_pending = true;
        }
        true
    }

    pub fn clear_conversation(&mut self) -> bool {
        self.messages.clear();
        self.welcome_visible = true;
        self.typing_pending = false;
        if self.connection.is_connected() {
            let _ = self.connection.send(&OutboundEnvelope::Clear);
        }
        true
    }

    pub fn request_status(&mut self) -> bool {
        self.status_panel.request(&mut self.connection)
    }

    pub fn close_status(&mut self) -> bool {
        self.status_panel.close()
    }

    pub fn handle_input(&mut self, input: UserInput) -> bool {
        match input {
            UserInput::Submit(text) => self.submit_message(&text),
            UserInput::Clear => self.clear_conversation(),
            UserInput::RequestStatus => self.request_status(),
            UserInput::CloseStatus => self.close_status(),
            UserInput::Retry => self.retry(),
        }
    }

    pub fn handle_event(&mut self, event: ChannelEvent) -> bool {
        match event {
            ChannelEvent::Opened(id) => self.handle_open(id),
            ChannelEvent::Frame(id, text) => self.handle_frame(id, text),
            ChannelEvent::Closed(id) => self.handle_close(id),
            ChannelEvent::Errored(id, reason) => self.handle_error(id, reason),
        }
    }

    pub fn handle_open(&mut self, id: ChannelId) -> bool {
        self.connection.on_open(id)
    }

    pub fn handle_close(&mut self, id: ChannelId) -> bool {
        self.connection.on_close(id)
    }

    pub fn handle_error(&mut self, id: ChannelId, reason: impl Into<String>) -> bool {
        self.connection.on_error(id, reason)
    }

    pub fn handle_timer(&mut self, token: TimerToken) -> bool {
        self.connection.on_timer(token)
    }

    pub fn handle_frame(&mut self, id: ChannelId, text: String) -> bool {
        let Some(text) = self.connection.on_frame(id, text) else {
            return false;
        };
        let envelope = match parse_inbound(&text) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(channel_id = %id, %error, "dropping malformed inbound frame");
                return false;
            }
        };
        debug!(channel_id = %id, kind = envelope.kind(), "inbound envelope");

        match self.dispatcher.dispatch(envelope) {
            DispatchAction::AssistantMessage(content) | DispatchAction::AssistantError(content) => {
                self.typing_pending = false;
                self.push_message(Role::Assistant, content);
                true
            }
            DispatchAction::Status(status) => self.status_panel.on_status(&status),
            DispatchAction::Ignore => false,
        }
    }

    fn push_message(&mut self, role: Role, text: String) {
        let fragments = self.renderer.render(&text);
        self.messages.push(DisplayMessage {
            role,
            text,
            fragments,
            timestamp: self.clock.now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatSession, Role, SessionDeps, UserInput};
    use crate::config::ClientConfig;
    use crate::connection::{ChannelEvent, ChannelId, ConnectivityIndicator, TimerToken};
    use crate::error::Result;
    use crate::render::{Fragment, ImageReference, MessageRenderer};
    use crate::status_panel::StatusView;
    use crate::testing::{FixedClock, ManualTimer, RecordingChannel};

    struct Harness {
        session: ChatSession,
        channel: RecordingChannel,
        timer: ManualTimer,
    }

    impl Harness {
        fn new() -> Result<Self> {
            let channel = RecordingChannel::default();
            let timer = ManualTimer::default();
            let session = ChatSession::new(
                &ClientConfig::default(),
                "ws://localhost:8000/ws",
                SessionDeps {
                    channel: Box::new(channel.clone()),
                    timer: Box::new(timer.clone()),
                    clock: Box::new(FixedClock::default()),
                    renderer: MessageRenderer::new()?,
                },
            );
            Ok(Self {
                session,
                channel,
                timer,
            })
        }

        fn connected() -> Result<(Self, ChannelId)> {
            let mut harness = Self::new()?;
            assert!(harness.session.connect());
            let id = harness.channel.last_opened().unwrap_or(ChannelId(0));
            assert!(harness.session.handle_event(ChannelEvent::Opened(id)));
            Ok((harness, id))
        }
    }

    #[test]
    fn open_respond_clear_restores_welcome() -> Result<()> {
        let (mut harness, id) = Harness::connected()?;
        let session = &mut harness.session;
        assert!(session.is_welcome_visible());

        assert!(session.submit_message("  Olá  "));
        assert!(!session.is_welcome_visible());
        assert!(session.is_typing());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(session.messages()[0].text, "Olá");

        assert!(session.handle_frame(id, r#"{"type":"response","content":"Hi"}"#.to_string()));
        assert!(!session.is_typing());
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].role, Role::Assistant);
        assert_eq!(session.messages()[1].text, "Hi");

        assert!(session.clear_conversation());
        assert!(session.messages().is_empty());
        assert!(session.is_welcome_visible());
        assert!(!session.is_typing());

        assert_eq!(
            harness.channel.sent_texts(),
            vec![
                r#"{"type":"message","content":"Olá"}"#.to_string(),
                r#"{"type":"clear"}"#.to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn submit_is_refused_when_blank_or_offline() -> Result<()> {
        let mut harness = Harness::new()?;
        assert!(!harness.session.submit_message("hello"));
        assert!(harness.session.messages().is_empty());
        assert!(harness.session.is_welcome_visible());

        let (mut harness, _id) = Harness::connected()?;
        assert!(!harness.session.submit_message("   "));
        assert!(harness.channel.sent().is_empty());
        Ok(())
    }

    #[test]
    fn clear_while_offline_resets_locally() -> Result<()> {
        let mut harness = Harness::new()?;
        assert!(harness.session.clear_conversation());
        assert!(harness.channel.sent().is_empty());
        Ok(())
    }

    #[test]
    fn error_envelope_renders_marked_assistant_message() -> Result<()> {
        let (mut harness, id) = Harness::connected()?;
        let _ = harness.session.submit_message("status do sistema");
        assert!(
            harness
                .session
                .handle_frame(id, r#"{"type":"error","content":"timeout"}"#.to_string())
        );
        let last = harness.session.messages().last().cloned();
        assert_eq!(last.map(|message| message.text), Some("❌ Error: timeout".to_string()));
        assert!(!harness.session.is_typing());
        Ok(())
    }

    #[test]
    fn assistant_screenshot_is_rendered_as_image() -> Result<()> {
        let (mut harness, id) = Harness::connected()?;
        let frame = r#"{"type":"response","content":"Screenshot salva em shot1.png"}"#;
        assert!(harness.session.handle_frame(id, frame.to_string()));
        assert_eq!(
            harness.session.messages()[0].fragments,
            vec![Fragment::Image(ImageReference {
                filename: "shot1.png".to_string(),
                resource_path: "/screenshots/shot1.png".to_string(),
            })]
        );
        Ok(())
    }

    #[test]
    fn malformed_typing_and_unknown_frames_leave_state_untouched() -> Result<()> {
        let (mut harness, id) = Harness::connected()?;
        let before = harness.session.messages().len();
        for frame in [
            "not json",
            r#"{"type":"response"}"#,
            r#"{"type":"typing"}"#,
            r#"{"type":"unknown_future_kind","content":1}"#,
        ] {
            assert!(!harness.session.handle_frame(id, frame.to_string()));
        }
        assert_eq!(harness.session.messages().len(), before);
        Ok(())
    }

    #[test]
    fn status_round_trip_updates_panel() -> Result<()> {
        let (mut harness, id) = Harness::connected()?;
        assert!(harness.session.handle_input(UserInput::RequestStatus));
        assert_eq!(harness.session.status_panel().view(), &StatusView::Loading);

        let frame = r#"{"type":"status","content":{"agent":"JARVIS","tools_count":3}}"#;
        assert!(harness.session.handle_frame(id, frame.to_string()));
        let StatusView::Snapshot(rows) = harness.session.status_panel().view() else {
            panic!("expected snapshot view");
        };
        assert_eq!(rows.len(), 2);

        assert!(harness.session.handle_input(UserInput::CloseStatus));
        assert!(!harness.session.status_panel().is_visible());
        Ok(())
    }

    #[test]
    fn frames_from_stale_channel_are_dropped() -> Result<()> {
        let (mut harness, first) = Harness::connected()?;
        assert!(harness.session.handle_event(ChannelEvent::Closed(first)));
        let token = harness.timer.last_token().unwrap_or(TimerToken(0));
        assert!(harness.session.handle_timer(token));
        let second = harness.channel.last_opened().unwrap_or(ChannelId(0));
        assert!(harness.session.handle_open(second));

        let frame = r#"{"type":"response","content":"late"}"#.to_string();
        assert!(!harness.session.handle_frame(first, frame));
        assert!(harness.session.messages().is_empty());
        assert_eq!(harness.channel.open_count(), 2);
        Ok(())
    }

    #[test]
    fn indicator_tracks_reconnect_progress() -> Result<()> {
        let (mut harness, id) = Harness::connected()?;
        assert_eq!(harness.session.indicator(), ConnectivityIndicator::Connected);
        assert!(harness.session.handle_error(id, "reset"));
        assert_eq!(
            harness.session.indicator(),
            ConnectivityIndicator::Reconnecting { attempt: 1, max: 10 }
        );
        assert_eq!(harness.session.snapshot().indicator_label, "Reconnecting (1/10)...");
        Ok(())
    }

    #[test]
    fn snapshot_serializes_for_diagnostics() -> Result<()> {
        let (mut harness, _id) = Harness::connected()?;
        let _ = harness.session.submit_message("**oi**");
        let json: serde_json::Value = serde_json::from_str(&harness.session.snapshot_json()?)?;
        assert_eq!(json["connection"]["state"], "connected");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["fragments"][0]["style"], "strong");
        assert_eq!(json["welcome_visible"], false);
        Ok(())
    }
}
