//! Single logical connection to the agent backend and its reconnect state machine.
//!
//! The manager never performs I/O itself. It asks an injected [`Channel`] to
//! open, write and close socket instances, and an injected [`Timer`] to call
//! back after the reconnect delay. Hosts feed the resulting callbacks back in
//! through `on_open`, `on_frame`, `on_close`, `on_error` and `on_timer`.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ChannelError;
use crate::protocol::OutboundEnvelope;

/// Identifies one channel instance. Events from superseded instances are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch-{}", self.0)
    }
}

/// Identifies one scheduled reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimerToken(pub u64);

/// Transport used by the manager. Implementations report lifecycle events for
/// `id` back to the host, which forwards them to the manager.
pub trait Channel {
    fn open(&mut self, url: &str, id: ChannelId) -> Result<(), ChannelError>;

    fn send(&mut self, id: ChannelId, text: &str) -> Result<(), ChannelError>;

    fn close(&mut self, id: ChannelId);
}

/// One-shot timer. Firing is reported back to the host with the same token.
pub trait Timer {
    fn schedule(&mut self, delay: Duration, token: TimerToken);

    fn cancel(&mut self, _token: TimerToken) {}
}

/// Lifecycle callbacks a host delivers for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened(ChannelId),
    Frame(ChannelId, String),
    Closed(ChannelId),
    Errored(ChannelId, String),
}

impl ChannelEvent {
    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        match self {
            Self::Opened(id) | Self::Frame(id, _) | Self::Closed(id) | Self::Errored(id, _) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

/// Fixed-delay, bounded reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
    attempts_used: u32,
}

impl ReconnectPolicy {
    #[must_use]
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
            attempts_used: 0,
        }
    }

    #[must_use]
    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.attempts_used < self.max_attempts
    }

    fn record_attempt(&mut self) {
        self.attempts_used = self.attempts_used.saturating_add(1).min(self.max_attempts);
    }

    fn reset(&mut self) {
        self.attempts_used = 0;
    }
}

impl From<&ClientConfig> for ReconnectPolicy {
    fn from(config: &ClientConfig) -> Self {
        Self::new(config.reconnect_delay, config.max_reconnect_attempts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    Closed,
    Error(String),
    OpenFailed(String),
}

/// What the status pill should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectivityIndicator {
    Connecting,
    Connected,
    Disconnected,
    ConnectionError,
    Reconnecting { attempt: u32, max: u32 },
    PermanentlyDisconnected,
}

impl ConnectivityIndicator {
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Connecting => "Connecting...".to_string(),
            Self::Connected => "Connected".to_string(),
            Self::Disconnected => "Disconnected".to_string(),
            Self::ConnectionError => "Connection error".to_string(),
            Self::Reconnecting { attempt, max } => format!("Reconnecting ({attempt}/{max})..."),
            Self::PermanentlyDisconnected => "Disconnected (retry limit reached)".to_string(),
        }
    }

    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Connecting | Self::Reconnecting { .. } => "",
            Self::Disconnected | Self::ConnectionError | Self::PermanentlyDisconnected => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub attempts_used: u32,
    pub max_attempts: u32,
    pub channel_id: Option<ChannelId>,
    pub reconnect_pending: bool,
    pub exhausted: bool,
    pub last_disconnect: Option<DisconnectReason>,
}

pub struct ConnectionManager {
    url: String,
    state: ConnectionState,
    policy: ReconnectPolicy,
    channel: Box<dyn Channel>,
    timer: Box<dyn Timer>,
    active_channel: Option<ChannelId>,
    next_channel_id: u64,
    pending_timer: Option<TimerToken>,
    next_timer_token: u64,
    exhausted: bool,
    last_disconnect: Option<DisconnectReason>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.url)
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("active_channel", &self.active_channel)
            .field("pending_timer", &self.pending_timer)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn new(
        url: impl Into<String>,
        policy: ReconnectPolicy,
        channel: Box<dyn Channel>,
        timer: Box<dyn Timer>,
    ) -> Self {
        Self {
            url: url.into(),
            state: ConnectionState::Disconnected,
            policy,
            channel,
            timer,
            active_channel: None,
            next_channel_id: 1,
            pending_timer: None,
            next_timer_token: 1,
            exhausted: false,
            last_disconnect: None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// True once the reconnect bound was reached; cleared by `retry` or a successful open.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub fn indicator(&self) -> ConnectivityIndicator {
        match self.state {
            ConnectionState::Connected => ConnectivityIndicator::Connected,
            ConnectionState::Connecting if self.policy.attempts_used > 0 => {
                ConnectivityIndicator::Reconnecting {
                    attempt: self.policy.attempts_used,
                    max: self.policy.max_attempts,
                }
            }
            ConnectionState::Connecting => ConnectivityIndicator::Connecting,
            ConnectionState::Reconnecting => ConnectivityIndicator::Reconnecting {
                attempt: self.policy.attempts_used.saturating_add(1),
                max: self.policy.max_attempts,
            },
            ConnectionState::Disconnected if self.exhausted => {
                ConnectivityIndicator::PermanentlyDisconnected
            }
            ConnectionState::Disconnected => match self.last_disconnect {
                Some(DisconnectReason::Error(_) | DisconnectReason::OpenFailed(_)) => {
                    ConnectivityIndicator::ConnectionError
                }
                _ => ConnectivityIndicator::Disconnected,
            },
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            state: self.state,
            attempts_used: self.policy.attempts_used,
            max_attempts: self.policy.max_attempts,
            channel_id: self.active_channel,
            reconnect_pending: self.pending_timer.is_some(),
            exhausted: self.exhausted,
            last_disconnect: self.last_disconnect.clone(),
        }
    }

    /// Start a connection attempt. No-op while connecting or connected.
    pub fn connect(&mut self) -> bool {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!(state = self.state.as_str(), "connect ignored; attempt already live");
            return false;
        }
        self.cancel_pending_timer();
        self.open_channel();
        true
    }

    /// Manual retry: clears the attempt budget and connects unless already live.
    pub fn retry(&mut self) -> bool {
        self.policy.reset();
        self.exhausted = false;
        self.connect()
    }

    /// Close the live channel without scheduling a reconnect.
    pub fn disconnect(&mut self) {
        self.cancel_pending_timer();
        if let Some(id) = self.active_channel.take() {
            self.channel.close(id);
            info!(channel_id = %id, "channel closed by client");
        }
        self.state = ConnectionState::Disconnected;
        self.last_disconnect = Some(DisconnectReason::Closed);
    }

    /// Write an envelope. Silently dropped unless connected.
    pub fn send(&mut self, envelope: &OutboundEnvelope) -> bool {
        if self.state != ConnectionState::Connected {
            debug!(
                kind = envelope.kind(),
                state = self.state.as_str(),
                "dropping outbound envelope while not connected"
            );
            return false;
        }
        let Some(id) = self.active_channel else {
            return false;
        };
        let text = match envelope.to_json() {
            Ok(text) => text,
            Err(error) => {
                warn!(kind = envelope.kind(), %error, "failed to encode outbound envelope");
                return false;
            }
        };
        match self.channel.send(id, &text) {
            Ok(()) => true,
            Err(error) => {
                warn!(channel_id = %id, kind = envelope.kind(), %error, "channel write failed");
                false
            }
        }
    }

    pub fn on_open(&mut self, id: ChannelId) -> bool {
        if !self.is_active(id) || self.state != ConnectionState::Connecting {
            debug!(channel_id = %id, "ignoring open from stale channel");
            return false;
        }
        self.state = ConnectionState::Connected;
        self.policy.reset();
        self.exhausted = false;
        self.last_disconnect = None;
        info!(channel_id = %id, url = %self.url, "channel connected");
        true
    }

    /// Returns the frame text when it belongs to the live channel.
    pub fn on_frame(&mut self, id: ChannelId, text: String) -> Option<String> {
        if !self.is_active(id) || self.state != ConnectionState::Connected {
            debug!(channel_id = %id, "dropping frame from stale channel");
            return None;
        }
        Some(text)
    }

    pub fn on_close(&mut self, id: ChannelId) -> bool {
        self.handle_failure(id, DisconnectReason::Closed)
    }

    pub fn on_error(&mut self, id: ChannelId, reason: impl Into<String>) -> bool {
        self.handle_failure(id, DisconnectReason::Error(reason.into()))
    }

    pub fn on_timer(&mut self, token: TimerToken) -> bool {
        if self.pending_timer != Some(token) || self.state != ConnectionState::Reconnecting {
            debug!(token = token.0, state = self.state.as_str(), "ignoring stale reconnect timer");
            return false;
        }
        self.pending_timer = None;
        self.policy.record_attempt();
        info!(
            attempt = self.policy.attempts_used,
            max = self.policy.max_attempts,
            "reconnecting"
        );
        self.open_channel();
        true
    }

    fn is_active(&self, id: ChannelId) -> bool {
        self.active_channel == Some(id)
    }

    fn open_channel(&mut self) {
        let id = ChannelId(self.next_channel_id);
        self.next_channel_id = self.next_channel_id.saturating_add(1);
        self.active_channel = Some(id);
        self.state = ConnectionState::Connecting;

        if let Err(error) = self.channel.open(&self.url, id) {
            warn!(channel_id = %id, %error, "channel open failed");
            let _ = self.handle_failure(id, DisconnectReason::OpenFailed(error.to_string()));
        } else {
            debug!(channel_id = %id, url = %self.url, "channel opening");
        }
    }

    fn handle_failure(&mut self, id: ChannelId, reason: DisconnectReason) -> bool {
        if !self.is_active(id)
            || !matches!(
                self.state,
                ConnectionState::Connecting | ConnectionState::Connected
            )
        {
            debug!(channel_id = %id, "ignoring disconnect from stale channel");
            return false;
        }

        self.active_channel = None;
        self.channel.close(id);
        self.state = ConnectionState::Disconnected;
        info!(channel_id = %id, reason = ?reason, "channel disconnected");
        self.last_disconnect = Some(reason);

        if self.policy.can_retry() {
            let token = TimerToken(self.next_timer_token);
            self.next_timer_token = self.next_timer_token.saturating_add(1);
            self.pending_timer = Some(token);
            self.timer.schedule(self.policy.delay, token);
            self.state = ConnectionState::Reconnecting;
        } else {
            self.exhausted = true;
            warn!(
                max = self.policy.max_attempts,
                "reconnect attempts exhausted; staying disconnected"
            );
        }
        true
    }

    fn cancel_pending_timer(&mut self) {
        if let Some(token) = self.pending_timer.take() {
            self.timer.cancel(token);
        }
    }
}
