//! Client runtime for the JARVIS chat interface.
//!
//! The crate is sans-IO at its core: [`session::ChatSession`] reduces channel,
//! timer and user events into typed display state, and hosts supply the
//! transport, timer and clock. The `native` module provides a tokio host; the
//! browser host lives in the web shell app.

#![cfg_attr(test, allow(clippy::expect_used, clippy::panic, clippy::indexing_slicing))]

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
#[cfg(not(target_arch = "wasm32"))]
pub mod native;
pub mod protocol;
pub mod render;
pub mod session;
pub mod status_panel;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ClientConfig, ConfigError, websocket_url};
pub use connection::{
    Channel, ChannelEvent, ChannelId, ConnectionManager, ConnectionSnapshot, ConnectionState,
    ConnectivityIndicator, ReconnectPolicy, Timer, TimerToken,
};
pub use dispatcher::{DispatchAction, ProtocolDispatcher};
pub use error::{ChannelError, ClientError, ProtocolError, Result};
pub use protocol::{AgentStatus, InboundEnvelope, OutboundEnvelope, parse_inbound};
pub use render::markup::{escape_html, to_html};
pub use render::{Fragment, ImageReference, InlineStyle, MessageRenderer, TextRun};
pub use session::{ChatSession, Clock, DisplayMessage, Role, SessionDeps, SessionSnapshot, UserInput};
pub use status_panel::{StatusPanel, StatusRow, StatusView, Tone};
