//! Native host layer: a `tokio-tungstenite` channel, a tokio timer and a
//! single-task event loop driving a [`ChatSession`].
//!
//! Every callback is funnelled into one unbounded queue, so the session is
//! only ever touched by the task running [`NativeRuntime::run`].

use std::ops::ControlFlow;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::{Channel, ChannelEvent, ChannelId, Timer, TimerToken};
use crate::error::{ChannelError, Result};
use crate::render::MessageRenderer;
use crate::session::{ChatSession, Clock, SessionDeps, UserInput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    Channel(ChannelEvent),
    Timer(TimerToken),
    Input(UserInput),
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<RuntimeEvent>;

/// Install the fmt subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

struct LiveChannel {
    id: ChannelId,
    writer: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

pub struct TungsteniteChannel {
    events: EventSender,
    live: Option<LiveChannel>,
}

impl TungsteniteChannel {
    pub fn new(events: EventSender) -> Self {
        Self { events, live: None }
    }
}

impl Channel for TungsteniteChannel {
    fn open(&mut self, url: &str, id: ChannelId) -> std::result::Result<(), ChannelError> {
        let handle = Handle::try_current().map_err(|error| ChannelError::Open(error.to_string()))?;
        if let Some(previous) = self.live.take() {
            previous.task.abort();
        }

        let (writer, outgoing) = mpsc::unbounded_channel();
        let task = handle.spawn(run_channel(
            url.to_string(),
            id,
            outgoing,
            self.events.clone(),
        ));
        self.live = Some(LiveChannel { id, writer, task });
        Ok(())
    }

    fn send(&mut self, id: ChannelId, text: &str) -> std::result::Result<(), ChannelError> {
        let live = self
            .live
            .as_ref()
            .filter(|live| live.id == id)
            .ok_or(ChannelError::NotOpen)?;
        live.writer
            .send(text.to_string())
            .map_err(|_| ChannelError::Write("writer task stopped".to_string()))
    }

    fn close(&mut self, id: ChannelId) {
        if self.live.as_ref().is_some_and(|live| live.id == id) {
            // Dropping the writer lets the task send a close frame and exit.
            self.live = None;
        }
    }
}

impl Drop for TungsteniteChannel {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            live.task.abort();
        }
    }
}

async fn run_channel(
    url: String,
    id: ChannelId,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    events: EventSender,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(error) => {
            let _ = events.send(RuntimeEvent::Channel(ChannelEvent::Errored(
                id,
                error.to_string(),
            )));
            return;
        }
    };
    if events
        .send(RuntimeEvent::Channel(ChannelEvent::Opened(id)))
        .is_err()
    {
        return;
    }

    let (mut writer, mut reader) = stream.split();
    loop {
        tokio::select! {
            outgoing_text = outgoing.recv() => match outgoing_text {
                Some(text) => {
                    if let Err(error) = writer.send(Message::Text(text.into())).await {
                        let _ = events.send(RuntimeEvent::Channel(ChannelEvent::Errored(
                            id,
                            error.to_string(),
                        )));
                        return;
                    }
                }
                None => {
                    let _ = writer.send(Message::Close(None)).await;
                    debug!(channel_id = %id, "writer dropped; channel closed");
                    return;
                }
            },
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let frame = RuntimeEvent::Channel(ChannelEvent::Frame(id, text.as_str().to_owned()));
                    if events.send(frame).is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    let _ = events.send(RuntimeEvent::Channel(ChannelEvent::Closed(id)));
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    warn!(channel_id = %id, %error, "websocket read error");
                    let _ = events.send(RuntimeEvent::Channel(ChannelEvent::Errored(
                        id,
                        error.to_string(),
                    )));
                    return;
                }
            }
        }
    }
}

pub struct TokioTimer {
    events: EventSender,
    pending: Option<(TimerToken, JoinHandle<()>)>,
}

impl TokioTimer {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            pending: None,
        }
    }
}

impl Timer for TokioTimer {
    fn schedule(&mut self, delay: Duration, token: TimerToken) {
        let Ok(handle) = Handle::try_current() else {
            warn!(token = token.0, "no tokio runtime; reconnect timer dropped");
            return;
        };
        if let Some((_, previous)) = self.pending.take() {
            previous.abort();
        }
        let events = self.events.clone();
        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(RuntimeEvent::Timer(token));
        });
        self.pending = Some((token, task));
    }

    fn cancel(&mut self, token: TimerToken) {
        if self
            .pending
            .as_ref()
            .is_some_and(|(pending, _)| *pending == token)
            && let Some((_, task)) = self.pending.take()
        {
            task.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct NativeRuntime {
    session: ChatSession,
    events: mpsc::UnboundedReceiver<RuntimeEvent>,
}

impl NativeRuntime {
    /// Build a runtime for `url`. The returned sender feeds user input and `Shutdown`.
    pub fn new(config: &ClientConfig, url: impl Into<String>) -> Result<(Self, EventSender)> {
        let (sender, events) = mpsc::unbounded_channel();
        let deps = SessionDeps {
            channel: Box::new(TungsteniteChannel::new(sender.clone())),
            timer: Box::new(TokioTimer::new(sender.clone())),
            clock: Box::new(SystemClock),
            renderer: MessageRenderer::with_resource_prefix(&config.screenshots_prefix)?,
        };
        let session = ChatSession::new(config, url, deps);
        Ok((Self { session, events }, sender))
    }

    /// Same as [`NativeRuntime::new`] with the configuration read from `JARVIS_*` variables.
    pub fn from_env(url: impl Into<String>) -> Result<(Self, EventSender)> {
        let config = ClientConfig::from_env()?;
        Self::new(&config, url)
    }

    #[must_use]
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Connect and apply events in arrival order. `on_change` runs after every
    /// change and may stop the loop. Returns the session after disconnecting.
    pub async fn run<F>(mut self, mut on_change: F) -> ChatSession
    where
        F: FnMut(&mut ChatSession) -> ControlFlow<()>,
    {
        info!(url = self.session.connection().url(), "starting chat session");
        if self.session.connect() && on_change(&mut self.session).is_break() {
            self.session.disconnect();
            return self.session;
        }

        while let Some(event) = self.events.recv().await {
            let changed = match event {
                RuntimeEvent::Channel(event) => self.session.handle_event(event),
                RuntimeEvent::Timer(token) => self.session.handle_timer(token),
                RuntimeEvent::Input(input) => self.session.handle_input(input),
                RuntimeEvent::Shutdown => break,
            };
            if changed && on_change(&mut self.session).is_break() {
                break;
            }
        }

        self.session.disconnect();
        info!("chat session stopped");
        self.session
    }
}
