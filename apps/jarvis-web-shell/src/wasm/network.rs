use super::*;

pub(super) fn endpoint_url(config: &ClientConfig) -> Result<String, String> {
    let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
    let location = window.location();
    let protocol = location
        .protocol()
        .map_err(|_| "browser protocol is unavailable".to_string())?;
    let host = location
        .host()
        .map_err(|_| "browser host is unavailable".to_string())?;
    Ok(websocket_url(&protocol, &host, &config.endpoint_path))
}

struct LiveSocket {
    id: ChannelId,
    socket: WebSocket,
    _on_open: Closure<dyn FnMut()>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(web_sys::Event)>,
}

impl LiveSocket {
    fn detach(&self) {
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
        self.socket.set_onerror(None);
    }
}

/// Browser `WebSocket` transport. Closed sockets are parked in `retired`
/// because `close` can run inside one of their own callbacks; they are
/// released on the next `open`.
#[derive(Default)]
pub(super) struct WebSocketChannel {
    live: Option<LiveSocket>,
    retired: Vec<LiveSocket>,
}

impl Channel for WebSocketChannel {
    fn open(&mut self, url: &str, id: ChannelId) -> Result<(), ChannelError> {
        self.retired.clear();
        if let Some(previous) = self.live.take() {
            previous.detach();
            let _ = previous.socket.close();
            self.retired.push(previous);
        }

        let socket = WebSocket::new(url)
            .map_err(|error| ChannelError::Open(format!("{error:?}")))?;

        let on_open = Closure::<dyn FnMut()>::new(move || {
            let _ = apply(|session| session.handle_open(id));
        });
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            match event.data().as_string() {
                Some(text) => {
                    let _ = apply(|session| session.handle_frame(id, text));
                }
                None => debug!(channel_id = %id, "ignoring non-text frame"),
            }
        });
        let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
            debug!(channel_id = %id, code = event.code(), "websocket closed");
            let _ = apply(|session| session.handle_close(id));
        });
        let on_error = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            let _ = apply(|session| session.handle_error(id, "websocket error"));
        });

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        self.live = Some(LiveSocket {
            id,
            socket,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        });
        Ok(())
    }

    fn send(&mut self, id: ChannelId, text: &str) -> Result<(), ChannelError> {
        let live = self
            .live
            .as_ref()
            .filter(|live| live.id == id)
            .ok_or(ChannelError::NotOpen)?;
        live.socket
            .send_with_str(text)
            .map_err(|error| ChannelError::Write(format!("{error:?}")))
    }

    fn close(&mut self, id: ChannelId) {
        if !self.live.as_ref().is_some_and(|live| live.id == id) {
            return;
        }
        if let Some(live) = self.live.take() {
            live.detach();
            let _ = live.socket.close();
            self.retired.push(live);
        }
    }
}

/// `setTimeout` based timer. Superseded firings are discarded by the session's token check.
#[derive(Default)]
pub(super) struct TimeoutTimer {
    slots: TimerSlots<Timeout>,
}

impl Timer for TimeoutTimer {
    fn schedule(&mut self, delay: Duration, token: TimerToken) {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let timeout = Timeout::new(millis, move || {
            let _ = apply(|session| session.handle_timer(token));
        });
        self.slots.schedule(token, timeout);
        debug!(token = token.0, held = self.slots.held(), "reconnect timeout scheduled");
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(timeout) = self.slots.cancel(token) {
            drop(timeout.cancel());
            debug!(
                token = token.0,
                pending = ?self.slots.pending_token(),
                "reconnect timeout cancelled"
            );
        }
    }
}
