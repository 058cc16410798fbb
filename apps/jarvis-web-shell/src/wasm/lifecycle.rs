use std::io;

use tracing_subscriber::fmt::MakeWriter;

use super::*;

pub(super) fn boot() -> Result<(), String> {
    let config = ClientConfig::default();
    let url = endpoint_url(&config)?;
    let renderer = MessageRenderer::with_resource_prefix(&config.screenshots_prefix)
        .map_err(|error| error.to_string())?;

    let session = ChatSession::new(
        &config,
        url.clone(),
        SessionDeps {
            channel: Box::new(WebSocketChannel::default()),
            timer: Box::new(TimeoutTimer::default()),
            clock: Box::new(BrowserClock),
            renderer,
        },
    );
    SESSION.with(|slot| {
        if let Ok(mut slot) = slot.try_borrow_mut() {
            *slot = Some(session);
        }
    });

    wire_listeners()?;
    info!(url = %url, "web shell booted");
    let _ = apply(ChatSession::connect);
    render_session();
    Ok(())
}

pub(super) struct BrowserClock;

impl Clock for BrowserClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default()
    }
}

/// `HH:MM` in the browser's local time zone.
pub(super) fn local_time_label(timestamp: DateTime<Utc>) -> String {
    let date = js_sys::Date::new(&JsValue::from_f64(timestamp.timestamp_millis() as f64));
    clock_label(date.get_hours(), date.get_minutes())
}

pub(super) fn init_console_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(ConsoleMakeWriter)
        .without_time()
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter(Vec::new())
    }
}

/// Buffers one formatted event and hands it to `console.log` on drop.
struct ConsoleWriter(Vec<u8>);

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.0.is_empty() {
            let line = String::from_utf8_lossy(&self.0);
            web_sys::console::log_1(&JsValue::from_str(line.trim_end()));
            self.0.clear();
        }
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let _ = io::Write::flush(self);
    }
}
