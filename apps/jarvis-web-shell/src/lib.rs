#[cfg(any(target_arch = "wasm32", test))]
mod timer_slots;
#[cfg(any(target_arch = "wasm32", test))]
mod view_model;
#[cfg(target_arch = "wasm32")]
mod wasm_constants;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use gloo_timers::callback::Timeout;
    use jarvis_client_core::{
        Channel, ChannelError, ChannelId, ChatSession, ClientConfig, Clock, DisplayMessage,
        Fragment, MessageRenderer, Role, SessionDeps, StatusView, Timer, TimerToken,
        websocket_url,
    };
    use tracing::{debug, error, info, warn};
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CloseEvent, Document, HtmlButtonElement, HtmlElement, HtmlTextAreaElement, KeyboardEvent,
        MessageEvent, WebSocket,
    };

    use crate::timer_slots::TimerSlots;
    use crate::view_model::{
        clock_label, message_class, send_enabled, status_pill_class, status_placeholder,
        status_value_class, textarea_height,
    };
    use crate::wasm_constants::*;

    mod dom;
    mod lifecycle;
    mod network;

    use dom::*;
    use lifecycle::*;
    use network::*;

    thread_local! {
        static SESSION: RefCell<Option<ChatSession>> = const { RefCell::new(None) };
        static DOM_HANDLERS: RefCell<Vec<Closure<dyn FnMut(web_sys::Event)>>> = const { RefCell::new(Vec::new()) };
        static KEYDOWN_HANDLER: RefCell<Option<Closure<dyn FnMut(KeyboardEvent)>>> = const { RefCell::new(None) };
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        init_console_tracing();
        if let Err(error) = boot() {
            error!(%error, "web shell boot failed");
        }
    }

    #[wasm_bindgen]
    pub fn session_state_json() -> String {
        SESSION.with(|slot| {
            let Ok(session) = slot.try_borrow() else {
                return "{}".to_string();
            };
            session
                .as_ref()
                .and_then(|session| session.snapshot_json().ok())
                .unwrap_or_else(|| "{}".to_string())
        })
    }

    #[wasm_bindgen]
    pub fn retry_connection() {
        let _ = apply(ChatSession::retry);
    }

    /// Run `update` against the session and re-render when it reports a change.
    pub(super) fn apply<F>(update: F) -> bool
    where
        F: FnOnce(&mut ChatSession) -> bool,
    {
        let changed = SESSION.with(|slot| match slot.try_borrow_mut() {
            Ok(mut session) => session.as_mut().is_some_and(update),
            Err(_) => {
                warn!("session busy; dropping re-entrant update");
                false
            }
        });
        if changed {
            render_session();
        }
        changed
    }
}
