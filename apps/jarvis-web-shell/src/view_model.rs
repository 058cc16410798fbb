use jarvis_client_core::{ConnectivityIndicator, Role, StatusView, Tone};

pub const TEXTAREA_MAX_HEIGHT_PX: i32 = 120;

/// Class attribute for the connectivity pill.
pub fn status_pill_class(indicator: ConnectivityIndicator) -> String {
    let state = indicator.css_class();
    if state.is_empty() {
        "status".to_string()
    } else {
        format!("status {state}")
    }
}

pub fn message_class(role: Role) -> String {
    format!("message {}", role.as_str())
}

pub fn status_value_class(tone: Tone) -> &'static str {
    match tone {
        Tone::Neutral => "value",
        Tone::Success => "value success",
        Tone::Error => "value error",
    }
}

/// Text shown in the status modal instead of rows, if any.
pub fn status_placeholder(view: &StatusView) -> Option<&'static str> {
    match view {
        StatusView::Idle => Some(""),
        StatusView::Loading => Some("Loading..."),
        StatusView::Offline(_) | StatusView::Snapshot(_) => None,
    }
}

pub fn clock_label(hours: u32, minutes: u32) -> String {
    format!("{hours:02}:{minutes:02}")
}

pub fn send_enabled(input: &str) -> bool {
    !input.trim().is_empty()
}

pub fn textarea_height(scroll_height: i32) -> String {
    format!("{}px", scroll_height.clamp(0, TEXTAREA_MAX_HEIGHT_PX))
}
