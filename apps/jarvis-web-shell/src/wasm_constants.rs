pub(crate) const STATUS_PILL_ID: &str = "status";
pub(crate) const WELCOME_ID: &str = "welcome";
pub(crate) const MESSAGES_ID: &str = "messages";
pub(crate) const CHAT_CONTAINER_ID: &str = "chat-container";
pub(crate) const MESSAGE_INPUT_ID: &str = "message-input";
pub(crate) const SEND_BUTTON_ID: &str = "btn-send";
pub(crate) const CLEAR_BUTTON_ID: &str = "btn-clear";
pub(crate) const SETTINGS_BUTTON_ID: &str = "btn-settings";
pub(crate) const STATUS_MODAL_ID: &str = "status-modal";
pub(crate) const MODAL_CLOSE_ID: &str = "modal-close";
pub(crate) const STATUS_CONTENT_ID: &str = "status-content";
pub(crate) const SUGGESTION_SELECTOR: &str = ".suggestion";
pub(crate) const HIDDEN_CLASS: &str = "hidden";
pub(crate) const MODAL_ACTIVE_CLASS: &str = "active";
