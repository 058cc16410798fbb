use super::*;

fn document() -> Result<Document, String> {
    web_sys::window()
        .ok_or_else(|| "window is unavailable".to_string())?
        .document()
        .ok_or_else(|| "document is unavailable".to_string())
}

fn element_by_id<T: JsCast>(document: &Document, id: &str) -> Result<T, String> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| format!("missing #{id}"))?
        .dyn_into::<T>()
        .map_err(|_| format!("#{id} has an unexpected element type"))
}

fn create<T: JsCast>(document: &Document, tag: &str, class: &str) -> Result<T, String> {
    let element = document
        .create_element(tag)
        .map_err(|_| format!("failed to create {tag}"))?;
    if !class.is_empty() {
        element.set_class_name(class);
    }
    element
        .dyn_into::<T>()
        .map_err(|_| format!("{tag} has an unexpected element type"))
}

fn add_listener(
    target: &web_sys::EventTarget,
    event: &str,
    handler: impl FnMut(web_sys::Event) + 'static,
) {
    let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(handler));
    let _ = target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
    DOM_HANDLERS.with(|handlers| handlers.borrow_mut().push(callback));
}

pub(super) fn wire_listeners() -> Result<(), String> {
    let document = document()?;
    let send_button: HtmlButtonElement = element_by_id(&document, SEND_BUTTON_ID)?;
    let input: HtmlTextAreaElement = element_by_id(&document, MESSAGE_INPUT_ID)?;
    let clear_button: HtmlElement = element_by_id(&document, CLEAR_BUTTON_ID)?;
    let settings_button: HtmlElement = element_by_id(&document, SETTINGS_BUTTON_ID)?;
    let modal: HtmlElement = element_by_id(&document, STATUS_MODAL_ID)?;
    let modal_close: HtmlElement = element_by_id(&document, MODAL_CLOSE_ID)?;

    send_button.set_disabled(true);
    add_listener(&send_button, "click", |_event| submit_from_input());

    KEYDOWN_HANDLER.with(|slot| {
        if slot.borrow().is_some() {
            return;
        }
        let callback =
            Closure::<dyn FnMut(KeyboardEvent)>::wrap(Box::new(move |event: KeyboardEvent| {
                if event.key() == "Enter" && !event.shift_key() {
                    event.prevent_default();
                    submit_from_input();
                }
            }));
        let _ = input.add_event_listener_with_callback("keydown", callback.as_ref().unchecked_ref());
        *slot.borrow_mut() = Some(callback);
    });

    {
        let input = input.clone();
        let send_button = send_button.clone();
        let target = input.clone();
        add_listener(&target, "input", move |_event| {
            send_button.set_disabled(!send_enabled(&input.value()));
            autosize(&input);
        });
    }

    add_listener(&clear_button, "click", |_event| {
        let _ = apply(ChatSession::clear_conversation);
    });
    add_listener(&settings_button, "click", |_event| {
        let _ = apply(ChatSession::request_status);
    });
    add_listener(&modal_close, "click", |_event| {
        let _ = apply(ChatSession::close_status);
    });
    {
        let backdrop: web_sys::EventTarget = modal.clone().into();
        add_listener(&modal, "click", move |event| {
            if event.target().is_some_and(|target| target == backdrop) {
                let _ = apply(ChatSession::close_status);
            }
        });
    }

    let suggestions = document
        .query_selector_all(SUGGESTION_SELECTOR)
        .map_err(|_| "failed to query suggestions".to_string())?;
    for index in 0..suggestions.length() {
        let Some(button) = suggestions
            .item(index)
            .and_then(|node| node.dyn_into::<HtmlElement>().ok())
        else {
            continue;
        };
        let input = input.clone();
        let send_button = send_button.clone();
        let text = button.get_attribute("data-text").unwrap_or_default();
        add_listener(&button, "click", move |_event| {
            input.set_value(&text);
            send_button.set_disabled(!send_enabled(&text));
            let _ = input.focus();
        });
    }

    Ok(())
}

fn autosize(input: &HtmlTextAreaElement) {
    let style = input.style();
    let _ = style.set_property("height", "auto");
    let _ = style.set_property("height", &textarea_height(input.scroll_height()));
}

fn submit_from_input() {
    let Ok(document) = document() else {
        return;
    };
    let Ok(input) = element_by_id::<HtmlTextAreaElement>(&document, MESSAGE_INPUT_ID) else {
        return;
    };
    let text = input.value();
    if apply(|session| session.submit_message(&text)) {
        input.set_value("");
        let _ = input.style().set_property("height", "auto");
        if let Ok(send_button) = element_by_id::<HtmlButtonElement>(&document, SEND_BUTTON_ID) {
            send_button.set_disabled(true);
        }
    }
}

/// Rebuild every session-driven element from the current state.
pub(super) fn render_session() {
    let result = SESSION.with(|slot| {
        let Ok(session) = slot.try_borrow() else {
            return Ok(());
        };
        match session.as_ref() {
            Some(session) => render_into_document(session),
            None => Ok(()),
        }
    });
    if let Err(error) = result {
        warn!(%error, "render failed");
    }
}

fn render_into_document(session: &ChatSession) -> Result<(), String> {
    let document = document()?;

    let indicator = session.indicator();
    let pill: HtmlElement = element_by_id(&document, STATUS_PILL_ID)?;
    pill.set_text_content(Some(&indicator.label()));
    pill.set_class_name(&status_pill_class(indicator));

    let welcome: HtmlElement = element_by_id(&document, WELCOME_ID)?;
    let _ = welcome
        .class_list()
        .toggle_with_force(HIDDEN_CLASS, !session.is_welcome_visible());

    let messages: HtmlElement = element_by_id(&document, MESSAGES_ID)?;
    messages.set_text_content(None);
    for message in session.messages() {
        let node = message_element(&document, message)?;
        let _ = messages.append_child(&node);
    }
    if session.is_typing() {
        let _ = messages.append_child(&typing_element(&document)?);
    }

    if let Ok(container) = element_by_id::<HtmlElement>(&document, CHAT_CONTAINER_ID) {
        container.set_scroll_top(container.scroll_height());
    }

    render_status_modal(&document, session)
}

fn message_element(document: &Document, message: &DisplayMessage) -> Result<HtmlElement, String> {
    let wrapper: HtmlElement = create(document, "div", &message_class(message.role))?;
    let content: HtmlElement = create(document, "div", "message-content")?;
    for fragment in &message.fragments {
        let _ = content.append_child(&fragment_node(document, fragment)?);
    }
    let time: HtmlElement = create(document, "div", "message-time")?;
    time.set_text_content(Some(&local_time_label(message.timestamp)));

    let _ = wrapper.append_child(&content);
    let _ = wrapper.append_child(&time);
    Ok(wrapper)
}

/// Text is only ever assigned through `textContent`, never parsed as markup.
fn fragment_node(document: &Document, fragment: &Fragment) -> Result<web_sys::Node, String> {
    match fragment {
        Fragment::Text(run) => match run.style {
            Some(style) => {
                let element: HtmlElement = create(document, style.tag(), "")?;
                element.set_text_content(Some(&run.text));
                Ok(element.into())
            }
            None => Ok(document.create_text_node(&run.text).into()),
        },
        Fragment::LineBreak => {
            let element: HtmlElement = create(document, "br", "")?;
            Ok(element.into())
        }
        Fragment::Image(image) => {
            let figure: HtmlElement = create(document, "div", "chat-image")?;
            let link: HtmlElement = create(document, "a", "")?;
            let _ = link.set_attribute("href", &image.resource_path);
            let _ = link.set_attribute("target", "_blank");
            let _ = link.set_attribute("rel", "noopener");
            let img: HtmlElement = create(document, "img", "")?;
            let _ = img.set_attribute("src", &image.resource_path);
            let _ = img.set_attribute("alt", "Screenshot");
            let _ = link.append_child(&img);

            let caption: HtmlElement = create(document, "span", "image-caption")?;
            caption.set_text_content(Some(&format!("📸 {}", image.filename)));

            let _ = figure.append_child(&link);
            let _ = figure.append_child(&caption);
            Ok(figure.into())
        }
    }
}

fn typing_element(document: &Document) -> Result<HtmlElement, String> {
    let wrapper: HtmlElement = create(document, "div", &message_class(Role::Assistant))?;
    let dots: HtmlElement = create(document, "div", "message-content typing-indicator")?;
    for _ in 0..3 {
        let dot: HtmlElement = create(document, "span", "")?;
        let _ = dots.append_child(&dot);
    }
    let _ = wrapper.append_child(&dots);
    Ok(wrapper)
}

fn render_status_modal(document: &Document, session: &ChatSession) -> Result<(), String> {
    let panel = session.status_panel();
    let modal: HtmlElement = element_by_id(document, STATUS_MODAL_ID)?;
    let _ = modal
        .class_list()
        .toggle_with_force(MODAL_ACTIVE_CLASS, panel.is_visible());

    let content: HtmlElement = element_by_id(document, STATUS_CONTENT_ID)?;
    content.set_text_content(None);
    if let Some(placeholder) = status_placeholder(panel.view()) {
        content.set_text_content(Some(placeholder));
        return Ok(());
    }

    let rows = match panel.view() {
        StatusView::Offline(rows) | StatusView::Snapshot(rows) => rows.as_slice(),
        StatusView::Idle | StatusView::Loading => &[],
    };
    for row in rows {
        let item: HtmlElement = create(document, "div", "status-item")?;
        let label: HtmlElement = create(document, "label", "")?;
        label.set_text_content(Some(&row.label));
        let value: HtmlElement = create(document, "span", status_value_class(row.tone))?;
        value.set_text_content(Some(&row.value));
        let _ = item.append_child(&label);
        let _ = item.append_child(&value);
        let _ = content.append_child(&item);
    }
    Ok(())
}
