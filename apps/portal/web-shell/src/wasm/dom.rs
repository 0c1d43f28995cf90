use super::*;

/// An event listener that is detached when dropped.
pub(super) struct BoundListener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl BoundListener {
    pub(super) fn attach(
        target: EventTarget,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(handler));
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target,
            event,
            callback,
        })
    }
}

impl Drop for BoundListener {
    fn drop(&mut self) {
        let _ = self.target.remove_event_listener_with_callback(
            self.event,
            self.callback.as_ref().unchecked_ref(),
        );
    }
}

pub(super) struct DomPage {
    document: Document,
    toasts: RefCell<HashMap<ToastId, HtmlElement>>,
}

impl DomPage {
    pub(super) fn new(document: Document) -> Self {
        Self {
            document,
            toasts: RefCell::new(HashMap::new()),
        }
    }

    pub(super) fn element(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    pub(super) fn radios_in_group(&self, group: &str) -> Vec<HtmlInputElement> {
        self.radios()
            .into_iter()
            .filter(|radio| radio.name() == group)
            .collect()
    }

    fn radios(&self) -> Vec<HtmlInputElement> {
        let Ok(list) = self.document.query_selector_all(RADIO_SELECTOR) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|index| list.item(index))
            .filter_map(|node| node.dyn_into::<HtmlInputElement>().ok())
            .collect()
    }

    fn create_html(&self, tag: &str) -> Result<HtmlElement, DomError> {
        self.document
            .create_element(tag)
            .map_err(|_| DomError::new(format!("failed to create <{tag}>")))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| DomError::new(format!("<{tag}> is not HtmlElement")))
    }

    fn container(&self) -> Result<Element, DomError> {
        self.element(TOAST_CONTAINER_ID)
            .ok_or_else(|| DomError::new("toast container is missing"))
    }
}

impl PageView for DomPage {
    fn set_text(&self, element_id: &str, text: &str) -> bool {
        let Some(element) = self.element(element_id) else {
            return false;
        };
        element.set_text_content(Some(text));
        true
    }

    fn reveal(&self, element_id: &str) -> bool {
        let Some(element) = self
            .element(element_id)
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
        else {
            return false;
        };
        element.style().remove_property("display").is_ok()
    }
}

impl FormView for DomPage {
    fn field_kind(&self, field_id: &str) -> Option<FieldKind> {
        let element = self.element(field_id)?;
        let input_type = element.get_attribute("type");
        Some(FieldKind::classify(&element.tag_name(), input_type.as_deref()))
    }

    fn field_value(&self, field_id: &str) -> Option<String> {
        let element = self.element(field_id)?;
        js_sys::Reflect::get(&element, &JsValue::from_str("value"))
            .ok()?
            .as_string()
    }

    fn set_field_value(&self, field_id: &str, value: &str) -> bool {
        let Some(element) = self.element(field_id) else {
            return false;
        };
        js_sys::Reflect::set(
            &element,
            &JsValue::from_str("value"),
            &JsValue::from_str(value),
        )
        .unwrap_or(false)
    }

    fn checked_radio_value(&self, group: &str) -> Option<String> {
        self.radios_in_group(group)
            .into_iter()
            .find(HtmlInputElement::checked)
            .map(|radio| radio.value())
    }

    fn check_radio(&self, group: &str, value: &str) -> bool {
        let Some(radio) = self
            .radios_in_group(group)
            .into_iter()
            .find(|radio| radio.value() == value)
        else {
            return false;
        };
        radio.set_checked(true);
        true
    }

    fn radio_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for radio in self.radios() {
            let name = radio.name();
            if !name.is_empty() && !groups.contains(&name) {
                groups.push(name);
            }
        }
        groups
    }
}

impl ToastSurface for DomPage {
    fn mount_container(&self) -> Result<(), DomError> {
        if self.element(TOAST_CONTAINER_ID).is_some() {
            return Ok(());
        }
        let body = self
            .document
            .body()
            .ok_or_else(|| DomError::new("document body is unavailable"))?;
        let container = self.create_html(TOAST_ELEMENT_TAG)?;
        container.set_id(TOAST_CONTAINER_ID);
        container
            .set_attribute("style", TOAST_CONTAINER_STYLE)
            .map_err(|_| DomError::new("failed to style toast container"))?;
        body.append_child(&container)
            .map_err(|_| DomError::new("failed to mount toast container"))?;
        Ok(())
    }

    fn append_toast(&self, id: ToastId, kind: ToastKind, message: &str) -> Result<(), DomError> {
        let container = self.container()?;
        let toast = self.create_html(TOAST_ELEMENT_TAG)?;
        toast
            .set_attribute("style", &kind.style())
            .map_err(|_| DomError::new("failed to style toast"))?;

        let icon = self.create_html(TOAST_ICON_TAG)?;
        icon.set_attribute("style", TOAST_ICON_STYLE)
            .map_err(|_| DomError::new("failed to style toast icon"))?;
        icon.set_text_content(Some(kind.icon()));
        let text = self.create_html(TOAST_ICON_TAG)?;
        text.set_text_content(Some(message));

        toast
            .append_child(&icon)
            .and_then(|_| toast.append_child(&text))
            .and_then(|_| container.append_child(&toast))
            .map_err(|_| DomError::new("failed to append toast"))?;
        self.toasts.borrow_mut().insert(id, toast);
        Ok(())
    }

    fn set_toast_shown(&self, id: ToastId, shown: bool) {
        let toasts = self.toasts.borrow();
        let Some(toast) = toasts.get(&id) else {
            return;
        };
        let transform = if shown {
            TOAST_SHOWN_TRANSFORM
        } else {
            TOAST_HIDDEN_TRANSFORM
        };
        if toast.style().set_property("transform", transform).is_err() {
            tracing::warn!(toast = id.0, "failed to update toast transform");
        }
    }

    fn remove_toast(&self, id: ToastId) {
        let removed = self.toasts.borrow_mut().remove(&id);
        if let Some(toast) = removed {
            toast.remove();
        }
    }
}
