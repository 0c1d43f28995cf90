pub(crate) const CONFIG_GLOBAL: &str = "__PORTAL_CONFIG__";
pub(crate) const FOCUS_IN_EVENT: &str = "focusin";
pub(crate) const FOCUS_OUT_EVENT: &str = "focusout";
pub(crate) const RADIO_SELECTOR: &str = "input[type=\"radio\"]";
pub(crate) const TOAST_ELEMENT_TAG: &str = "div";
pub(crate) const TOAST_ICON_TAG: &str = "span";
pub(crate) const MAX_TIMER_DELAY: std::time::Duration =
    std::time::Duration::from_millis(portal_client_core::config::MAX_TIMER_DELAY_MS);
