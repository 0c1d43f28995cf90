#[cfg(target_arch = "wasm32")]
mod wasm_constants;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::{FutureExt, pin_mut, select};
    use gloo_net::http::{Method, RequestBuilder};
    use gloo_timers::callback::{Interval, Timeout};
    use gloo_timers::future::sleep;
    use portal_client_core::toast::{
        TOAST_CONTAINER_ID, TOAST_CONTAINER_STYLE, TOAST_HIDDEN_TRANSFORM, TOAST_ICON_STYLE,
        TOAST_SHOWN_TRANSFORM,
    };
    use portal_client_core::{
        ApiError, ApiRequest, ApiResponse, CallOptions, ConfigError, CurrentUser, DomError,
        FieldKind, FormPersist, FormView, HttpMethod, HttpTransport, KeyValueStore, MemoryStore,
        Navigator, PageContext, PageServices, PageView, PortalConfig, Scheduler, StorageError,
        TimerHandle, ToastId, ToastKind, ToastSurface, UserCallback,
    };
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::future_to_promise;
    use web_sys::{Document, Element, EventTarget, HtmlElement, HtmlInputElement};

    use crate::wasm_constants::*;

    mod dom;
    mod lifecycle;
    mod network;
    mod storage;
    mod timers;

    use dom::{BoundListener, DomPage};
    use lifecycle::*;
    use network::{BrowserNavigator, FetchTransport};
    use storage::BrowserStorage;
    use timers::BrowserScheduler;

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
    }

    /// Page controller handed to JavaScript. One per loaded page; it owns
    /// the page context and every DOM listener it installs.
    #[wasm_bindgen]
    pub struct PortalPage {
        context: Rc<PageContext>,
        dom: Rc<DomPage>,
        form: RefCell<Option<Rc<FormPersist>>>,
        form_listeners: RefCell<Vec<BoundListener>>,
        focus_listeners: RefCell<Vec<BoundListener>>,
    }

    #[wasm_bindgen]
    impl PortalPage {
        #[wasm_bindgen(constructor)]
        pub fn new(config: JsValue) -> Result<PortalPage, JsValue> {
            let (config, config_error) = match load_config(&config) {
                Ok(config) => (config, None),
                Err(error) => (PortalConfig::default(), Some(error)),
            };
            install_console_logging(&config.log_level);
            if let Some(error) = config_error {
                tracing::warn!(%error, "ignoring invalid portal config; using defaults");
            }

            let window = web_sys::window().ok_or_else(|| js_error("window is unavailable"))?;
            let document = window
                .document()
                .ok_or_else(|| js_error("document is unavailable"))?;

            let store: Rc<dyn KeyValueStore> = match BrowserStorage::local(&window) {
                Some(storage) => Rc::new(storage),
                None => {
                    tracing::warn!(
                        "localStorage is unavailable; session and drafts will not persist"
                    );
                    Rc::new(MemoryStore::new())
                }
            };
            let dom = Rc::new(DomPage::new(document));
            let services = PageServices {
                store,
                transport: Rc::new(FetchTransport),
                navigator: Rc::new(BrowserNavigator::new(window.clone())),
                scheduler: Rc::new(BrowserScheduler::new(window)),
                page_view: dom.clone(),
                form_view: dom.clone(),
                toast_surface: dom.clone(),
            };

            Ok(PortalPage {
                context: Rc::new(PageContext::new(config, services)),
                dom,
                form: RefCell::new(None),
                form_listeners: RefCell::new(Vec::new()),
                focus_listeners: RefCell::new(Vec::new()),
            })
        }

        #[wasm_bindgen(js_name = configJson)]
        pub fn config_json(&self) -> String {
            serde_json::to_string(self.context.config()).unwrap_or_else(|_| "{}".to_string())
        }

        #[wasm_bindgen(js_name = apiUrl)]
        pub fn api_url(&self, path: &str) -> String {
            self.context.config().api_url(path)
        }

        #[wasm_bindgen(js_name = saveToken)]
        pub fn save_token(&self, token: &str, username: &str) -> Result<(), JsValue> {
            self.context
                .session()
                .save(token, username)
                .map_err(|error| js_error(&error.to_string()))
        }

        #[wasm_bindgen(js_name = getToken)]
        pub fn get_token(&self) -> Option<String> {
            self.context.session().token()
        }

        #[wasm_bindgen(js_name = getUsername)]
        pub fn get_username(&self) -> Option<String> {
            self.context.session().username()
        }

        #[wasm_bindgen(js_name = clearToken)]
        pub fn clear_token(&self) {
            self.context.session().clear();
        }

        #[wasm_bindgen(js_name = isLoggedIn)]
        pub fn is_logged_in(&self) -> bool {
            self.context.session().is_logged_in()
        }

        /// Resolves to `{status, ok, body}`; rejects on transport failure.
        #[wasm_bindgen(js_name = apiCall)]
        pub fn api_call(&self, endpoint: String, options: JsValue) -> js_sys::Promise {
            let context = Rc::clone(&self.context);
            future_to_promise(async move {
                let options = call_options_from_js(&options)?;
                let response = context
                    .api()
                    .call(&endpoint, options)
                    .await
                    .map_err(|error| js_error(&error.to_string()))?;
                response_to_js(&response)
            })
        }

        /// Resolves to the current user, or `null` when not authenticated.
        #[wasm_bindgen(js_name = checkAuth)]
        pub fn check_auth(&self, callback: Option<js_sys::Function>) -> js_sys::Promise {
            let context = Rc::clone(&self.context);
            let callback = callback.map(js_user_callback);
            future_to_promise(async move {
                let user = context.auth().check_auth(callback).await;
                user_to_js(user.as_ref())
            })
        }

        #[wasm_bindgen(js_name = loadUserInfoWithRbac)]
        pub fn load_user_info_with_rbac(
            &self,
            callback: Option<js_sys::Function>,
        ) -> js_sys::Promise {
            let context = Rc::clone(&self.context);
            let callback = callback.map(js_user_callback);
            future_to_promise(async move {
                let user = context.auth().load_user_info_with_rbac(callback).await;
                user_to_js(user.as_ref())
            })
        }

        pub fn logout(&self) -> bool {
            self.context.auth().logout()
        }

        #[wasm_bindgen(js_name = showAdminOnlyLinks)]
        pub fn show_admin_only_links(&self) {
            self.context.auth().show_admin_only_links();
        }

        #[wasm_bindgen(js_name = currentUserJson)]
        pub fn current_user_json(&self) -> String {
            self.context
                .auth()
                .current_user()
                .and_then(|user| serde_json::to_string(&user).ok())
                .unwrap_or_else(|| "null".to_string())
        }

        /// Restores the page's draft and wires save-on-change listeners.
        /// Calling it again replaces the previous binding.
        #[wasm_bindgen(js_name = formPersistInit)]
        pub fn form_persist_init(&self, page: String, fields: Vec<String>) -> Result<(), JsValue> {
            self.form_listeners.borrow_mut().clear();

            let persist = Rc::new(self.context.form_persist(&page, fields));
            let bindings = persist.init();
            let mut listeners = Vec::new();

            for binding in &bindings.fields {
                let Some(element) = self.dom.element(&binding.field_id) else {
                    continue;
                };
                let persist = Rc::clone(&persist);
                listeners.push(BoundListener::attach(
                    element.into(),
                    binding.trigger.event_name(),
                    move |_event| persist.save(),
                )?);
            }

            for group in &bindings.radio_groups {
                for radio in self.dom.radios_in_group(group) {
                    let persist = Rc::clone(&persist);
                    let group = group.clone();
                    listeners.push(BoundListener::attach(
                        radio.into(),
                        "change",
                        move |_event| persist.save_radio(&group),
                    )?);
                }
            }

            tracing::debug!(
                page = persist.page_key(),
                tracked = persist.field_ids().len(),
                listeners = listeners.len(),
                "form persistence bound"
            );
            *self.form_listeners.borrow_mut() = listeners;
            *self.form.borrow_mut() = Some(persist);
            Ok(())
        }

        #[wasm_bindgen(js_name = formPersistSave)]
        pub fn form_persist_save(&self) {
            if let Some(persist) = self.form.borrow().as_ref() {
                persist.save();
            }
        }

        #[wasm_bindgen(js_name = formPersistClear)]
        pub fn form_persist_clear(&self) {
            if let Some(persist) = self.form.borrow().as_ref() {
                persist.clear();
            }
        }

        #[wasm_bindgen(js_name = formDraftJson)]
        pub fn form_draft_json(&self) -> String {
            self.form
                .borrow()
                .as_ref()
                .and_then(|persist| serde_json::to_string(&persist.draft()).ok())
                .unwrap_or_else(|| "{}".to_string())
        }

        #[wasm_bindgen(js_name = autoRefreshStart)]
        pub fn auto_refresh_start(&self, name: &str, callback: js_sys::Function, interval_ms: u32) {
            self.context.refresh().start(
                name,
                js_tick(name, callback),
                Duration::from_millis(u64::from(interval_ms)),
            );
        }

        #[wasm_bindgen(js_name = autoRefreshStop)]
        pub fn auto_refresh_stop(&self, name: &str) {
            self.context.refresh().stop(name);
        }

        #[wasm_bindgen(js_name = autoRefreshChangeInterval)]
        pub fn auto_refresh_change_interval(
            &self,
            name: &str,
            callback: js_sys::Function,
            new_interval_ms: u32,
        ) {
            self.context.refresh().change_interval(
                name,
                js_tick(name, callback),
                Duration::from_millis(u64::from(new_interval_ms)),
            );
        }

        /// Pauses every refresh timer while the form has focus.
        #[wasm_bindgen(js_name = pauseWhileTyping)]
        pub fn pause_while_typing(&self, form_id: &str) -> Result<(), JsValue> {
            let Some(form) = self.dom.element(form_id) else {
                tracing::debug!(form_id, "pauseWhileTyping: form not found");
                return Ok(());
            };
            let target: EventTarget = form.into();

            let context = Rc::clone(&self.context);
            let focus_in = BoundListener::attach(target.clone(), FOCUS_IN_EVENT, move |_event| {
                context.refresh().typing_started();
            })?;
            let context = Rc::clone(&self.context);
            let focus_out = BoundListener::attach(target, FOCUS_OUT_EVENT, move |_event| {
                context.refresh().typing_ended();
            })?;

            let mut listeners = self.focus_listeners.borrow_mut();
            listeners.push(focus_in);
            listeners.push(focus_out);
            Ok(())
        }

        #[wasm_bindgen(js_name = isUserTyping)]
        pub fn is_user_typing(&self) -> bool {
            self.context.refresh().is_user_typing()
        }

        #[wasm_bindgen(js_name = toastShow)]
        pub fn toast_show(
            &self,
            message: &str,
            kind: Option<String>,
            duration_ms: Option<u32>,
        ) -> Result<(), JsValue> {
            let kind = kind.as_deref().map(ToastKind::parse).unwrap_or_default();
            let duration = duration_ms.map_or(
                portal_client_core::toast::DEFAULT_TOAST_DURATION,
                |ms| Duration::from_millis(u64::from(ms)),
            );
            self.context
                .toasts()
                .show(message, kind, duration)
                .map(|_| ())
                .map_err(|error| js_error(&error.to_string()))
        }
    }

    fn js_error(message: &str) -> JsValue {
        js_sys::Error::new(message).into()
    }

    fn js_tick(name: &str, callback: js_sys::Function) -> impl FnMut() + 'static {
        let name = name.to_string();
        move || {
            if let Err(error) = callback.call0(&JsValue::NULL) {
                tracing::error!(timer = %name, ?error, "refresh callback threw");
            }
        }
    }

    fn js_user_callback(callback: js_sys::Function) -> UserCallback {
        Box::new(move |user: &CurrentUser| {
            let value = match user_to_js(Some(user)) {
                Ok(value) => value,
                Err(error) => {
                    tracing::error!(?error, "failed to convert user for callback");
                    return;
                }
            };
            if let Err(error) = callback.call1(&JsValue::NULL, &value) {
                tracing::error!(?error, "user callback threw");
            }
        })
    }

    fn user_to_js(user: Option<&CurrentUser>) -> Result<JsValue, JsValue> {
        let Some(user) = user else {
            return Ok(JsValue::NULL);
        };
        let raw = serde_json::to_string(user).map_err(|error| js_error(&error.to_string()))?;
        js_sys::JSON::parse(&raw)
    }

    fn call_options_from_js(options: &JsValue) -> Result<CallOptions, JsValue> {
        if options.is_undefined() || options.is_null() {
            return Ok(CallOptions::default());
        }
        let raw: String = js_sys::JSON::stringify(options)?.into();
        serde_json::from_str(&raw)
            .map_err(|error| js_error(&format!("invalid api call options: {error}")))
    }

    fn response_to_js(response: &ApiResponse) -> Result<JsValue, JsValue> {
        let object = js_sys::Object::new();
        js_sys::Reflect::set(
            &object,
            &JsValue::from_str("status"),
            &JsValue::from(response.status),
        )?;
        js_sys::Reflect::set(
            &object,
            &JsValue::from_str("ok"),
            &JsValue::from_bool(response.is_success()),
        )?;
        js_sys::Reflect::set(
            &object,
            &JsValue::from_str("body"),
            &JsValue::from_str(&response.body),
        )?;
        Ok(object.into())
    }
}
