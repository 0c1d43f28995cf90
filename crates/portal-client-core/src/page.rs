use std::rc::Rc;

use crate::api::{ApiClient, HttpTransport, Navigator};
use crate::auth::{AuthGate, PageView};
use crate::auto_refresh::AutoRefresh;
use crate::config::PortalConfig;
use crate::form_persist::{FormPersist, FormView};
use crate::scheduler::Scheduler;
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use crate::toast::{ToastSurface, Toaster};

/// Platform bindings a page context is built from.
pub struct PageServices {
    pub store: Rc<dyn KeyValueStore>,
    pub transport: Rc<dyn HttpTransport>,
    pub navigator: Rc<dyn Navigator>,
    pub scheduler: Rc<dyn Scheduler>,
    pub page_view: Rc<dyn PageView>,
    pub form_view: Rc<dyn FormView>,
    pub toast_surface: Rc<dyn ToastSurface>,
}

/// Everything one page owns: config, session, API client, auth gate,
/// refresh timers and toasts. One instance per loaded page.
pub struct PageContext {
    config: Rc<PortalConfig>,
    store: Rc<dyn KeyValueStore>,
    form_view: Rc<dyn FormView>,
    session: SessionStore,
    api: ApiClient,
    auth: AuthGate,
    refresh: AutoRefresh,
    toasts: Toaster,
}

impl PageContext {
    pub fn new(config: PortalConfig, services: PageServices) -> Self {
        let config = Rc::new(config);
        let session = SessionStore::new(Rc::clone(&services.store), &config);
        let api = ApiClient::new(
            Rc::clone(&config),
            session.clone(),
            services.transport,
            services.navigator,
        );
        let auth = AuthGate::new(api.clone(), services.page_view);
        let refresh = AutoRefresh::new(Rc::clone(&services.scheduler));
        let toasts = Toaster::new(services.toast_surface, services.scheduler);

        Self {
            config,
            store: services.store,
            form_view: services.form_view,
            session,
            api,
            auth,
            refresh,
            toasts,
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    pub fn refresh(&self) -> &AutoRefresh {
        &self.refresh
    }

    pub fn toasts(&self) -> &Toaster {
        &self.toasts
    }

    /// Form persistence for `page_key`, bound to this page's storage and
    /// fields. Call [`FormPersist::init`] on the result.
    pub fn form_persist(&self, page_key: &str, field_ids: Vec<String>) -> FormPersist {
        FormPersist::new(
            page_key,
            field_ids,
            Rc::clone(&self.store),
            Rc::clone(&self.form_view),
        )
    }
}
