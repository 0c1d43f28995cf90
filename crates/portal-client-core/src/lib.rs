//! Shared client core for portal pages.
//!
//! Everything here is target-independent: browser storage, fetch, timers and
//! DOM access sit behind the traits in [`storage`], [`api`], [`scheduler`],
//! [`auth`], [`form_persist`] and [`toast`]. The `portal-web-shell` crate
//! implements those traits over `web-sys` for `wasm32`.

pub mod api;
pub mod auth;
pub mod auto_refresh;
pub mod config;
pub mod error;
pub mod form_persist;
pub mod page;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod toast;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{
    ApiClient, ApiRequest, ApiResponse, CallOptions, HttpMethod, HttpTransport, Navigator,
};
pub use auth::{AuthGate, CurrentUser, PageView, UserCallback};
pub use auto_refresh::AutoRefresh;
pub use config::PortalConfig;
pub use error::{ApiError, ConfigError, DomError, ProfileError, StorageError};
pub use form_persist::{DraftRecord, FieldKind, FieldTrigger, FormBindings, FormPersist, FormView};
pub use page::{PageContext, PageServices};
pub use scheduler::{Scheduler, TimerHandle};
pub use session::SessionStore;
pub use storage::{KeyValueStore, MemoryStore};
pub use toast::{ToastId, ToastKind, ToastSurface, Toaster};
