use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiRequest, AUTHORIZATION_HEADER, HttpMethod, bearer};
use crate::error::ProfileError;

pub const PROFILE_ENDPOINT: &str = "/auth/me";
pub const USER_DISPLAY_ID: &str = "userDisplay";
pub const USER_INITIAL_ID: &str = "userInitial";
pub const ADMIN_ONLY_ELEMENT_IDS: [&str; 3] = ["nav-jobs", "nav-users", "nav-admin-header"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
    pub role: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CurrentUser {
    /// First character of the username, uppercased.
    #[must_use]
    pub fn initial(&self) -> Option<String> {
        self.username
            .chars()
            .next()
            .map(|first| first.to_uppercase().collect())
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

/// Presence-checked element updates. Each method returns whether the element
/// existed; absence is never an error.
pub trait PageView {
    fn set_text(&self, element_id: &str, text: &str) -> bool;
    fn reveal(&self, element_id: &str) -> bool;
}

pub type UserCallback = Box<dyn FnOnce(&CurrentUser)>;

/// Session gate for a page: login check, profile fetch with role gating, and
/// logout. Owns the page's current user.
pub struct AuthGate {
    api: ApiClient,
    view: Rc<dyn PageView>,
    current_user: RefCell<Option<CurrentUser>>,
}

impl AuthGate {
    pub fn new(api: ApiClient, view: Rc<dyn PageView>) -> Self {
        Self {
            api,
            view,
            current_user: RefCell::new(None),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.api.session().is_logged_in()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.current_user.borrow().clone()
    }

    pub async fn check_auth(&self, callback: Option<UserCallback>) -> Option<CurrentUser> {
        if !self.is_logged_in() {
            self.api.navigator().navigate(&self.api.config().login_url);
            return None;
        }
        self.load_user_info_with_rbac(callback).await
    }

    pub async fn load_user_info_with_rbac(
        &self,
        callback: Option<UserCallback>,
    ) -> Option<CurrentUser> {
        let user = match self.fetch_current_user().await {
            Ok(user) => user,
            Err(error) => {
                tracing::error!(%error, "failed to load user info");
                self.logout();
                return None;
            }
        };

        *self.current_user.borrow_mut() = Some(user.clone());
        self.view.set_text(USER_DISPLAY_ID, &user.username);
        if let Some(initial) = user.initial() {
            self.view.set_text(USER_INITIAL_ID, &initial);
        }
        if user.has_role(&self.api.config().admin_role) {
            self.show_admin_only_links();
        }

        if let Some(callback) = callback {
            callback(&user);
        }
        Some(user)
    }

    pub async fn fetch_current_user(&self) -> Result<CurrentUser, ProfileError> {
        let token = self
            .api
            .session()
            .token()
            .filter(|token| !token.is_empty())
            .ok_or(ProfileError::MissingToken)?;
        let config = self.api.config();
        let request = ApiRequest::new(
            HttpMethod::Get,
            config.api_url(PROFILE_ENDPOINT),
            config.request_timeout(),
        )
        .with_header(AUTHORIZATION_HEADER, &bearer(&token));

        let response = self.api.send(request).await?;
        if !response.is_success() {
            return Err(ProfileError::Rejected {
                status: response.status,
            });
        }
        response
            .json()
            .map_err(|error| ProfileError::Malformed(error.to_string()))
    }

    /// Returns whether the user confirmed; declining changes nothing.
    pub fn logout(&self) -> bool {
        let config = self.api.config();
        let navigator = self.api.navigator();
        if !navigator.confirm(&config.logout_confirm_message) {
            return false;
        }
        self.api.session().clear();
        self.current_user.borrow_mut().take();
        navigator.navigate(&config.login_url);
        true
    }

    pub fn show_admin_only_links(&self) {
        for element_id in ADMIN_ONLY_ELEMENT_IDS {
            if !self.view.reveal(element_id) {
                tracing::debug!(element_id, "admin-only element not present");
            }
        }
    }
}
