use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::PortalConfig;
use crate::error::ApiError;
use crate::session::SessionStore;

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unsupported http method `{raw}`")))
    }
}

/// Caller-supplied part of an API call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallOptions {
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl CallOptions {
    pub fn post_json(body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout,
        }
    }

    /// Sets `name`, replacing any existing header that differs only in case.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            existing.1 = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|error| ApiError::Decode(error.to_string()))
    }
}

/// One request, one attempt. Implementations enforce `request.timeout`.
#[async_trait(?Send)]
pub trait HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// Page navigation and the blocking yes/no prompt.
pub trait Navigator {
    fn navigate(&self, location: &str);
    fn confirm(&self, message: &str) -> bool;
}

#[must_use]
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Wraps every outbound call: JSON and tunnel-bypass headers, bearer auth
/// when a token is stored, and the 401 redirect to login.
#[derive(Clone)]
pub struct ApiClient {
    config: Rc<PortalConfig>,
    session: SessionStore,
    transport: Rc<dyn HttpTransport>,
    navigator: Rc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        config: Rc<PortalConfig>,
        session: SessionStore,
        transport: Rc<dyn HttpTransport>,
        navigator: Rc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            session,
            transport,
            navigator,
        }
    }

    pub fn build_request(&self, endpoint: &str, options: &CallOptions) -> ApiRequest {
        let mut request = ApiRequest::new(
            options.method,
            self.config.api_url(endpoint),
            self.config.request_timeout(),
        )
        .with_header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE)
        .with_header(TUNNEL_BYPASS_HEADER, "true");

        for (name, value) in &options.headers {
            request.set_header(name, value);
        }

        if let Some(token) = self.session.token().filter(|token| !token.is_empty()) {
            request.set_header(AUTHORIZATION_HEADER, &bearer(&token));
        }

        request.body = options.body.clone();
        request
    }

    pub async fn call(
        &self,
        endpoint: &str,
        options: CallOptions,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.build_request(endpoint, &options);
        let method = request.method.as_str();
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(%error, endpoint, method, "api call failed");
                return Err(error);
            }
        };

        if response.is_unauthorized() {
            tracing::debug!(endpoint, "api call unauthorized; clearing session");
            self.session.clear();
            self.navigator.navigate(&self.config.login_url);
        }

        Ok(response)
    }

    /// Sends a fully built request without the 401 redirect.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.transport.send(request).await
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn navigator(&self) -> &Rc<dyn Navigator> {
        &self.navigator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::{RecordingNavigator, StubTransport};
    use futures::executor::block_on;

    struct Fixture {
        client: ApiClient,
        session: SessionStore,
        transport: Rc<StubTransport>,
        navigator: Rc<RecordingNavigator>,
    }

    fn fixture() -> Fixture {
        let config = Rc::new(PortalConfig::default());
        let session = SessionStore::new(Rc::new(MemoryStore::new()), &config);
        let transport = Rc::new(StubTransport::new());
        let navigator = Rc::new(RecordingNavigator::new(true));
        let client = ApiClient::new(
            config,
            session.clone(),
            transport.clone(),
            navigator.clone(),
        );
        Fixture {
            client,
            session,
            transport,
            navigator,
        }
    }

    #[test]
    fn build_request_merges_headers_in_order() {
        let fixture = fixture();
        fixture.session.save("tok-9", "bob").expect("save");
        let mut options = CallOptions::default();
        options
            .headers
            .insert("content-type".to_string(), "text/plain".to_string());
        options
            .headers
            .insert("authorization".to_string(), "Basic nope".to_string());
        options.headers.insert("X-Trace".to_string(), "1".to_string());

        let request = fixture.client.build_request("/jobs", &options);
        assert_eq!(request.url, "http://localhost:8000/jobs");
        assert_eq!(request.header("Content-Type"), Some("text/plain"));
        assert_eq!(request.header(TUNNEL_BYPASS_HEADER), Some("true"));
        assert_eq!(request.header("x-trace"), Some("1"));
        assert_eq!(request.header(AUTHORIZATION_HEADER), Some("Bearer tok-9"));
        assert_eq!(request.timeout, Duration::from_secs(30));
    }

    #[test]
    fn build_request_omits_authorization_without_token() {
        let fixture = fixture();
        let request = fixture.client.build_request("/public", &CallOptions::default());
        assert_eq!(request.header(AUTHORIZATION_HEADER), None);
        assert_eq!(request.header(CONTENT_TYPE_HEADER), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn unauthorized_response_clears_session_and_redirects() {
        let fixture = fixture();
        fixture.session.save("stale", "carol").expect("save");
        fixture.transport.push_response(ApiResponse::new(401, "{}"));

        let response = block_on(fixture.client.call("/jobs", CallOptions::default()))
            .expect("401 is still returned");
        assert_eq!(response.status, 401);
        assert_eq!(fixture.session.token(), None);
        assert_eq!(fixture.session.username(), None);
        assert_eq!(fixture.navigator.navigations(), vec!["index.html".to_string()]);
    }

    #[test]
    fn success_response_leaves_session_alone() {
        let fixture = fixture();
        fixture.session.save("tok", "dave").expect("save");
        fixture
            .transport
            .push_response(ApiResponse::new(200, r#"{"ok":true}"#));

        let response = block_on(fixture.client.call(
            "/content",
            CallOptions::post_json(r#"{"title":"x"}"#),
        ))
        .expect("response");
        assert!(response.is_success());
        assert!(fixture.session.is_logged_in());
        assert!(fixture.navigator.navigations().is_empty());

        let sent = fixture.transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"title":"x"}"#));
    }

    #[test]
    fn transport_failure_is_returned_without_retry() {
        let fixture = fixture();
        fixture
            .transport
            .push_error(ApiError::Network("connection refused".to_string()));

        let error = block_on(fixture.client.call("/jobs", CallOptions::default()))
            .expect_err("network error");
        assert_eq!(error, ApiError::Network("connection refused".to_string()));
        assert_eq!(fixture.transport.requests().len(), 1);
        assert!(fixture.navigator.navigations().is_empty());
    }

    #[test]
    fn call_options_deserialize_from_fetch_style_object() {
        let options: CallOptions = serde_json::from_str(
            r#"{"method":"DELETE","headers":{"X-Id":"7"},"body":null}"#,
        )
        .expect("options");
        assert_eq!(options.method, HttpMethod::Delete);
        assert_eq!(options.headers.get("X-Id").map(String::as_str), Some("7"));

        let lowercase: CallOptions =
            serde_json::from_str(r#"{"method":"post"}"#).expect("lowercase method");
        assert_eq!(lowercase.method, HttpMethod::Post);
        assert!(serde_json::from_str::<CallOptions>(r#"{"method":"TRACE"}"#).is_err());
    }

    #[test]
    fn http_method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse("patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::parse("TRACE"), None);
    }

    #[test]
    fn response_json_reports_decode_errors() {
        let response = ApiResponse::new(200, "not json");
        let error = response
            .json::<serde_json::Value>()
            .expect_err("decode error");
        assert!(matches!(error, ApiError::Decode(_)));
    }
}
