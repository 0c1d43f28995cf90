use super::*;

/// `fetch`-backed transport. Non-2xx statuses are returned as responses;
/// only a failed or timed-out exchange is an error.
pub(super) struct FetchTransport;

#[async_trait(?Send)]
impl HttpTransport for FetchTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let controller = web_sys::AbortController::new()
            .map_err(|_| ApiError::Request("abort controller is unavailable".to_string()))?;
        let signal = controller.signal();

        let mut request_builder = RequestBuilder::new(&request.url)
            .method(map_method(request.method))
            .abort_signal(Some(&signal));
        for (header_name, header_value) in &request.headers {
            request_builder = request_builder.header(header_name, header_value);
        }

        let outgoing = match request.body {
            Some(body) => request_builder.body(body),
            None => request_builder.build(),
        }
        .map_err(|error| ApiError::Request(error.to_string()))?;

        let timeout = request.timeout.min(MAX_TIMER_DELAY);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let exchange = outgoing.send().fuse();
        let deadline = sleep(timeout).fuse();
        pin_mut!(exchange, deadline);

        let response = select! {
            result = exchange => result.map_err(map_network_error)?,
            () = deadline => {
                controller.abort();
                return Err(ApiError::Timeout { timeout_ms });
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| ApiError::Decode(error.to_string()))?;
        Ok(ApiResponse::new(status, body))
    }
}

fn map_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn map_network_error(error: gloo_net::Error) -> ApiError {
    ApiError::Network(error.to_string())
}

pub(super) struct BrowserNavigator {
    window: web_sys::Window,
}

impl BrowserNavigator {
    pub(super) fn new(window: web_sys::Window) -> Self {
        Self { window }
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&self, location: &str) {
        if let Err(error) = self.window.location().set_href(location) {
            tracing::error!(location, ?error, "navigation failed");
        }
    }

    fn confirm(&self, message: &str) -> bool {
        self.window.confirm_with_message(message).unwrap_or(false)
    }
}
