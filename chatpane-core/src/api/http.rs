//! HTTP client for the chat endpoints.

use async_trait::async_trait;
use futures::TryStreamExt;

use super::{ApiError, ChatApi, ChatRequest, ChatStream, Endpoints, FallbackResponse};

/// [`ChatApi`] over HTTP, posting JSON to the configured endpoints.
///
/// No retries and no timeout: a request that never settles keeps the caller
/// waiting.
///
/// # Examples
///
/// ```no_run
/// use chatpane_core::api::{ChatApi, ChatRequest, Endpoints, HttpChatApi};
/// use chatpane_core::message::Mode;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let api = HttpChatApi::new(Endpoints::with_base("http://127.0.0.1:8000"));
/// let request = ChatRequest::new("Hello!", Vec::new(), Mode::Short);
///
/// let reply = api.chat(&request).await?;
/// println!("{}", reply);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    /// HTTP client for API requests.
    client: reqwest::Client,
    /// Where to send requests.
    endpoints: Endpoints,
}

impl HttpChatApi {
    /// Create a client for the given endpoints.
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    /// The endpoints this client talks to.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// POST `request` as JSON and fail on a non-success status.
    async fn post(
        &self,
        endpoint: &str,
        request: &ChatRequest,
    ) -> Result<reqwest::Response, ApiError> {
        tracing::debug!(endpoint, mode = request.mode.as_str(), "http: POST");
        let response = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        let status = response.status();
        tracing::debug!(endpoint, status = status.as_u16(), "http: response status");

        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream, ApiError> {
        let response = self.post(&self.endpoints.stream, request).await?;
        if !has_body(response.status()) {
            tracing::debug!(
                status = response.status().as_u16(),
                "http: stream response has no body"
            );
            return Err(ApiError::StreamUnavailable);
        }
        let stream = response
            .bytes_stream()
            .map_err(|e| ApiError::RequestFailed(e.to_string()));
        Ok(Box::pin(stream))
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let response = self.post(&self.endpoints.chat, request).await?;
        let body: FallbackResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        Ok(body.response)
    }
}

/// Whether a successful response with this status carries a body at all.
///
/// 204 and 205 never do, so there is nothing to stream.
fn has_body(status: reqwest::StatusCode) -> bool {
    !matches!(
        status,
        reqwest::StatusCode::NO_CONTENT | reqwest::StatusCode::RESET_CONTENT
    )
}
