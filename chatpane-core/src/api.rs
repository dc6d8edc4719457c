//! Remote chat API abstraction.
//!
//! Defines the [`ChatApi`] trait for the two endpoints the widget talks to
//! (a streaming one and a plain JSON one), the request and response bodies,
//! and the [`ApiError`] type.

mod http;
mod mock;

pub use http::HttpChatApi;
pub use mock::{Endpoint, FallbackBehavior, MockChatApi, StreamBehavior};

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::message::{ConversationTurn, Mode};

/// Base URL of the development server, used when none is configured.
pub const LOCAL_BASE_URL: &str = "http://127.0.0.1:8000";

/// Path of the streaming endpoint.
pub const DEFAULT_STREAM_PATH: &str = "/api/chat_stream";

/// Path of the non-streaming endpoint.
pub const DEFAULT_CHAT_PATH: &str = "/api/chat";

/// Raw reply bytes as they arrive from the streaming endpoint.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

/// Error type for chat API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the connection broke.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The endpoint answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// URL of the endpoint.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response has no body that can be read incrementally.
    #[error("streaming response body unavailable")]
    StreamUnavailable,

    /// The non-streaming endpoint returned something other than the
    /// expected JSON.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Whether this error on the streaming endpoint means "use the
    /// non-streaming endpoint instead" rather than "give up".
    pub fn is_fallback_signal(&self) -> bool {
        matches!(self, ApiError::Status { .. } | ApiError::StreamUnavailable)
    }
}

/// Body of a request to either endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The message just submitted.
    pub message: String,
    /// Conversation so far.
    pub history: Vec<ConversationTurn>,
    /// Response mode chosen in the UI.
    pub mode: Mode,
}

impl ChatRequest {
    /// Build a request body.
    pub fn new(message: impl Into<String>, history: Vec<ConversationTurn>, mode: Mode) -> Self {
        Self {
            message: message.into(),
            history,
            mode,
        }
    }
}

/// Body returned by the non-streaming endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackResponse {
    /// The reply; absent or `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub response: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// URLs of the two endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Streaming endpoint.
    pub stream: String,
    /// Non-streaming endpoint.
    pub chat: String,
}

impl Endpoints {
    /// Join `base_url` with the two endpoint paths.
    pub fn new(base_url: &str, stream_path: &str, chat_path: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            stream: format!("{}/{}", base, stream_path.trim_start_matches('/')),
            chat: format!("{}/{}", base, chat_path.trim_start_matches('/')),
        }
    }

    /// Endpoints on `base_url` with the default paths.
    pub fn with_base(base_url: &str) -> Self {
        Self::new(base_url, DEFAULT_STREAM_PATH, DEFAULT_CHAT_PATH)
    }

    /// Resolve endpoints from configuration, defaulting to the local
    /// development server.
    pub fn from_config(config: &ApiConfig) -> Self {
        let base = config.base_url.as_deref().unwrap_or(LOCAL_BASE_URL);
        Self::new(base, &config.stream_path, &config.chat_path)
    }

    /// Whether the endpoints point at a local server.
    pub fn is_local(&self) -> bool {
        reqwest::Url::parse(&self.stream)
            .ok()
            .and_then(|url| url.host_str().map(|h| h == "localhost" || h == "127.0.0.1"))
            .unwrap_or(false)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::with_base(LOCAL_BASE_URL)
    }
}

/// A remote chat service.
///
/// Implementations must be thread-safe (`Send + Sync`) for use in async
/// contexts.
///
/// # Examples
///
/// ```
/// use chatpane_core::api::{ChatApi, ChatRequest, MockChatApi};
/// use chatpane_core::message::Mode;
///
/// # async fn example() {
/// let api = MockChatApi::new().with_fallback_response("Hello!");
/// let request = ChatRequest::new("Hi", Vec::new(), Mode::Short);
///
/// let reply = api.chat(&request).await.unwrap();
/// assert_eq!(reply, "Hello!");
/// # }
/// ```
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Call the streaming endpoint and return its body as a byte stream.
    ///
    /// A non-success status is reported as [`ApiError::Status`] before any
    /// byte is read.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream, ApiError>;

    /// Call the non-streaming endpoint and return the whole reply.
    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_shape() {
        let request = ChatRequest::new(
            "and now?",
            vec![
                ConversationTurn::user("hi"),
                ConversationTurn::assistant("hello"),
            ],
            Mode::Long,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "and now?",
                "history": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"}
                ],
                "mode": "long"
            })
        );
    }

    #[test]
    fn test_fallback_response_parsing() {
        let ok: FallbackResponse = serde_json::from_str(r#"{"response":"ok"}"#).unwrap();
        assert_eq!(ok.response, "ok");

        let missing: FallbackResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.response, "");

        let null: FallbackResponse = serde_json::from_str(r#"{"response":null}"#).unwrap();
        assert_eq!(null.response, "");

        assert!(serde_json::from_str::<FallbackResponse>("not json").is_err());
    }

    #[test]
    fn test_fallback_signal_classification() {
        assert!(ApiError::StreamUnavailable.is_fallback_signal());
        assert!(
            ApiError::Status {
                endpoint: "x".to_string(),
                status: 502
            }
            .is_fallback_signal()
        );
        assert!(!ApiError::RequestFailed("refused".to_string()).is_fallback_signal());
        assert!(!ApiError::InvalidResponse("bad".to_string()).is_fallback_signal());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            endpoint: "http://h/api/chat".to_string(),
            status: 500,
        };
        assert_eq!(err.to_string(), "http://h/api/chat returned HTTP 500");
    }

    #[test]
    fn test_endpoints_default_is_local() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.stream, "http://127.0.0.1:8000/api/chat_stream");
        assert_eq!(endpoints.chat, "http://127.0.0.1:8000/api/chat");
        assert!(endpoints.is_local());
    }

    #[test]
    fn test_endpoints_join_slashes() {
        let endpoints = Endpoints::new("https://chat.example.com/", "/api/s", "api/c");
        assert_eq!(endpoints.stream, "https://chat.example.com/api/s");
        assert_eq!(endpoints.chat, "https://chat.example.com/api/c");
        assert!(!endpoints.is_local());
    }

    #[test]
    fn test_endpoints_from_config() {
        let config = ApiConfig {
            base_url: Some("http://localhost:9000".to_string()),
            ..ApiConfig::default()
        };
        let endpoints = Endpoints::from_config(&config);
        assert_eq!(endpoints.stream, "http://localhost:9000/api/chat_stream");
        assert!(endpoints.is_local());

        let endpoints = Endpoints::from_config(&ApiConfig::default());
        assert_eq!(endpoints, Endpoints::default());
    }
}
