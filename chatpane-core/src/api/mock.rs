//! Mock chat API for testing.
//!
//! Provides [`MockChatApi`], a scripted implementation of [`ChatApi`] that
//! also records every request it receives.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use super::{ApiError, ChatApi, ChatRequest, ChatStream};

/// What the streaming endpoint does.
#[derive(Debug, Clone)]
pub enum StreamBehavior {
    /// Deliver these chunks, then end.
    Chunks(Vec<Bytes>),
    /// Deliver these chunks, then fail with a transport error.
    ChunksThenError(Vec<Bytes>, String),
    /// Answer with this non-success status.
    Status(u16),
    /// Answer without a readable body.
    Unavailable,
    /// Fail before any response arrives.
    TransportError(String),
    /// Open the stream but never deliver anything.
    Stalled,
}

/// What the non-streaming endpoint does.
#[derive(Debug, Clone)]
pub enum FallbackBehavior {
    /// Answer with this reply.
    Response(String),
    /// Answer with this non-success status.
    Status(u16),
    /// Answer with a body that is not the expected JSON.
    Malformed,
    /// Fail before any response arrives.
    TransportError(String),
}

/// Which endpoint a recorded request went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The streaming endpoint.
    Stream,
    /// The non-streaming endpoint.
    Chat,
}

/// A scripted chat API for testing.
///
/// By default the streaming endpoint delivers `"Mock response"` in one
/// chunk and the non-streaming endpoint answers `"Mock response"`.
///
/// # Examples
///
/// ```
/// use chatpane_core::api::{ChatApi, ChatRequest, MockChatApi};
/// use chatpane_core::message::Mode;
///
/// # async fn example() {
/// let api = MockChatApi::new().with_stream_status(503).with_fallback_response("ok");
/// let request = ChatRequest::new("Hi", Vec::new(), Mode::Short);
///
/// assert!(api.stream_chat(&request).await.is_err());
/// assert_eq!(api.chat(&request).await.unwrap(), "ok");
/// assert_eq!(api.requests().len(), 2);
/// # }
/// ```
#[derive(Debug)]
pub struct MockChatApi {
    stream: StreamBehavior,
    fallback: FallbackBehavior,
    requests: Mutex<Vec<(Endpoint, ChatRequest)>>,
}

impl MockChatApi {
    /// Create a mock with the default behaviours.
    pub fn new() -> Self {
        Self {
            stream: StreamBehavior::Chunks(vec![Bytes::from_static(b"Mock response")]),
            fallback: FallbackBehavior::Response("Mock response".to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Stream the given text chunks.
    #[must_use]
    pub fn with_stream_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks = chunks
            .into_iter()
            .map(|c| Bytes::from(c.into().into_bytes()))
            .collect();
        self.with_stream(StreamBehavior::Chunks(chunks))
    }

    /// Answer the streaming endpoint with a non-success status.
    #[must_use]
    pub fn with_stream_status(self, status: u16) -> Self {
        self.with_stream(StreamBehavior::Status(status))
    }

    /// Set the streaming behaviour.
    #[must_use]
    pub fn with_stream(mut self, behavior: StreamBehavior) -> Self {
        self.stream = behavior;
        self
    }

    /// Answer the non-streaming endpoint with `response`.
    #[must_use]
    pub fn with_fallback_response(self, response: impl Into<String>) -> Self {
        self.with_fallback(FallbackBehavior::Response(response.into()))
    }

    /// Set the non-streaming behaviour.
    #[must_use]
    pub fn with_fallback(mut self, behavior: FallbackBehavior) -> Self {
        self.fallback = behavior;
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<(Endpoint, ChatRequest)> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, endpoint: Endpoint, request: &ChatRequest) {
        let mut requests = match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        requests.push((endpoint, request.clone()));
    }
}

impl Default for MockChatApi {
    fn default() -> Self {
        Self::new()
    }
}

fn mock_status(endpoint: &str, status: u16) -> ApiError {
    ApiError::Status {
        endpoint: endpoint.to_string(),
        status,
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream, ApiError> {
        self.record(Endpoint::Stream, request);
        match &self.stream {
            StreamBehavior::Chunks(chunks) => {
                let items: Vec<Result<Bytes, ApiError>> =
                    chunks.iter().cloned().map(Ok).collect();
                Ok(Box::pin(stream::iter(items)))
            }
            StreamBehavior::ChunksThenError(chunks, message) => {
                let mut items: Vec<Result<Bytes, ApiError>> =
                    chunks.iter().cloned().map(Ok).collect();
                items.push(Err(ApiError::RequestFailed(message.clone())));
                Ok(Box::pin(stream::iter(items)))
            }
            StreamBehavior::Status(status) => Err(mock_status("mock://stream", *status)),
            StreamBehavior::Unavailable => Err(ApiError::StreamUnavailable),
            StreamBehavior::TransportError(message) => {
                Err(ApiError::RequestFailed(message.clone()))
            }
            StreamBehavior::Stalled => Ok(Box::pin(stream::pending())),
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        self.record(Endpoint::Chat, request);
        match &self.fallback {
            FallbackBehavior::Response(response) => Ok(response.clone()),
            FallbackBehavior::Status(status) => Err(mock_status("mock://chat", *status)),
            FallbackBehavior::Malformed => Err(ApiError::InvalidResponse(
                "expected value at line 1 column 1".to_string(),
            )),
            FallbackBehavior::TransportError(message) => {
                Err(ApiError::RequestFailed(message.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::message::Mode;

    fn request() -> ChatRequest {
        ChatRequest::new("Hello", Vec::new(), Mode::Short)
    }

    async fn collect(stream: ChatStream) -> Vec<Result<Bytes, ApiError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_mock_default_responses() {
        let api = MockChatApi::new();

        let chunks = collect(api.stream_chat(&request()).await.unwrap()).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().as_ref(), b"Mock response");

        assert_eq!(api.chat(&request()).await.unwrap(), "Mock response");
    }

    #[tokio::test]
    async fn test_mock_stream_chunks_in_order() {
        let api = MockChatApi::new().with_stream_chunks(["H", "i!"]);
        let chunks = collect(api.stream_chat(&request()).await.unwrap()).await;
        let bytes: Vec<u8> = chunks
            .into_iter()
            .flat_map(|c| c.unwrap().to_vec())
            .collect();
        assert_eq!(bytes, b"Hi!");
    }

    #[tokio::test]
    async fn test_mock_stream_error_after_chunks() {
        let api = MockChatApi::new().with_stream(StreamBehavior::ChunksThenError(
            vec![Bytes::from_static(b"par")],
            "reset".to_string(),
        ));
        let chunks = collect(api.stream_chat(&request()).await.unwrap()).await;
        assert!(chunks[0].is_ok());
        assert!(matches!(chunks[1], Err(ApiError::RequestFailed(_))));
    }

    #[tokio::test]
    async fn test_mock_stalled_stream_never_yields() {
        use futures::FutureExt;

        let api = MockChatApi::new().with_stream(StreamBehavior::Stalled);
        let mut stream = api.stream_chat(&request()).await.unwrap();
        assert!(stream.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn test_mock_failures() {
        let api = MockChatApi::new()
            .with_stream_status(500)
            .with_fallback(FallbackBehavior::Malformed);

        let err = api.stream_chat(&request()).await.err().unwrap();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));

        let err = api.chat(&request()).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let api = MockChatApi::new();
        api.stream_chat(&request()).await.ok();
        api.chat(&request()).await.ok();

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0, Endpoint::Stream);
        assert_eq!(requests[1].0, Endpoint::Chat);
        assert_eq!(requests[1].1.message, "Hello");
    }

    #[tokio::test]
    async fn test_chat_api_is_object_safe() {
        let api: Box<dyn ChatApi> = Box::new(MockChatApi::new().with_fallback_response("x"));
        assert_eq!(api.chat(&request()).await.unwrap(), "x");
    }
}
