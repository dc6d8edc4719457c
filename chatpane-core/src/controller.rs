//! Chat controller.
//!
//! Provides [`ChatController`], which turns one user submission into one
//! request/response exchange: it updates the view, keeps the conversation
//! history, tries the streaming endpoint first and the non-streaming one
//! second, and always hands the form back to the user at the end.

use crate::api::{ApiError, ChatApi, ChatRequest};
use crate::config::{Config, DEFAULT_ERROR_MESSAGE};
use crate::message::{ConversationTurn, Mode};
use crate::present::Presenter;
use crate::stream::consume_stream;
use crate::view::ChatView;

/// Where a submission currently is.
///
/// ```text
/// Idle -> Submitting -> Streaming ----------> Rendered -> Idle
///              \-> FallbackSubmitting ----/
/// any in-flight phase -> Error -> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for input; the form is enabled.
    Idle,
    /// Request sent to the streaming endpoint, spinner shown.
    Submitting,
    /// Reply streaming into the live message.
    Streaming,
    /// Streaming unavailable, request sent to the non-streaming endpoint.
    FallbackSubmitting,
    /// Final reply rendered and recorded.
    Rendered,
    /// Exchange failed, error message shown.
    Error,
}

/// How a call to [`ChatController::submit`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The input was blank; nothing happened.
    Ignored,
    /// The reply arrived through the streaming endpoint.
    Streamed,
    /// The reply arrived through the non-streaming endpoint.
    FellBack,
    /// No reply; the error message was shown instead.
    Failed,
}

/// Drives the chat widget.
///
/// Owns the conversation history and the view. Only one submission can be in
/// flight, since [`submit`](ChatController::submit) takes `&mut self`.
///
/// # Examples
///
/// ```
/// use chatpane_core::api::MockChatApi;
/// use chatpane_core::controller::{ChatController, SubmitOutcome};
/// use chatpane_core::view::Transcript;
///
/// # async fn example() {
/// let api = MockChatApi::new().with_stream_chunks(["H", "i!"]);
/// let mut controller = ChatController::new(Box::new(api), Transcript::new());
///
/// let outcome = controller.submit("hi").await;
/// assert_eq!(outcome, SubmitOutcome::Streamed);
/// assert_eq!(controller.history().len(), 2);
/// assert!(controller.is_form_enabled());
/// # }
/// ```
pub struct ChatController<V: ChatView> {
    /// The remote chat service.
    api: Box<dyn ChatApi>,
    /// The page.
    view: V,
    /// Turns exchanged so far, oldest first. Append-only.
    history: Vec<ConversationTurn>,
    /// Renders replies.
    presenter: Presenter,
    /// State of the long-mode toggle.
    mode: Mode,
    /// Shown in place of a reply when an exchange fails.
    error_message: String,
    form_enabled: bool,
    phase: Phase,
}

impl<V: ChatView> ChatController<V> {
    /// Create a controller with default presentation and short mode.
    pub fn new(api: Box<dyn ChatApi>, view: V) -> Self {
        Self {
            api,
            view,
            history: Vec::new(),
            presenter: Presenter::new(),
            mode: Mode::default(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            form_enabled: true,
            phase: Phase::Idle,
        }
    }

    /// Create a controller with the mode and display settings of `config`.
    pub fn from_config(config: &Config, api: Box<dyn ChatApi>, view: V) -> Self {
        Self::new(api, view)
            .with_presenter(config.display.presenter())
            .with_error_message(&config.display.error_message)
            .with_mode(config.mode)
    }

    /// Replace the presenter.
    #[must_use]
    pub fn with_presenter(mut self, presenter: Presenter) -> Self {
        self.presenter = presenter;
        self
    }

    /// Replace the error message.
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Set the initial mode.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the response mode for the next submissions.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Reflect the long-mode toggle.
    pub fn set_long_mode(&mut self, long: bool) {
        self.mode = Mode::from_long_flag(long);
    }

    /// Current response mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Conversation history, oldest first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the input form accepts input.
    pub fn is_form_enabled(&self) -> bool {
        self.form_enabled
    }

    /// The view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Mutable access to the view, for interactions that do not go through
    /// the controller (collapse toggles).
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Consume the controller and return the view.
    pub fn into_view(self) -> V {
        self.view
    }

    /// Submit user input and run the exchange to completion.
    ///
    /// Blank input is ignored. Otherwise the user turn is recorded at once,
    /// the assistant turn only once a reply has arrived. A failed exchange
    /// shows the error message but leaves the history with the user turn
    /// only, so the error text is never sent back as context. The form is
    /// enabled again on every path.
    pub async fn submit(&mut self, input: &str) -> SubmitOutcome {
        let message = input.trim();
        if message.is_empty() {
            return SubmitOutcome::Ignored;
        }

        self.view.append_user_message(message);
        self.history.push(ConversationTurn::user(message));
        self.set_form_enabled(false);
        self.transition(Phase::Submitting);
        self.view.show_spinner();
        self.view.scroll_to_bottom();

        let request = ChatRequest::new(message, self.history.clone(), self.mode);

        let outcome = match self.exchange(&request).await {
            Ok((reply, outcome)) => {
                self.history.push(ConversationTurn::assistant(reply));
                self.transition(Phase::Rendered);
                outcome
            }
            Err(e) => {
                tracing::error!(error = %e, "chat exchange failed");
                self.transition(Phase::Error);
                self.view.discard_spinner();
                let rendered = self.presenter.present(&self.error_message);
                self.view.append_bot_message(&rendered);
                self.view.scroll_to_bottom();
                SubmitOutcome::Failed
            }
        };

        self.set_form_enabled(true);
        self.transition(Phase::Idle);
        outcome
    }

    /// Get a reply, streaming first and falling back to the plain endpoint.
    async fn exchange(&mut self, request: &ChatRequest) -> Result<(String, SubmitOutcome), ApiError> {
        match self.api.stream_chat(request).await {
            Ok(stream) => {
                self.transition(Phase::Streaming);
                self.view.begin_bot_message();
                let reply = consume_stream(stream, &mut self.view).await?;
                self.show_reply(&reply);
                Ok((reply, SubmitOutcome::Streamed))
            }
            Err(e) if e.is_fallback_signal() => {
                tracing::warn!(error = %e, "streaming unavailable, using non-streaming endpoint");
                self.transition(Phase::FallbackSubmitting);
                let reply = self.api.chat(request).await?;
                self.show_reply(&reply);
                Ok((reply, SubmitOutcome::FellBack))
            }
            Err(e) => Err(e),
        }
    }

    fn show_reply(&mut self, reply: &str) {
        let rendered = self.presenter.present(reply);
        self.view.finish_bot_message(&rendered);
        self.view.scroll_to_bottom();
    }

    fn set_form_enabled(&mut self, enabled: bool) {
        self.form_enabled = enabled;
        self.view.set_form_enabled(enabled);
    }

    fn transition(&mut self, next: Phase) {
        tracing::debug!(from = ?self.phase, to = ?next, "controller: phase");
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::api::{Endpoint, FallbackBehavior, MockChatApi, StreamBehavior};
    use crate::message::Role;
    use crate::present::{CollapseState, RenderedMessage};
    use crate::view::{Element, Transcript};

    /// Records the form flag every time it changes.
    #[derive(Default)]
    struct FormProbe {
        transcript: Transcript,
        form_changes: Vec<bool>,
    }

    impl ChatView for FormProbe {
        fn append_user_message(&mut self, text: &str) {
            self.transcript.append_user_message(text);
        }
        fn show_spinner(&mut self) {
            self.transcript.show_spinner();
        }
        fn begin_bot_message(&mut self) {
            self.transcript.begin_bot_message();
        }
        fn update_live_text(&mut self, text: &str) {
            self.transcript.update_live_text(text);
        }
        fn finish_bot_message(&mut self, message: &RenderedMessage) {
            self.transcript.finish_bot_message(message);
        }
        fn discard_spinner(&mut self) {
            self.transcript.discard_spinner();
        }
        fn append_bot_message(&mut self, message: &RenderedMessage) {
            self.transcript.append_bot_message(message);
        }
        fn set_form_enabled(&mut self, enabled: bool) {
            self.form_changes.push(enabled);
            self.transcript.set_form_enabled(enabled);
        }
        fn scroll_to_bottom(&mut self) {
            self.transcript.scroll_to_bottom();
        }
    }

    fn controller(api: MockChatApi) -> ChatController<Transcript> {
        ChatController::new(Box::new(api), Transcript::new())
    }

    fn bot_text(element: &Element) -> &str {
        match element {
            Element::Bot(message) => message.text(),
            other => panic!("expected bot message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let mut controller = controller(MockChatApi::new());
        assert_eq!(controller.submit("   \n\t").await, SubmitOutcome::Ignored);
        assert_eq!(controller.submit("").await, SubmitOutcome::Ignored);
        assert!(controller.history().is_empty());
        assert!(controller.view().is_empty());
        assert!(controller.is_form_enabled());
    }

    #[tokio::test]
    async fn test_streamed_exchange() {
        let mut controller = controller(MockChatApi::new().with_stream_chunks(["H", "i!"]));

        let outcome = controller.submit("hi").await;

        assert_eq!(outcome, SubmitOutcome::Streamed);
        assert_eq!(
            controller.history(),
            &[
                ConversationTurn::user("hi"),
                ConversationTurn::assistant("Hi!")
            ]
        );
        let view = controller.view();
        assert_eq!(view.len(), 2);
        assert_eq!(view.elements()[0], Element::User("hi".to_string()));
        assert_eq!(bot_text(&view.elements()[1]), "Hi!");
        assert!(view.to_html().contains("<div class=\"message bot-message\">Hi!</div>"));
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.is_form_enabled());
    }

    #[tokio::test]
    async fn test_input_is_trimmed() {
        let mut controller = controller(MockChatApi::new());
        controller.submit("  hello  ").await;
        assert_eq!(controller.history()[0].content, "hello");
    }

    #[tokio::test]
    async fn test_stream_multibyte_split() {
        let crab = "é🦀".as_bytes();
        let api = MockChatApi::new().with_stream(StreamBehavior::Chunks(vec![
            Bytes::copy_from_slice(&crab[..1]),
            Bytes::copy_from_slice(&crab[1..4]),
            Bytes::copy_from_slice(&crab[4..]),
        ]));
        let mut controller = controller(api);
        controller.submit("emoji").await;
        assert_eq!(controller.history()[1].content, "é🦀");
    }

    #[tokio::test]
    async fn test_fallback_on_stream_status() {
        let api = MockChatApi::new()
            .with_stream_status(500)
            .with_fallback_response("ok");
        let mut controller = controller(api);

        let outcome = controller.submit("hello").await;

        assert_eq!(outcome, SubmitOutcome::FellBack);
        assert_eq!(controller.history().len(), 2);
        assert_eq!(controller.history()[1], ConversationTurn::assistant("ok"));
        let view = controller.view();
        assert_eq!(view.len(), 2);
        assert_eq!(bot_text(&view.elements()[1]), "ok");
        assert!(controller.is_form_enabled());
    }

    #[tokio::test]
    async fn test_fallback_on_unavailable_stream() {
        let api = MockChatApi::new()
            .with_stream(StreamBehavior::Unavailable)
            .with_fallback_response("**fine**");
        let mut controller = controller(api);

        assert_eq!(controller.submit("x").await, SubmitOutcome::FellBack);
        assert!(controller.view().to_html().contains("<strong>fine</strong>"));
    }

    #[tokio::test]
    async fn test_fallback_sends_same_payload() {
        let api = std::sync::Arc::new(
            MockChatApi::new()
                .with_stream_status(404)
                .with_fallback_response("ok"),
        );
        let mut controller = ChatController::new(Box::new(SharedApi(api.clone())), Transcript::new());
        controller.set_long_mode(true);

        controller.submit("hello").await;

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0, Endpoint::Stream);
        assert_eq!(requests[1].0, Endpoint::Chat);
        assert_eq!(requests[0].1, requests[1].1);
        assert_eq!(requests[1].1.mode, Mode::Long);
    }

    #[tokio::test]
    async fn test_request_carries_history_and_mode() {
        let api = std::sync::Arc::new(MockChatApi::new().with_stream_chunks(["reply"]));
        let mut controller = ChatController::new(Box::new(SharedApi(api.clone())), Transcript::new());

        controller.submit("first").await;
        controller.set_mode(Mode::Long);
        controller.submit("second").await;

        let requests = api.requests();
        let second = &requests[1].1;
        assert_eq!(second.message, "second");
        assert_eq!(second.mode, Mode::Long);
        assert_eq!(
            second.history,
            vec![
                ConversationTurn::user("first"),
                ConversationTurn::assistant("reply"),
                ConversationTurn::user("second"),
            ]
        );
        assert_eq!(requests[0].1.mode, Mode::Short);
    }

    #[tokio::test]
    async fn test_failure_when_both_endpoints_fail() {
        let api = MockChatApi::new()
            .with_stream_status(503)
            .with_fallback(FallbackBehavior::Status(503));
        let mut controller = controller(api).with_error_message("Could not connect.");

        let outcome = controller.submit("hello").await;

        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(controller.history(), &[ConversationTurn::user("hello")]);
        let view = controller.view();
        assert_eq!(view.len(), 2);
        assert_eq!(bot_text(&view.elements()[1]), "Could not connect.");
        assert!(!view.to_html().contains("loading-spinner"));
        assert!(controller.is_form_enabled());
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_transport_error_does_not_fall_back() {
        let api = std::sync::Arc::new(
            MockChatApi::new().with_stream(StreamBehavior::TransportError("refused".to_string())),
        );
        let mut controller = ChatController::new(Box::new(SharedApi(api.clone())), Transcript::new());

        assert_eq!(controller.submit("hello").await, SubmitOutcome::Failed);
        assert_eq!(api.requests().len(), 1);
        assert_eq!(controller.history().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_fallback_fails() {
        let api = MockChatApi::new()
            .with_stream(StreamBehavior::Unavailable)
            .with_fallback(FallbackBehavior::Malformed);
        let mut controller = controller(api);

        assert_eq!(controller.submit("hello").await, SubmitOutcome::Failed);
        assert_eq!(controller.history().len(), 1);
    }

    #[tokio::test]
    async fn test_mid_stream_error_keeps_partial_text() {
        let api = MockChatApi::new().with_stream(StreamBehavior::ChunksThenError(
            vec![Bytes::from_static(b"Half an ans")],
            "connection reset".to_string(),
        ));
        let mut controller = controller(api);

        assert_eq!(controller.submit("hello").await, SubmitOutcome::Failed);
        assert_eq!(controller.history().len(), 1);
        let view = controller.view();
        assert_eq!(view.len(), 3);
        assert_eq!(view.elements()[1], Element::Live("Half an ans".to_string()));
        assert_eq!(bot_text(&view.elements()[2]), DEFAULT_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_history_grows_by_two_then_one() {
        let mut ok = controller(MockChatApi::new());
        ok.submit("a").await;
        assert_eq!(ok.history().len(), 2);
        ok.submit("b").await;
        assert_eq!(ok.history().len(), 4);
        assert!(ok.history().iter().step_by(2).all(|t| t.role == Role::User));

        let mut failing = controller(
            MockChatApi::new()
                .with_stream_status(500)
                .with_fallback(FallbackBehavior::TransportError("down".to_string())),
        );
        failing.submit("a").await;
        assert_eq!(failing.history().len(), 1);
        failing.submit("b").await;
        assert_eq!(failing.history().len(), 2);
        assert!(failing.history().iter().all(|t| t.role == Role::User));
    }

    #[tokio::test]
    async fn test_form_disabled_then_enabled_on_every_path() {
        let scenarios = [
            MockChatApi::new(),
            MockChatApi::new().with_stream_status(500),
            MockChatApi::new()
                .with_stream_status(500)
                .with_fallback(FallbackBehavior::Status(500)),
            MockChatApi::new().with_stream(StreamBehavior::TransportError("x".to_string())),
        ];
        for api in scenarios {
            let mut controller = ChatController::new(Box::new(api), FormProbe::default());
            controller.submit("hello").await;
            assert_eq!(controller.view().form_changes, vec![false, true]);
            assert!(controller.view().transcript.is_form_enabled());
            assert!(controller.is_form_enabled());
        }
    }

    #[tokio::test]
    async fn test_long_reply_is_collapsible() {
        let long = "word ".repeat(200);
        let mut controller = controller(MockChatApi::new().with_stream_chunks([long.as_str()]));
        controller.submit("essay").await;

        let index = controller.view().len() - 1;
        assert_eq!(
            controller.view_mut().toggle(index),
            Some(CollapseState::Expanded)
        );
    }

    #[tokio::test]
    async fn test_from_config_applies_display_settings() {
        let mut config = Config::default();
        config.mode = Mode::Long;
        config.display.collapse_threshold = 2;
        config.display.error_message = "nope".to_string();

        let api = MockChatApi::new()
            .with_stream_chunks(["abc"])
            .with_fallback(FallbackBehavior::Status(500));
        let mut controller = ChatController::from_config(&config, Box::new(api), Transcript::new());
        assert_eq!(controller.mode(), Mode::Long);

        controller.submit("q").await;
        let html = controller.view().to_html();
        assert!(html.contains("expand-btn"));
    }

    /// Lets a test keep a handle on the mock after handing it over.
    struct SharedApi(std::sync::Arc<MockChatApi>);

    #[async_trait::async_trait]
    impl ChatApi for SharedApi {
        async fn stream_chat(
            &self,
            request: &ChatRequest,
        ) -> Result<crate::api::ChatStream, ApiError> {
            self.0.stream_chat(request).await
        }

        async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
            self.0.chat(request).await
        }
    }
}
