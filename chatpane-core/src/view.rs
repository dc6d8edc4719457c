//! The page-side half of the widget.
//!
//! [`ChatView`] is everything the controller does to the chat box and the
//! input form. Two implementations ship here:
//!
//! - [`Transcript`], an in-memory chat box that renders to HTML
//! - [`ChannelView`], which forwards every operation as a [`ViewEvent`] so a
//!   separate task can render while the controller waits on the network

use tokio::sync::mpsc;

use crate::html::escape_html;
use crate::present::{CollapseState, RenderedMessage};

/// Operations the controller performs on the page.
pub trait ChatView {
    /// Append the user's message, shown as plain text.
    fn append_user_message(&mut self, text: &str);

    /// Append a loading indicator for the pending reply.
    fn show_spinner(&mut self);

    /// Replace the pending spinner with an empty live message.
    fn begin_bot_message(&mut self);

    /// Replace the live message content with `text`, shown raw.
    ///
    /// `text` is everything received so far; within one reply each call
    /// extends the previous one.
    fn update_live_text(&mut self, text: &str);

    /// Replace the pending spinner or live message with the final reply.
    fn finish_bot_message(&mut self, message: &RenderedMessage);

    /// Remove the pending spinner, if it is still there.
    ///
    /// A live message that already shows streamed text is left in place.
    fn discard_spinner(&mut self);

    /// Append a standalone bot message.
    fn append_bot_message(&mut self, message: &RenderedMessage);

    /// Enable or disable the input form.
    fn set_form_enabled(&mut self, enabled: bool);

    /// Scroll so the latest content is visible.
    fn scroll_to_bottom(&mut self);
}

/// One element of the chat box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// A message typed by the user.
    User(String),
    /// Loading indicator.
    Spinner,
    /// Reply being streamed, raw text.
    Live(String),
    /// Final reply.
    Bot(RenderedMessage),
}

impl Element {
    /// Markup for this element.
    pub fn to_html(&self) -> String {
        match self {
            Element::User(text) => format!(
                "<div class=\"message user-message\"><p>{}</p></div>",
                escape_html(text)
            ),
            Element::Spinner => "<div class=\"message bot-message loading-spinner\">\
                                 <span></span><span></span><span></span></div>"
                .to_string(),
            Element::Live(text) => {
                format!("<div class=\"message bot-message\">{}</div>", escape_html(text))
            }
            Element::Bot(message) => message.to_html(),
        }
    }
}

/// In-memory chat box and input form state.
///
/// # Examples
///
/// ```
/// use chatpane_core::present::Presenter;
/// use chatpane_core::view::{ChatView, Transcript};
///
/// let mut transcript = Transcript::new();
/// transcript.append_user_message("hi <3");
/// transcript.append_bot_message(&Presenter::new().present("**hello**"));
///
/// assert!(transcript.to_html().contains("<p>hi &lt;3</p>"));
/// assert!(transcript.to_html().contains("<strong>hello</strong>"));
/// ```
#[derive(Debug, Clone)]
pub struct Transcript {
    elements: Vec<Element>,
    /// Index of the spinner or live message awaiting its final reply.
    pending: Option<usize>,
    form_enabled: bool,
    /// Number of elements scrolled past; equals `len()` when at the bottom.
    scroll_position: usize,
}

impl Transcript {
    /// An empty chat box with the form enabled.
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            pending: None,
            form_enabled: true,
            scroll_position: 0,
        }
    }

    /// Elements in display order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the chat box is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the input form accepts input.
    pub fn is_form_enabled(&self) -> bool {
        self.form_enabled
    }

    /// Current scroll position.
    pub fn scroll_position(&self) -> usize {
        self.scroll_position
    }

    /// Text of the live message being streamed, if any.
    pub fn live_text(&self) -> Option<&str> {
        match self.pending.and_then(|i| self.elements.get(i)) {
            Some(Element::Live(text)) => Some(text),
            _ => None,
        }
    }

    /// Click the collapse toggle of the message at `index`.
    ///
    /// Returns the new state, or `None` when the element has no toggle.
    pub fn toggle(&mut self, index: usize) -> Option<CollapseState> {
        let state = match self.elements.get_mut(index) {
            Some(Element::Bot(message)) => message.collapsible_mut()?.toggle(),
            _ => return None,
        };
        self.scroll_to_bottom();
        Some(state)
    }

    /// Replay an event produced by a [`ChannelView`].
    pub fn apply(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::UserMessage(text) => self.append_user_message(&text),
            ViewEvent::Spinner => self.show_spinner(),
            ViewEvent::BeginBotMessage => self.begin_bot_message(),
            ViewEvent::LiveText(text) => self.update_live_text(&text),
            ViewEvent::LiveAppend(tail) => {
                if let Some(Element::Live(live)) =
                    self.pending.and_then(|i| self.elements.get_mut(i))
                {
                    live.push_str(&tail);
                }
            }
            ViewEvent::FinishBotMessage(message) => self.finish_bot_message(&message),
            ViewEvent::DiscardSpinner => self.discard_spinner(),
            ViewEvent::BotMessage(message) => self.append_bot_message(&message),
            ViewEvent::FormEnabled(enabled) => self.set_form_enabled(enabled),
            ViewEvent::ScrollToBottom => self.scroll_to_bottom(),
        }
    }

    /// Markup of the whole chat box.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<div id=\"chat-box\">");
        for element in &self.elements {
            out.push_str(&element.to_html());
        }
        out.push_str("</div>");
        out
    }

    /// A standalone HTML page containing the chat box.
    pub fn to_html_page(&self, title: &str) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            escape_html(title),
            self.to_html()
        )
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView for Transcript {
    fn append_user_message(&mut self, text: &str) {
        self.elements.push(Element::User(text.to_string()));
        self.scroll_to_bottom();
    }

    fn show_spinner(&mut self) {
        self.elements.push(Element::Spinner);
        self.pending = Some(self.elements.len() - 1);
        self.scroll_to_bottom();
    }

    fn begin_bot_message(&mut self) {
        if let Some(index) = self.pending {
            self.elements[index] = Element::Live(String::new());
        }
    }

    fn update_live_text(&mut self, text: &str) {
        if let Some(Element::Live(live)) = self.pending.and_then(|i| self.elements.get_mut(i)) {
            live.clear();
            live.push_str(text);
        }
    }

    fn finish_bot_message(&mut self, message: &RenderedMessage) {
        match self.pending.take() {
            Some(index) => self.elements[index] = Element::Bot(message.clone()),
            None => self.elements.push(Element::Bot(message.clone())),
        }
        self.scroll_to_bottom();
    }

    fn discard_spinner(&mut self) {
        if let Some(index) = self.pending.take()
            && self.elements[index] == Element::Spinner
        {
            self.elements.remove(index);
        }
    }

    fn append_bot_message(&mut self, message: &RenderedMessage) {
        self.elements.push(Element::Bot(message.clone()));
        self.scroll_to_bottom();
    }

    fn set_form_enabled(&mut self, enabled: bool) {
        self.form_enabled = enabled;
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_position = self.elements.len();
    }
}

/// A [`ChatView`] operation, as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// See [`ChatView::append_user_message`].
    UserMessage(String),
    /// See [`ChatView::show_spinner`].
    Spinner,
    /// See [`ChatView::begin_bot_message`].
    BeginBotMessage,
    /// See [`ChatView::update_live_text`]; carries the whole buffer.
    LiveText(String),
    /// Text appended to the live message since the last live event.
    LiveAppend(String),
    /// See [`ChatView::finish_bot_message`].
    FinishBotMessage(RenderedMessage),
    /// See [`ChatView::discard_spinner`].
    DiscardSpinner,
    /// See [`ChatView::append_bot_message`].
    BotMessage(RenderedMessage),
    /// See [`ChatView::set_form_enabled`].
    FormEnabled(bool),
    /// See [`ChatView::scroll_to_bottom`].
    ScrollToBottom,
}

/// [`ChatView`] that sends every operation down a channel.
///
/// Live text is sent as [`ViewEvent::LiveAppend`] tails, so a long stream
/// costs the receiver no more than its length. Events sent after the
/// receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelView {
    tx: mpsc::UnboundedSender<ViewEvent>,
    /// Bytes of live text already sent for the current reply.
    live_sent: usize,
}

impl ChannelView {
    /// Create a view and the receiver for its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ViewEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, live_sent: 0 }, rx)
    }

    fn send(&self, event: ViewEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("view: event receiver dropped");
        }
    }
}

impl ChatView for ChannelView {
    fn append_user_message(&mut self, text: &str) {
        self.send(ViewEvent::UserMessage(text.to_string()));
    }

    fn show_spinner(&mut self) {
        self.send(ViewEvent::Spinner);
    }

    fn begin_bot_message(&mut self) {
        self.live_sent = 0;
        self.send(ViewEvent::BeginBotMessage);
    }

    fn update_live_text(&mut self, text: &str) {
        let event = match text.get(self.live_sent..) {
            Some("") => return,
            Some(tail) => ViewEvent::LiveAppend(tail.to_string()),
            // Shorter than what was sent, or not on a char boundary.
            None => ViewEvent::LiveText(text.to_string()),
        };
        self.live_sent = text.len();
        self.send(event);
    }

    fn finish_bot_message(&mut self, message: &RenderedMessage) {
        self.live_sent = 0;
        self.send(ViewEvent::FinishBotMessage(message.clone()));
    }

    fn discard_spinner(&mut self) {
        self.send(ViewEvent::DiscardSpinner);
    }

    fn append_bot_message(&mut self, message: &RenderedMessage) {
        self.live_sent = 0;
        self.send(ViewEvent::BotMessage(message.clone()));
    }

    fn set_form_enabled(&mut self, enabled: bool) {
        self.send(ViewEvent::FormEnabled(enabled));
    }

    fn scroll_to_bottom(&mut self) {
        self.send(ViewEvent::ScrollToBottom);
    }
}
