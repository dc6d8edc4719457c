//! Presentation of rendered assistant replies.
//!
//! Long replies are shown collapsed behind a "show more" toggle with a fade
//! overlay; short ones are shown as-is. The decision is made once per
//! message, on the length of the raw source text.

use std::sync::Arc;

use crate::html::escape_html;
use crate::markdown::render_markdown_safe;

/// Source length (in UTF-16 code units) above which a reply is collapsed.
pub const DEFAULT_COLLAPSE_THRESHOLD: usize = 800;

/// Hook for language-aware syntax coloring.
///
/// Called over every freshly rendered message body. Code blocks carry a
/// `language-<lang>` class to key on. Presentation works the same without
/// one.
pub trait Highlighter: Send + Sync {
    /// Rewrite `html` in place with highlighting applied.
    fn highlight(&self, html: &mut String);
}

/// Labels of the collapse toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleLabels {
    /// Label shown while collapsed.
    pub show_more: String,
    /// Label shown while expanded.
    pub show_less: String,
}

impl Default for ToggleLabels {
    fn default() -> Self {
        Self {
            show_more: "Show more".to_string(),
            show_less: "Show less".to_string(),
        }
    }
}

/// State of a collapsible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseState {
    /// Content clipped, fade overlay visible. Initial state.
    Collapsed,
    /// Content fully visible, fade overlay hidden.
    Expanded,
}

/// Toggle attached to a long message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collapsible {
    state: CollapseState,
    labels: ToggleLabels,
}

impl Collapsible {
    /// A new toggle, collapsed.
    pub fn new(labels: ToggleLabels) -> Self {
        Self {
            state: CollapseState::Collapsed,
            labels,
        }
    }

    /// Flip the state and return the new one.
    pub fn toggle(&mut self) -> CollapseState {
        self.state = match self.state {
            CollapseState::Collapsed => CollapseState::Expanded,
            CollapseState::Expanded => CollapseState::Collapsed,
        };
        self.state
    }

    /// Current state.
    pub fn state(&self) -> CollapseState {
        self.state
    }

    /// Label of the toggle control in the current state.
    pub fn label(&self) -> &str {
        match self.state {
            CollapseState::Collapsed => &self.labels.show_more,
            CollapseState::Expanded => &self.labels.show_less,
        }
    }

    /// Whether the fade overlay is shown.
    pub fn fade_visible(&self) -> bool {
        self.state == CollapseState::Collapsed
    }
}

/// Rendered form of one assistant turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    text: String,
    body: String,
    collapsible: Option<Collapsible>,
}

impl RenderedMessage {
    /// Raw source text the message was rendered from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Rendered HTML body, without the surrounding message markup.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The collapse toggle, if the message is long.
    pub fn collapsible(&self) -> Option<&Collapsible> {
        self.collapsible.as_ref()
    }

    /// Mutable access to the collapse toggle.
    pub fn collapsible_mut(&mut self) -> Option<&mut Collapsible> {
        self.collapsible.as_mut()
    }

    /// Full bot message markup.
    pub fn to_html(&self) -> String {
        let Some(toggle) = &self.collapsible else {
            return format!("<div class=\"message bot-message\">{}</div>", self.body);
        };

        let content_class = match toggle.state() {
            CollapseState::Collapsed => "collapsible-content collapsed",
            CollapseState::Expanded => "collapsible-content",
        };
        let fade_style = if toggle.fade_visible() {
            ""
        } else {
            " style=\"display: none\""
        };

        format!(
            "<div class=\"message bot-message collapsible\">\
             <div class=\"{content_class}\">{body}</div>\
             <div class=\"fade-gradient\"{fade_style}></div>\
             <button type=\"button\" class=\"expand-btn\">{label}</button>\
             </div>",
            body = self.body,
            label = escape_html(toggle.label()),
        )
    }
}

/// Turns reply text into a [`RenderedMessage`].
#[derive(Clone)]
pub struct Presenter {
    collapse_threshold: usize,
    labels: ToggleLabels,
    highlighter: Option<Arc<dyn Highlighter>>,
}

impl Presenter {
    /// A presenter with the default threshold and labels, no highlighter.
    pub fn new() -> Self {
        Self {
            collapse_threshold: DEFAULT_COLLAPSE_THRESHOLD,
            labels: ToggleLabels::default(),
            highlighter: None,
        }
    }

    /// Override the collapse threshold.
    #[must_use]
    pub fn with_collapse_threshold(mut self, threshold: usize) -> Self {
        self.collapse_threshold = threshold;
        self
    }

    /// Override the toggle labels.
    #[must_use]
    pub fn with_labels(mut self, labels: ToggleLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Install a syntax highlighter.
    #[must_use]
    pub fn with_highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    /// Render `text` and decide how to present it.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatpane_core::present::Presenter;
    ///
    /// let presenter = Presenter::new();
    /// let short = presenter.present("**hi**");
    /// assert_eq!(short.body(), "<strong>hi</strong>");
    /// assert!(short.collapsible().is_none());
    ///
    /// let long = presenter.present(&"x".repeat(801));
    /// assert!(long.collapsible().is_some());
    /// ```
    pub fn present(&self, text: &str) -> RenderedMessage {
        let mut body = render_markdown_safe(text);
        if let Some(highlighter) = &self.highlighter {
            highlighter.highlight(&mut body);
        }

        // Length in UTF-16 code units, as a browser measures a string.
        let collapsible = (text.encode_utf16().count() > self.collapse_threshold)
            .then(|| Collapsible::new(self.labels.clone()));

        RenderedMessage {
            text: text.to_string(),
            body,
            collapsible,
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Presenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("collapse_threshold", &self.collapse_threshold)
            .field("labels", &self.labels)
            .field("highlighter", &self.highlighter.is_some())
            .finish()
    }
}
