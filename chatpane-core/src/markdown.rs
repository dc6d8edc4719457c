//! Markdown-subset-to-HTML rendering for assistant replies.
//!
//! Supports only what chat replies commonly use: fenced code blocks with an
//! optional language tag, inline code, bold, italic, single-level dash lists
//! and line breaks. The renderer works on text that has already been through
//! [`escape_html`], so anything it emits besides its own tags is inert.
//!
//! Rendering is an ordered chain of passes. Code produced by the first two
//! passes is parked behind placeholders while the remaining passes run, so
//! code content is never touched by emphasis, list or line-break handling.
//!
//! This is a best-effort renderer: unmatched markers or odd nesting produce
//! odd HTML, never a panic.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::html::escape_html;

/// Opens a parked-fragment placeholder (private use area).
const PLACEHOLDER_OPEN: char = '\u{E000}';
/// Closes a parked-fragment placeholder.
const PLACEHOLDER_CLOSE: char = '\u{E001}';

fn re_fenced_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"```([a-zA-Z0-9#+\-.]*)\n((?s:.*?))```")
            .expect("regex pattern is valid and should always compile")
    })
}

fn re_inline_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"`([^`]+)`").expect("regex pattern is valid and should always compile")
    })
}

fn re_bold() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*\*([^*]+)\*\*").expect("regex pattern is valid and should always compile")
    })
}

fn re_italic() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*([^*]+)\*").expect("regex pattern is valid and should always compile")
    })
}

fn re_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new("\u{E000}([0-9]+)\u{E001}")
            .expect("regex pattern is valid and should always compile")
    })
}

/// Escape raw text and render it as HTML.
///
/// This is the entry point for anything that did not come from the renderer
/// itself (user input, API replies).
///
/// # Examples
///
/// ```
/// use chatpane_core::markdown::render_markdown_safe;
///
/// let html = render_markdown_safe("**hi** <there>");
/// assert_eq!(html, "<strong>hi</strong> &lt;there&gt;");
/// ```
pub fn render_markdown_safe(text: &str) -> String {
    render_markdown(&escape_html(text))
}

/// Render already-escaped text as HTML.
///
/// Passes, in order:
/// 1. fenced code blocks (```` ```lang ````), language lowercased into a
///    `language-<lang>` class
/// 2. inline code spans
/// 3. `**bold**`
/// 4. `*italic*`
/// 5. `- ` list items, each run of adjacent items wrapped in one `<ul>`
/// 6. remaining newlines to `<br>`
pub fn render_markdown(escaped: &str) -> String {
    let mut parked: Vec<String> = Vec::new();

    // Stray placeholder delimiters in the input would alias parked fragments.
    let text: String = escaped
        .chars()
        .map(|c| match c {
            PLACEHOLDER_OPEN | PLACEHOLDER_CLOSE => char::REPLACEMENT_CHARACTER,
            c => c,
        })
        .collect();

    let text = re_fenced_code().replace_all(&text, |caps: &Captures| {
        let lang = &caps[1];
        let class = if lang.is_empty() {
            String::new()
        } else {
            format!(" class=\"language-{}\"", lang.to_lowercase())
        };
        park(
            &mut parked,
            format!("<pre><code{}>{}</code></pre>", class, &caps[2]),
        )
    });

    let text = re_inline_code().replace_all(&text, |caps: &Captures| {
        park(&mut parked, format!("<code>{}</code>", &caps[1]))
    });

    let text = re_bold().replace_all(&text, "<strong>$1</strong>");
    let text = re_italic().replace_all(&text, "<em>$1</em>");
    let text = wrap_list_items(&text);
    let text = text.replace('\n', "<br>");

    restore(&text, &parked, parked.len())
}

/// Park a rendered fragment and return the placeholder standing in for it.
fn park(parked: &mut Vec<String>, fragment: String) -> String {
    let index = parked.len();
    parked.push(fragment);
    format!("{PLACEHOLDER_OPEN}{index}{PLACEHOLDER_CLOSE}")
}

/// Substitute parked fragments back in.
///
/// A fragment can only contain placeholders created before it, so recursion
/// is bounded by `limit`.
fn restore(text: &str, parked: &[String], limit: usize) -> String {
    re_placeholder()
        .replace_all(text, |caps: &Captures| {
            match caps[1].parse::<usize>() {
                Ok(index) if index < limit => restore(&parked[index], parked, index),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Content of a `- item` line, or `None` if the line is not a list item.
///
/// A dash, one whitespace character and at least one more character are
/// required; further leading whitespace is dropped from the content.
fn list_item(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('-')?;
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() && !chars.as_str().is_empty() => Some(rest.trim_start()),
        _ => None,
    }
}

/// Turn `- ` lines into `<li>` items grouped into `<ul>` runs.
///
/// The newlines between items and the one ending a run are absorbed by the
/// list markup, so no `<br>` appears around a list.
fn wrap_list_items(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lines = text.split('\n').peekable();
    let mut in_list = false;

    while let Some(line) = lines.next() {
        match list_item(line) {
            Some(item) => {
                if !in_list {
                    out.push_str("<ul>");
                    in_list = true;
                }
                out.push_str("<li>");
                out.push_str(item);
                out.push_str("</li>");
                if !lines.peek().is_some_and(|next| list_item(next).is_some()) {
                    out.push_str("</ul>");
                    in_list = false;
                }
            }
            None => {
                out.push_str(line);
                if lines.peek().is_some() {
                    out.push('\n');
                }
            }
        }
    }

    out
}
