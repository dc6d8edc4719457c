//! HTML escaping for text that ends up inside the chat box markup.

/// Escape the five characters special in HTML: `&`, `<`, `>`, `"`, `'`.
///
/// Works in a single pass, so an entity produced for one character is never
/// escaped again.
///
/// # Examples
///
/// ```
/// use chatpane_core::html::escape_html;
///
/// assert_eq!(escape_html("<b>&'\""), "&lt;b&gt;&amp;&#039;&quot;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}
