//! HTML rendering of turns.
//!
//! Message content supports a tiny markup subset: fenced code blocks with an
//! optional language tag and inline code spans. Everything else is escaped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::turn::Turn;

static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```([a-z]*)\n(.*?)\n```").expect("valid fence regex"));
static INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid inline regex"));

/// Escape the five HTML-significant characters.
///
/// ```
/// use said::render::escape_html;
/// assert_eq!(escape_html("<a href='x'>&</a>"), "&lt;a href=&#039;x&#039;&gt;&amp;&lt;/a&gt;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
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

fn format_inline(text: &str) -> String {
    INLINE
        .replace_all(&escape_html(text), "<code>$1</code>")
        .into_owned()
}

/// Convert message content into safe HTML.
///
/// ```
/// use said::render::format_content;
/// assert_eq!(format_content("run `ls`"), "run <code>ls</code>");
/// ```
pub fn format_content(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in FENCE.captures_iter(text) {
        let (Some(whole), Some(lang), Some(code)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        out.push_str(&format_inline(&text[last..whole.start()]));
        out.push_str(&format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            lang.as_str(),
            escape_html(code.as_str())
        ));
        last = whole.end();
    }
    out.push_str(&format_inline(&text[last..]));
    out
}

/// Render one turn as a message element.
pub fn render_turn(turn: &Turn) -> String {
    format!(
        "<div class=\"message {}-message\"><strong>{}: </strong><span>{}</span></div>",
        turn.role.as_str(),
        turn.role.label(),
        format_content(&turn.content)
    )
}

/// Render a whole transcript as a standalone HTML document.
pub fn render_page(title: &str, turns: &[Turn]) -> String {
    let mut body = String::new();
    for turn in turns {
        body.push_str("    ");
        body.push_str(&render_turn(turn));
        body.push('\n');
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n  <title>{}</title>\n</head>\n<body>\n  <div id=\"chat-messages\">\n{}  </div>\n</body>\n</html>\n",
        escape_html(title),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_keeps_language_and_escapes_body() {
        let html = format_content("look:\n```python\nprint(1 < 2)\n```\ndone");
        assert_eq!(
            html,
            "look:\n<pre><code class=\"language-python\">print(1 &lt; 2)</code></pre>\ndone"
        );
    }

    #[test]
    fn fence_without_language_gets_empty_class() {
        let html = format_content("```\na && b\n```");
        assert_eq!(html, "<pre><code class=\"language-\">a &amp;&amp; b</code></pre>");
    }

    #[test]
    fn inline_code_is_escaped_too() {
        assert_eq!(format_content("use `<T>`"), "use <code>&lt;T&gt;</code>");
    }

    #[test]
    fn plain_text_markup_is_neutralized() {
        assert_eq!(
            format_content("<script>alert(1)</script>"),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn unterminated_fence_is_left_as_text() {
        assert_eq!(format_content("```rust\nfn x"), "```rust\nfn x");
    }

    #[test]
    fn turn_element_carries_role_class_and_label() {
        let html = render_turn(&Turn::assistant("hi"));
        assert_eq!(
            html,
            "<div class=\"message assistant-message\"><strong>Assistant: </strong><span>hi</span></div>"
        );
    }

    #[test]
    fn page_lists_turns_in_order() {
        let page = render_page("chat", &[Turn::user("a"), Turn::assistant("b")]);
        let a = page.find("<span>a</span>").unwrap();
        let b = page.find("<span>b</span>").unwrap();
        assert!(a < b);
        assert!(page.starts_with("<!DOCTYPE html>"));
    }
}
