//! Markdown-lite formatting for chat message bodies.
//!
//! The advisor backend replies in a small markdown subset (bold, italic,
//! bullet and numbered lists). [`format_for_display`] turns that subset into
//! an HTML fragment. Escaping happens first so that nothing in the raw text,
//! whether typed by the user or generated by the model, can inject markup;
//! the substitutions below only ever emit tags of their own making.

use std::sync::LazyLock;

use regex::Regex;

// Bold must run before italic so `*x*` never matches inside `**x**`.
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").expect("italic pattern"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+(.*)$").expect("numbered pattern"));

/// Escape HTML-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render advisor text as an HTML fragment.
///
/// Applied in this order: escape, bold, italic, newlines to `<br>`, bullet
/// markers (`- x` or `• x`) and numbered markers (`N. x`) to `<li>`. Each run
/// of consecutive list items ends up in a single `<ul>`, with the line breaks
/// between adjacent items collapsed.
#[must_use]
pub fn format_for_display(text: &str) -> String {
    let escaped = escape_html(text);
    let bolded = BOLD.replace_all(&escaped, "<strong>$1</strong>");
    let styled = ITALIC.replace_all(&bolded, "<em>$1</em>");

    let mut out = String::with_capacity(styled.len());
    let mut prev_was_item = false;
    for (i, line) in styled.split('\n').enumerate() {
        match list_item_body(line) {
            Some(body) => {
                if !prev_was_item {
                    if i > 0 {
                        out.push_str("<br>");
                    }
                    out.push_str("<ul>");
                }
                out.push_str("<li>");
                out.push_str(body);
                out.push_str("</li>");
                prev_was_item = true;
            }
            None => {
                if prev_was_item {
                    out.push_str("</ul>");
                }
                if i > 0 {
                    out.push_str("<br>");
                }
                out.push_str(line);
                prev_was_item = false;
            }
        }
    }
    if prev_was_item {
        out.push_str("</ul>");
    }
    out
}

/// Strip a bullet or numbered marker, if the line carries one.
fn list_item_body(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("• ")) {
        return Some(rest);
    }
    NUMBERED
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_before_substitution() {
        let html = format_for_display("<script>alert('x')</script>");
        assert_eq!(html, "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;");
    }

    #[test]
    fn test_bold_applies_before_italic() {
        assert_eq!(
            format_for_display("**bold** and *italic*"),
            "<strong>bold</strong> and <em>italic</em>"
        );
    }

    #[test]
    fn test_documented_example() {
        let html = format_for_display("**bold** and *italic*\n- item one\n- item two");
        assert_eq!(
            html,
            "<strong>bold</strong> and <em>italic</em><br>\
             <ul><li>item one</li><li>item two</li></ul>"
        );
    }

    #[test]
    fn test_newlines_become_breaks() {
        assert_eq!(format_for_display("one\ntwo"), "one<br>two");
    }

    #[test]
    fn test_bullet_glyph_and_numbered_markers() {
        let html = format_for_display("• first\n2. second");
        assert_eq!(html, "<ul><li>first</li><li>second</li></ul>");
    }

    #[test]
    fn test_separate_list_runs_get_separate_containers() {
        let html = format_for_display("- a\nplain\n- b");
        assert_eq!(html, "<ul><li>a</li></ul><br>plain<br><ul><li>b</li></ul>");
    }

    #[test]
    fn test_list_at_start_has_no_leading_break() {
        let html = format_for_display("- only");
        assert_eq!(html, "<ul><li>only</li></ul>");
    }

    #[test]
    fn test_markup_inside_list_items() {
        let html = format_for_display("- **save** more\n- spend *less*");
        assert_eq!(
            html,
            "<ul><li><strong>save</strong> more</li><li>spend <em>less</em></li></ul>"
        );
    }

    #[test]
    fn test_single_asterisk_pair_is_italic_only() {
        assert_eq!(format_for_display("*hi*"), "<em>hi</em>");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(format_for_display("hello"), "hello");
    }
}
