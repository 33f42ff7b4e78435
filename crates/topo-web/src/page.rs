//! HTML rendering of the text report

/// Wrap `text` in a minimal page. A `refresh_secs` of 0 omits the refresh directive.
pub fn render_page(text: &str, refresh_secs: u32) -> String {
    let mut page = String::with_capacity(text.len() + 256);
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    if refresh_secs > 0 {
        page.push_str(&format!("<meta http-equiv=\"refresh\" content=\"{}\">\n", refresh_secs));
    }
    page.push_str("<title>GPU Topology</title>\n</head>\n<body>\n<pre>");
    page.push_str(&escape_html(text));
    page.push_str("</pre>\n</body>\n</html>\n");
    page
}

/// Escape the characters HTML treats as markup
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape_html("a < b && c > \"d\""), "a &lt; b &amp;&amp; c &gt; &quot;d&quot;");
        assert_eq!(escape_html("GPU 0 (A100) | 45°C"), "GPU 0 (A100) | 45°C");
    }

    #[test]
    fn test_refresh_directive() {
        let page = render_page("Parallel Settings:", 5);
        assert!(page.contains("<meta http-equiv=\"refresh\" content=\"5\">"));
        assert!(page.contains("<pre>Parallel Settings:</pre>"));
    }

    #[test]
    fn test_refresh_disabled() {
        let page = render_page("x", 0);
        assert!(!page.contains("http-equiv"));
    }

    #[test]
    fn test_config_text_is_escaped() {
        let page = render_page("name: <script>", 5);
        assert!(page.contains("name: &lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }
}
