//! HTML escaping for text, attribute values and comments.

/// Escape `& < > " '` for text and attribute contexts.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Strip sequences that would terminate or nest an HTML comment.
pub fn escape_comment(input: &str) -> String {
    let mut out = input.to_string();
    loop {
        let next = out
            .replace("<!--", "")
            .replace("--!>", "")
            .replace("-->", "");
        if next == out {
            return out;
        }
        out = next;
    }
}
