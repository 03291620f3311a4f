//! String and key escaping safe for embedding inside a `<script>` tag.

/// Escape sequence for characters that must never appear raw.
fn escaped(c: char) -> Option<&'static str> {
    Some(match c {
        '<' => "\\u003C",
        '>' => "\\u003E",
        '/' => "\\u002F",
        '\\' => "\\\\",
        '\u{8}' => "\\b",
        '\u{c}' => "\\f",
        '\n' => "\\n",
        '\r' => "\\r",
        '\t' => "\\t",
        '\0' => "\\0",
        '\u{2028}' => "\\u2028",
        '\u{2029}' => "\\u2029",
        _ => return None,
    })
}

/// Quote a string as a script string literal.
pub(crate) fn stringify_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' {
            out.push_str("\\\"");
        } else if let Some(esc) = escaped(c) {
            out.push_str(esc);
        } else {
            out.push(c);
        }
    }
    out.push('"');
    out
}

/// Escape characters that would end a script tag or break a line in a JSON
/// encoded string.
fn escape_unsafe_chars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' | '>' | '\u{2028}' | '\u{2029}' => out.push_str(escaped(c).unwrap_or_default()),
            _ => out.push(c),
        }
    }
    out
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c == '_' || c == '$' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric())
}

fn quote_key(key: &str) -> String {
    let json = serde_json::to_string(key).unwrap_or_else(|_| stringify_string(key));
    escape_unsafe_chars(&json)
}

/// Key position inside an object literal.
pub(crate) fn safe_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        quote_key(key)
    }
}

/// Property access suffix: `.key` or `["key"]`.
pub(crate) fn safe_prop(key: &str) -> String {
    if is_identifier(key) {
        format!(".{}", key)
    } else {
        format!("[{}]", quote_key(key))
    }
}

/// Regular expression literal that cannot end early or close a script tag.
///
/// Unescaped `/` and line terminators are escaped, `<` and `>` become
/// `\u` escapes. Flags keep only ASCII letters.
pub(crate) fn regexp_literal(source: &str, flags: &str) -> String {
    let source = if source.is_empty() { "(?:)" } else { source };
    let mut out = String::with_capacity(source.len() + 2 + flags.len());
    out.push('/');
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => match regexp_char_escape(next) {
                    Some(escaped) => out.push_str(escaped),
                    None => {
                        out.push('\\');
                        out.push(next);
                    }
                },
                None => out.push_str("\\\\"),
            },
            '/' => out.push_str("\\/"),
            c => match regexp_char_escape(c) {
                Some(escaped) => out.push_str(escaped),
                None => out.push(c),
            },
        }
    }
    out.push('/');
    out.extend(flags.chars().filter(char::is_ascii_alphabetic));
    out
}

fn regexp_char_escape(c: char) -> Option<&'static str> {
    match c {
        '\n' => Some("\\n"),
        '\r' => Some("\\r"),
        '\u{2028}' => Some("\\u2028"),
        '\u{2029}' => Some("\\u2029"),
        '<' => Some("\\u003C"),
        '>' => Some("\\u003E"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_close_is_escaped() {
        assert_eq!(
            stringify_string("</script>"),
            r#""\u003C\u002Fscript\u003E""#
        );
    }

    #[test]
    fn test_control_and_separator_chars() {
        assert_eq!(stringify_string("a\nb\t\0"), r#""a\nb\t\0""#);
        assert_eq!(stringify_string("\u{2028}\u{2029}"), r#""\u2028\u2029""#);
        assert_eq!(stringify_string("say \"hi\" \\"), r#""say \"hi\" \\""#);
    }

    #[test]
    fn test_non_ascii_passes_through() {
        assert_eq!(stringify_string("Привет 🎥"), "\"Привет 🎥\"");
    }

    #[test]
    fn test_safe_key() {
        assert_eq!(safe_key("name"), "name");
        assert_eq!(safe_key("$el_2"), "$el_2");
        assert_eq!(safe_key("data-id"), r#""data-id""#);
        assert_eq!(safe_key("1st"), r#""1st""#);
        assert_eq!(safe_key("<b>"), r#""\u003Cb\u003E""#);
    }

    #[test]
    fn test_safe_prop() {
        assert_eq!(safe_prop("name"), ".name");
        assert_eq!(safe_prop("a b"), r#"["a b"]"#);
    }

    #[test]
    fn test_regexp_literal() {
        assert_eq!(regexp_literal("a+b", "gi"), "/a+b/gi");
        assert_eq!(regexp_literal("", ""), "/(?:)/");
        assert_eq!(regexp_literal("<\\/script>", ""), "/\\u003C\\/script\\u003E/");
    }

    #[test]
    fn test_regexp_literal_cannot_end_early() {
        assert_eq!(
            regexp_literal("x/;globalThis.pwned=1;/", ""),
            "/x\\/;globalThis.pwned=1;\\//"
        );
        assert_eq!(regexp_literal("a\\/b", "g"), "/a\\/b/g");
        assert_eq!(regexp_literal("a\nb\r\u{2028}\u{2029}", ""), "/a\\nb\\r\\u2028\\u2029/");
        assert_eq!(regexp_literal("\\\n", ""), "/\\n/");
        assert_eq!(regexp_literal("a\\", ""), "/a\\\\/");
        assert_eq!(regexp_literal("a", "g/;x"), "/a/gx");
    }
}
