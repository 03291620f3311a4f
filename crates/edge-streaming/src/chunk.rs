//! Chunk boundaries.

/// Byte length of the longest prefix of `s` that fits in `max` bytes without
/// splitting a character. Always makes progress on non-empty input.
pub(crate) fn chunk_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    if end == 0 {
        s.chars().next().map_or(0, char::len_utf8)
    } else {
        end
    }
}

/// Split off at most `max` bytes from the front of `buffer`.
pub(crate) fn take_chunk(buffer: &mut String, max: usize) -> String {
    let end = chunk_boundary(buffer, max);
    if end == buffer.len() {
        return std::mem::take(buffer);
    }
    let rest = buffer.split_off(end);
    std::mem::replace(buffer, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_boundary_ascii() {
        assert_eq!(chunk_boundary("hello", 10), 5);
        assert_eq!(chunk_boundary("hello", 3), 3);
        assert_eq!(chunk_boundary("", 3), 0);
    }

    #[test]
    fn test_chunk_boundary_multibyte() {
        // "é" is two bytes.
        assert_eq!(chunk_boundary("aé", 2), 1);
        assert_eq!(chunk_boundary("é", 1), 2);
        assert_eq!(chunk_boundary("日本", 4), 3);
        assert_eq!(chunk_boundary("x", 0), 1);
    }

    #[test]
    fn test_take_chunk() {
        let mut buffer = String::from("abcdef");
        assert_eq!(take_chunk(&mut buffer, 4), "abcd");
        assert_eq!(buffer, "ef");
        assert_eq!(take_chunk(&mut buffer, 4), "ef");
        assert!(buffer.is_empty());
    }
}
