//! Text sanitization
//!
//! Documents arrive from uploads and object stores with stray control
//! bytes that break tsvector generation. Sanitization strips NUL and
//! other control characters while keeping the whitespace that the
//! chunker relies on for structure.

/// Remove control characters from raw text.
///
/// Newline, tab, and carriage return survive; every other control
/// character (including NUL) is dropped. Running the function twice
/// returns the same output as running it once.
pub fn clean_text(raw: &str) -> String {
    raw.chars()
        .filter(|&c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_nul_bytes() {
        assert_eq!(clean_text("he\0llo"), "hello");
    }

    #[test]
    fn keeps_structural_whitespace() {
        let text = "line one\nline two\ttabbed\r\n";
        assert_eq!(clean_text(text), text);
    }

    #[test]
    fn strips_other_control_characters() {
        assert_eq!(clean_text("a\x01b\x08c\x1bd"), "abcd");
    }

    #[test]
    fn plain_text_passes_through() {
        let text = "Paragraph one.\n\nParagraph two with unicode: café 日本語";
        assert_eq!(clean_text(text), text);
    }

    #[test]
    fn is_idempotent() {
        let raw = "a\0b\x02c\nd\te";
        let once = clean_text(raw);
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean_text(""), "");
    }
}
