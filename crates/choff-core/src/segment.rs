//! Sentence-delimiter segmentation.
//!
//! Text is split on `.` only. Fragments are trimmed and empty fragments are
//! dropped, so trailing delimiters, runs of delimiters and surrounding
//! whitespace never produce segments.

use crate::error::{Error, Result};

/// Segment delimiter.
pub const DELIMITER: char = '.';

/// Maximum number of characters of the first segment used in a title.
pub const TITLE_PREFIX_CHARS: usize = 50;

/// Split text into trimmed, non-empty segments in their original order.
pub fn split_segments(text: &str) -> Vec<String> {
    text.split(DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Like [`split_segments`], but fails with [`Error::InvalidInput`] when the
/// text yields no segments at all.
pub fn require_segments(text: &str) -> Result<Vec<String>> {
    let segments = split_segments(text);
    if segments.is_empty() {
        return Err(Error::InvalidInput(
            "text must contain at least one non-empty segment".to_string(),
        ));
    }
    Ok(segments)
}

/// Title for a conversation, derived from its first segment.
pub fn derive_title(first_segment: &str) -> String {
    let prefix: String = first_segment.chars().take(TITLE_PREFIX_CHARS).collect();
    format!("Conversation {}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_drops_trailing_delimiter_and_whitespace() {
        assert_eq!(split_segments("A. B. C."), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_split_preserves_order_and_skips_empty_runs() {
        let segments = split_segments("  first one...second\n\n. third  ");
        assert_eq!(segments, vec!["first one", "second", "third"]);
    }

    #[test]
    fn test_split_without_delimiter_is_single_segment() {
        assert_eq!(split_segments("no delimiter here"), vec!["no delimiter here"]);
    }

    #[test]
    fn test_whitespace_only_is_invalid() {
        assert!(split_segments(" \n\t ").is_empty());
        let err = require_segments(" . . ").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_title_truncates_on_char_boundary() {
        let long = "é".repeat(80);
        let title = derive_title(&long);
        assert_eq!(title, format!("Conversation {}...", "é".repeat(50)));
        assert_eq!(derive_title("short"), "Conversation short...");
    }
}
