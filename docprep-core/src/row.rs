//! The row shape a pipeline hands to the vector store: one per chunk.

use serde::{Deserialize, Serialize};

/// `[PAGE][n][PAGE]` page-boundary marker emitted by the parser, as embedded
/// in raw chunk text before [`strip_page_markers`] runs.
pub const PAGE_MARKER_OPEN: &str = "[PAGE][";
pub const PAGE_MARKER_CLOSE: &str = "][PAGE]";

/// One chunk's embedding plus the document metadata it is stored with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRow {
    pub embedding: Vec<f32>,
    pub chunk: String,
    pub metadata: serde_json::Value,
    pub page: i64,
}

/// Scans `chunk` for `[PAGE][n][PAGE]` markers, strips them, and returns the
/// cleaned text plus the page number of the last marker found (or `1` if
/// none were present). Intra-page layout markers (`[/table][id][/table]`
/// etc.) are left untouched.
#[must_use]
pub fn strip_page_markers(chunk: &str) -> (String, i64) {
    let mut page = 1i64;
    let mut cleaned = String::with_capacity(chunk.len());
    let mut rest = chunk;

    while let Some(open) = rest.find(PAGE_MARKER_OPEN) {
        cleaned.push_str(&rest[..open]);
        let after_open = &rest[open + PAGE_MARKER_OPEN.len()..];
        let Some(close_rel) = after_open.find(PAGE_MARKER_CLOSE) else {
            // Unterminated marker: treat the rest as ordinary text.
            cleaned.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let digits = &after_open[..close_rel];
        if let Ok(n) = digits.parse::<i64>() {
            page = n;
        } else {
            // Not actually a page marker; keep the literal text.
            cleaned.push_str(&rest[open..open + PAGE_MARKER_OPEN.len() + close_rel + PAGE_MARKER_CLOSE.len()]);
        }
        rest = &after_open[close_rel + PAGE_MARKER_CLOSE.len()..];
    }
    cleaned.push_str(rest);
    (cleaned, page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_marker_defaults_to_page_one() {
        let (text, page) = strip_page_markers("hello world");
        assert_eq!(text, "hello world");
        assert_eq!(page, 1);
    }

    #[test]
    fn single_marker_is_stripped_and_recorded() {
        let (text, page) = strip_page_markers("[PAGE][3][PAGE]hello");
        assert_eq!(text, "hello");
        assert_eq!(page, 3);
    }

    #[test]
    fn last_marker_wins_when_several_present() {
        let (text, page) =
            strip_page_markers("[PAGE][1][PAGE]first [PAGE][2][PAGE]second [PAGE][5][PAGE]third");
        assert_eq!(text, "first second third");
        assert_eq!(page, 5);
    }

    #[test]
    fn layout_markers_are_left_in_place() {
        let (text, page) = strip_page_markers("[PAGE][2][PAGE]see [/table][1][/table] above");
        assert_eq!(text, "see [/table][1][/table] above");
        assert_eq!(page, 2);
    }

    #[test]
    fn stored_chunk_never_contains_a_page_marker() {
        let (text, _) = strip_page_markers("[PAGE][9][PAGE]a[PAGE][10][PAGE]b");
        assert!(!text.contains("[PAGE]["));
    }
}
