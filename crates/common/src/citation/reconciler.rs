//! Citation reconciliation
//!
//! Generated answers cite context blocks with inline markers. Reconciliation
//! deduplicates those markers, renumbers them 1..N in order of first
//! appearance, and resolves each to the record it points at.
//!
//! Rewrites never mutate the answer in place. Every marker is located once
//! against the original text, turned into a [`TextEdit`], and all edits are
//! applied in a single pass, so replacing `[1]` can never touch the digits
//! of a neighbouring `[12]`.
//!
//! Reconciliation is not idempotent in general: feeding the rewritten text
//! back in with the reduced reference list only round-trips when that list
//! keeps the original ordering.

use super::formatter::format_reference;
use crate::search::SearchHit;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::OnceLock;

fn simple_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("valid marker pattern"))
}

fn compound_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[(\d+):(\d+)\]").expect("valid marker pattern"))
}

/// One `[n]` or `[p:s]` occurrence in generated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationMarker {
    /// Exact matched substring, brackets included
    pub raw_match: String,

    /// Byte range of the match in the scanned text
    pub range: Range<usize>,

    /// Document ordinal as emitted by the model
    pub primary_index: usize,

    /// Snippet ordinal, compound markers only
    pub secondary_index: Option<usize>,
}

/// Replacement of one byte range of the original text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub replacement: String,
}

/// Apply non-overlapping edits, given in ascending order, to `text`
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for edit in edits {
        debug_assert!(edit.range.start >= cursor, "edits must be sorted and disjoint");
        out.push_str(&text[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }

    out.push_str(&text[cursor..]);
    out
}

/// Find every `[n]` marker, left to right.
///
/// Ordinals too large to represent are not citations and are skipped.
pub fn scan_simple_markers(text: &str) -> Vec<CitationMarker> {
    simple_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let primary_index = caps.get(1)?.as_str().parse().ok()?;
            Some(CitationMarker {
                raw_match: whole.as_str().to_string(),
                range: whole.range(),
                primary_index,
                secondary_index: None,
            })
        })
        .collect()
}

/// Find every `[p:s]` marker, left to right
pub fn scan_compound_markers(text: &str) -> Vec<CitationMarker> {
    compound_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let primary_index = caps.get(1)?.as_str().parse().ok()?;
            let secondary_index = caps.get(2)?.as_str().parse().ok()?;
            Some(CitationMarker {
                raw_match: whole.as_str().to_string(),
                range: whole.range(),
                primary_index,
                secondary_index: Some(secondary_index),
            })
        })
        .collect()
}

/// A cited record with its display number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitedReference {
    /// 1-based number shown in the rewritten text
    pub display_index: usize,

    pub control_number: i64,

    /// Markdown reference produced by [`format_reference`]
    pub formatted: String,
}

/// Output of [`reconcile_simple`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledAnswer {
    pub rewritten_text: String,

    /// Ordered by display index
    pub references: Vec<CitedReference>,
}

impl ReconciledAnswer {
    /// Formatted reference strings in display order
    pub fn formatted_references(&self) -> Vec<String> {
        self.references.iter().map(|r| r.formatted.clone()).collect()
    }
}

/// Reconcile `[n]` markers where `n` is a 0-based position into `hits`.
///
/// Each distinct in-range ordinal gets the next display number on first
/// appearance and every occurrence is rewritten to ` **[d]**`. Ordinals with
/// no matching hit are left verbatim and never consume a display number.
pub fn reconcile_simple(answer_text: &str, hits: &[SearchHit]) -> ReconciledAnswer {
    let markers = scan_simple_markers(answer_text);

    let mut display: HashMap<usize, usize> = HashMap::new();
    let mut references = Vec::new();
    let mut edits = Vec::with_capacity(markers.len());

    for marker in markers {
        let Some(hit) = hits.get(marker.primary_index) else {
            continue;
        };

        let next = display.len() + 1;
        let display_index = *display.entry(marker.primary_index).or_insert_with(|| {
            references.push(CitedReference {
                display_index: next,
                control_number: hit.control_number,
                formatted: format_reference(hit),
            });
            next
        });

        edits.push(TextEdit {
            range: marker.range,
            replacement: format!(" **[{}]**", display_index),
        });
    }

    ReconciledAnswer {
        rewritten_text: apply_edits(answer_text, &edits),
        references,
    }
}

/// Resolution of one `[p:s]` marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationDetail {
    /// Control number of the cited record
    #[serde(rename = "paperId")]
    pub source_id: i64,

    /// Highlight text, empty when the snippet ordinal is out of range
    #[serde(rename = "snippet")]
    pub snippet_text: String,

    /// 1-based number of the cited record, shared by all its snippets
    #[serde(rename = "display")]
    pub display_index: usize,
}

/// Output of [`reconcile_with_snippets`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnippetCitations {
    /// The answer exactly as generated
    pub text: String,

    /// Keyed by the raw marker text, e.g. `"[0:1]"`
    pub citations: BTreeMap<String, CitationDetail>,

    /// Paper ordinal to display number, in first-appearance order
    pub paper_order: Vec<(usize, usize)>,
}

/// Resolve `[p:s]` markers against highlight snippets without rewriting.
///
/// Display numbers are assigned per paper ordinal on first appearance,
/// independent of the snippet ordinal. Markers naming a paper outside
/// `hits` are ignored.
pub fn reconcile_with_snippets(answer_text: &str, hits: &[SearchHit]) -> SnippetCitations {
    let mut paper_display: HashMap<usize, usize> = HashMap::new();
    let mut paper_order = Vec::new();
    let mut citations = BTreeMap::new();

    for marker in scan_compound_markers(answer_text) {
        let paper = marker.primary_index;
        let Some(hit) = hits.get(paper) else {
            tracing::debug!(marker = %marker.raw_match, "Citation references a paper outside the context");
            continue;
        };

        let next = paper_display.len() + 1;
        let display_index = *paper_display.entry(paper).or_insert_with(|| {
            paper_order.push((paper, next));
            next
        });

        let snippet_text = marker
            .secondary_index
            .and_then(|s| hit.highlights.get(s))
            .cloned()
            .unwrap_or_default();

        citations.insert(
            marker.raw_match,
            CitationDetail {
                source_id: hit.control_number,
                snippet_text,
                display_index,
            },
        );
    }

    SnippetCitations {
        text: answer_text.to_string(),
        citations,
        paper_order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hits(n: usize) -> Vec<SearchHit> {
        (0..n)
            .map(|i| SearchHit {
                highlights: vec![format!("p{}s0", i), format!("p{}s1", i)],
                ..SearchHit::new(1000 + i as i64, format!("Paper {}", i))
            })
            .collect()
    }

    #[test]
    fn test_no_markers_is_identity() {
        let result = reconcile_simple("Nothing cited here.", &hits(3));
        assert_eq!(result.rewritten_text, "Nothing cited here.");
        assert!(result.references.is_empty());

        let empty = reconcile_simple("", &hits(3));
        assert_eq!(empty.rewritten_text, "");
        assert!(empty.references.is_empty());
    }

    #[test]
    fn test_first_appearance_order() {
        let result = reconcile_simple("A [2] then [0] then [2].", &hits(3));

        assert_eq!(result.rewritten_text, "A  **[1]** then  **[2]** then  **[1]**.");
        let numbers: Vec<_> = result.references.iter().map(|r| r.control_number).collect();
        assert_eq!(numbers, vec![1002, 1000]);
        let displays: Vec<_> = result.references.iter().map(|r| r.display_index).collect();
        assert_eq!(displays, vec![1, 2]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let result = reconcile_simple("[1] x [1] y [1]", &hits(2));
        assert_eq!(result.references.len(), 1);
        assert_eq!(result.rewritten_text.matches("**[1]**").count(), 3);
    }

    #[test]
    fn test_prefix_collision() {
        let result = reconcile_simple("See [1] and [12] and [1] again", &hits(13));

        assert_eq!(
            result.rewritten_text,
            "See  **[1]** and  **[2]** and  **[1]** again"
        );
        assert_eq!(result.references[0].control_number, 1001);
        assert_eq!(result.references[1].control_number, 1012);
    }

    #[test]
    fn test_renumbered_value_colliding_with_original() {
        // [2] becomes 1 and [1] becomes 2; a sequential replace would swap them twice
        let result = reconcile_simple("[2] [1] [2]", &hits(3));
        assert_eq!(result.rewritten_text, " **[1]**  **[2]**  **[1]**");
        assert_eq!(result.references[0].control_number, 1002);
    }

    #[test]
    fn test_out_of_range_excluded() {
        let result = reconcile_simple("Real [0], invented [9], real [1].", &hits(2));

        assert_eq!(
            result.rewritten_text,
            "Real  **[1]**, invented [9], real  **[2]**."
        );
        assert_eq!(result.references.len(), 2);
        let displays: Vec<_> = result.references.iter().map(|r| r.display_index).collect();
        assert_eq!(displays, vec![1, 2]);
    }

    #[test]
    fn test_compound_markers_ignored_by_simple_scan() {
        assert!(scan_simple_markers("[0:1] and [3:0]").is_empty());
        assert_eq!(scan_compound_markers("[0:1] and [3]").len(), 1);
    }

    #[test]
    fn test_oversized_ordinal_is_not_a_marker() {
        let text = "[99999999999999999999999999] [0]";
        let markers = scan_simple_markers(text);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].primary_index, 0);
    }

    #[test]
    fn test_apply_edits() {
        let text = "ab[1]cd[2]";
        let edits = vec![
            TextEdit { range: 2..5, replacement: "X".into() },
            TextEdit { range: 7..10, replacement: "YY".into() },
        ];
        assert_eq!(apply_edits(text, &edits), "abXcdYY");
        assert_eq!(apply_edits(text, &[]), text);
    }

    #[test]
    fn test_snippet_paper_order() {
        let result = reconcile_with_snippets("[0:0] and [0:1] and [1:0]", &hits(2));

        assert_eq!(result.paper_order, vec![(0, 1), (1, 2)]);
        assert_eq!(result.citations["[0:0]"].display_index, 1);
        assert_eq!(result.citations["[0:1]"].display_index, 1);
        assert_eq!(result.citations["[1:0]"].display_index, 2);
        assert_eq!(result.citations["[0:1]"].snippet_text, "p0s1");
        assert_eq!(result.citations["[1:0]"].source_id, 1001);
        assert_eq!(result.text, "[0:0] and [0:1] and [1:0]");
    }

    #[test]
    fn test_snippet_order_independent_of_snippet_ordinal() {
        let result = reconcile_with_snippets("[1:1] then [0:0] then [1:0]", &hits(2));
        assert_eq!(result.paper_order, vec![(1, 1), (0, 2)]);
        assert_eq!(result.citations["[1:0]"].display_index, 1);
    }

    #[test]
    fn test_snippet_out_of_range_is_empty() {
        let result = reconcile_with_snippets("[0:5]", &hits(1));
        assert_eq!(result.citations["[0:5]"].snippet_text, "");
        assert_eq!(result.citations["[0:5]"].display_index, 1);
    }

    #[test]
    fn test_snippet_duplicate_raw_match_collapses() {
        let result = reconcile_with_snippets("[0:0] and again [0:0]", &hits(1));
        assert_eq!(result.citations.len(), 1);
    }

    #[test]
    fn test_snippet_unknown_paper_skipped() {
        let result = reconcile_with_snippets("[4:0] then [0:0]", &hits(1));
        assert!(!result.citations.contains_key("[4:0]"));
        assert_eq!(result.citations["[0:0]"].display_index, 1);
    }

    #[test]
    fn test_citation_detail_wire_names() {
        let detail = CitationDetail {
            source_id: 7,
            snippet_text: "s".into(),
            display_index: 1,
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value, serde_json::json!({"paperId": 7, "snippet": "s", "display": 1}));
    }
}
