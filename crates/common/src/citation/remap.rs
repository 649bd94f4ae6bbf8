//! Rank remapping for RAG answers
//!
//! RAG answers cite `[n]` where `n` is the 1-based rank of a reranked
//! document. Only cited ranks are kept, renumbered 1..N in order of first
//! appearance, scanning the brief answer before the long one.

use super::reconciler::{apply_edits, scan_simple_markers, TextEdit};
use crate::retrieval::RankedDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One cited document in a RAG answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagCitation {
    /// Renumbered marker shown in the answer text
    #[serde(rename = "doc_id")]
    pub display_index: usize,

    #[serde(rename = "control_number")]
    pub source_id: Option<i64>,

    /// Cited chunk text
    #[serde(rename = "snippet")]
    pub snippet_text: String,
}

/// Old-rank to new-rank mapping built from one or more answer texts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankRemap {
    old_to_new: HashMap<usize, usize>,
    cited: Vec<usize>,
}

impl RankRemap {
    /// Collect in-range ranks (1..=available) across `texts` in order
    pub fn from_texts(texts: &[&str], available: usize) -> Self {
        let mut remap = Self::default();

        for text in texts {
            for marker in scan_simple_markers(text) {
                let old = marker.primary_index;
                if old == 0 || old > available || remap.old_to_new.contains_key(&old) {
                    continue;
                }
                remap.cited.push(old);
                remap.old_to_new.insert(old, remap.cited.len());
            }
        }

        remap
    }

    /// New number for an old rank, if it was cited
    pub fn get(&self, old: usize) -> Option<usize> {
        self.old_to_new.get(&old).copied()
    }

    /// Old ranks in display order
    pub fn cited_ranks(&self) -> &[usize] {
        &self.cited
    }

    pub fn is_empty(&self) -> bool {
        self.cited.is_empty()
    }

    /// Rewrite `[old]` to `[new]`; unknown markers stay as they are
    pub fn apply(&self, text: &str) -> String {
        let edits: Vec<TextEdit> = scan_simple_markers(text)
            .into_iter()
            .filter_map(|marker| {
                self.get(marker.primary_index).map(|new| TextEdit {
                    range: marker.range,
                    replacement: format!("[{}]", new),
                })
            })
            .collect();

        apply_edits(text, &edits)
    }

    /// Citations for the cited documents, in display order
    pub fn citations(&self, documents: &[RankedDocument]) -> Vec<RagCitation> {
        self.cited
            .iter()
            .enumerate()
            .filter_map(|(i, &old)| {
                documents.get(old - 1).map(|doc| RagCitation {
                    display_index: i + 1,
                    source_id: doc.control_number,
                    snippet_text: doc.text.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn docs(n: usize) -> Vec<RankedDocument> {
        (0..n)
            .map(|i| RankedDocument {
                text: format!("chunk {}", i + 1),
                control_number: Some(500 + i as i64),
                relevance_score: 1.0 - i as f32 * 0.1,
            })
            .collect()
    }

    #[test]
    fn test_remap_brief_before_long() {
        let brief = "Short [3].";
        let long = "Longer [1] and [3] and [5].";
        let remap = RankRemap::from_texts(&[brief, long], 5);

        assert_eq!(remap.cited_ranks(), &[3, 1, 5]);
        assert_eq!(remap.apply(brief), "Short [1].");
        assert_eq!(remap.apply(long), "Longer [2] and [1] and [3].");
    }

    #[test]
    fn test_remap_prefix_collision() {
        let text = "[1] [10] [1]";
        let remap = RankRemap::from_texts(&[text], 10);
        assert_eq!(remap.apply(text), "[1] [2] [1]");
    }

    #[test]
    fn test_out_of_range_and_zero_untouched() {
        let text = "[0] [2] [7]";
        let remap = RankRemap::from_texts(&[text], 3);

        assert_eq!(remap.cited_ranks(), &[2]);
        assert_eq!(remap.apply(text), "[0] [1] [7]");
    }

    #[test]
    fn test_citations_follow_display_order() {
        let remap = RankRemap::from_texts(&["[2] then [1]"], 3);
        let citations = remap.citations(&docs(3));

        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].display_index, 1);
        assert_eq!(citations[0].source_id, Some(501));
        assert_eq!(citations[0].snippet_text, "chunk 2");
        assert_eq!(citations[1].source_id, Some(500));
    }

    #[test]
    fn test_no_markers() {
        let remap = RankRemap::from_texts(&["plain", ""], 4);
        assert!(remap.is_empty());
        assert!(remap.citations(&docs(4)).is_empty());
        assert_eq!(remap.apply("plain"), "plain");
    }

    #[test]
    fn test_rag_citation_wire_names() {
        let citation = RagCitation {
            display_index: 1,
            source_id: Some(42),
            snippet_text: "x".into(),
        };
        assert_eq!(
            serde_json::to_value(&citation).unwrap(),
            serde_json::json!({"doc_id": 1, "control_number": 42, "snippet": "x"})
        );
    }
}
