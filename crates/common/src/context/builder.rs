//! Prompt context assembly
//!
//! Block numbering here is the contract the citation reconciler parses
//! against: full-text search context is 0-based (`Result [0]`), RAG context
//! is 1-based (`Document 1`).

use crate::retrieval::RankedDocument;
use crate::search::{SearchHit, NOT_AVAILABLE};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Separator placed between RAG document blocks
const RAG_SEPARATOR: &str = "\n----------\n";

/// What each search hit contributes to the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// Title and abstract
    Abstract,
    /// Title and numbered highlight snippets
    Highlight,
}

fn emphasis_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"</?em>").expect("valid emphasis pattern"))
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

/// Strip `<em>` markup and collapse whitespace runs to one space
pub fn normalize_snippet(snippet: &str) -> String {
    let without_markup = emphasis_pattern().replace_all(snippet, " ");
    whitespace_pattern().replace_all(&without_markup, " ").into_owned()
}

/// Render hits into numbered context blocks, preserving input order.
///
/// No filtering or truncation happens here; callers decide how many hits
/// to pass in.
pub fn build_context(hits: &[SearchHit], mode: ContextMode) -> String {
    let blocks: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| match mode {
            ContextMode::Abstract => format!(
                "Result [{}]\n\nTitle: {}\n\nAbstract: {}\n\n",
                i, hit.title, hit.abstract_text
            ),
            ContextMode::Highlight => format!(
                "Result [{}]\n\nTitle: {}\n\nSnippets:\n{}",
                i,
                hit.title,
                format_snippets(&hit.highlights)
            ),
        })
        .collect();

    blocks.join("\n")
}

/// Numbered snippets, or an explicit placeholder so the block still exists
fn format_snippets(snippets: &[String]) -> String {
    if snippets.is_empty() {
        return format!("{}\n\n", NOT_AVAILABLE);
    }

    snippets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Snippet [{}]: {}\n\n", i, normalize_snippet(s)))
        .collect()
}

/// Render reranked chunks as 1-based `Document n` blocks
pub fn build_rag_context(documents: &[RankedDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let control_number = doc
                .control_number
                .map(|cn| cn.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            format!(
                "Document {}: \nControl Number: {}\n\n{}",
                i + 1,
                control_number,
                doc.text
            )
        })
        .collect::<Vec<_>>()
        .join(RAG_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hit(cn: i64, title: &str, abstract_text: &str) -> SearchHit {
        SearchHit {
            abstract_text: abstract_text.to_string(),
            ..SearchHit::new(cn, title)
        }
    }

    #[test]
    fn test_abstract_mode_empty() {
        assert_eq!(build_context(&[], ContextMode::Abstract), "");
    }

    #[test]
    fn test_abstract_mode_numbering() {
        let hits = vec![
            hit(1, "Alpha", "First."),
            hit(2, "Beta", "Second."),
            hit(3, "Gamma", "Third."),
        ];
        let context = build_context(&hits, ContextMode::Abstract);

        assert_eq!(context.matches("Result [").count(), 3);
        assert!(context.starts_with("Result [0]\n\nTitle: Alpha\n\nAbstract: First.\n\n"));
        assert!(context.contains("\nResult [1]\n\nTitle: Beta"));
        assert!(context.contains("\nResult [2]\n\nTitle: Gamma"));
    }

    #[test]
    fn test_highlight_mode_snippets() {
        let mut h = hit(7, "Lattice QCD", "unused");
        h.highlights = vec![
            "quark  <em>confinement</em>\n at   low energy".to_string(),
            "second".to_string(),
        ];
        let context = build_context(&[h], ContextMode::Highlight);

        assert_eq!(
            context,
            "Result [0]\n\nTitle: Lattice QCD\n\nSnippets:\n\
             Snippet [0]: quark confinement at low energy\n\n\
             Snippet [1]: second\n\n"
        );
    }

    #[test]
    fn test_highlight_mode_placeholder_keeps_block() {
        let hits = vec![hit(1, "Empty", "x"), hit(2, "Also empty", "y")];
        let context = build_context(&hits, ContextMode::Highlight);

        assert!(context.contains("Result [0]\n\nTitle: Empty\n\nSnippets:\nN/A\n\n"));
        assert!(context.contains("Result [1]\n\nTitle: Also empty\n\nSnippets:\nN/A\n\n"));
    }

    #[test]
    fn test_normalize_snippet() {
        assert_eq!(normalize_snippet("a\t\tb <em>c</em>  d"), "a b c d");
        assert_eq!(normalize_snippet("plain"), "plain");
    }

    #[test]
    fn test_rag_context_is_one_based() {
        let docs = vec![
            RankedDocument {
                text: "chunk one".into(),
                control_number: Some(11),
                relevance_score: 0.9,
            },
            RankedDocument {
                text: "chunk two".into(),
                control_number: None,
                relevance_score: 0.4,
            },
        ];
        let context = build_rag_context(&docs);

        assert_eq!(
            context,
            "Document 1: \nControl Number: 11\n\nchunk one\
             \n----------\n\
             Document 2: \nControl Number: N/A\n\nchunk two"
        );
    }
}
