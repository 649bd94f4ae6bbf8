//! Citation handling for generated answers
//!
//! - `reconciler`: `[n]` and `[p:s]` markers against search hits
//! - `remap`: 1-based rank renumbering for RAG answers
//! - `formatter`: markdown references for cited records

mod formatter;
mod reconciler;
mod remap;

pub use formatter::{format_reference, permalink, INSPIRE_LITERATURE_URL};
pub use reconciler::{
    apply_edits, reconcile_simple, reconcile_with_snippets, scan_compound_markers,
    scan_simple_markers, CitationDetail, CitationMarker, CitedReference, ReconciledAnswer,
    SnippetCitations, TextEdit,
};
pub use remap::{RagCitation, RankRemap};
