//! Search pipeline: query expansion, literature search, cited answer

use super::stage::{PipelineRun, PipelineStage};
use crate::citation::{reconcile_simple, reconcile_with_snippets, CitationDetail};
use crate::context::build_context;
use crate::errors::{AppError, Result};
use crate::llm::{AnswerDraft, ChainRegistry, ExpandedQuery};
use crate::metrics::record_citations;
use crate::search::{render_fulltext_query, SearchHit, SearchTool};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const PIPELINE: &str = "search";

/// Answer with renumbered markers and formatted references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAnswer {
    pub brief: String,
    pub response: String,
    pub references: Vec<String>,
    /// Expanded terms rendered as `ft "a" OR ft "b"`
    pub expanded_query: String,
}

/// Answer with raw `[p:s]` markers and their resolutions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaygroundAnswer {
    pub brief: String,
    pub response: String,
    pub citations: BTreeMap<String, CitationDetail>,
}

/// Drives one search request through expansion, search and answering
pub struct SearchOrchestrator {
    chains: Arc<ChainRegistry>,
    abstract_search: Arc<dyn SearchTool>,
    highlight_search: Option<Arc<dyn SearchTool>>,
}

struct Drafted {
    answer: AnswerDraft,
    hits: Vec<SearchHit>,
    expanded: ExpandedQuery,
}

impl SearchOrchestrator {
    pub fn new(
        chains: Arc<ChainRegistry>,
        abstract_search: Arc<dyn SearchTool>,
        highlight_search: Option<Arc<dyn SearchTool>>,
    ) -> Self {
        Self {
            chains,
            abstract_search,
            highlight_search,
        }
    }

    fn tool(&self, use_highlights: bool) -> Result<&Arc<dyn SearchTool>> {
        if !use_highlights {
            return Ok(&self.abstract_search);
        }
        self.highlight_search
            .as_ref()
            .ok_or_else(|| AppError::Configuration {
                message: "Highlight search requested but no full-text backend is configured"
                    .to_string(),
            })
    }

    async fn draft(
        &self,
        run: &mut PipelineRun,
        query: &str,
        model: &str,
        use_highlights: bool,
        playground: bool,
    ) -> Result<Drafted> {
        let tool = self.tool(use_highlights)?;
        let chains = self.chains.get(model).await?;

        let expanded = run
            .run(PipelineStage::ExpandingQuery, chains.expand_query(query))
            .await?;

        let hits = run
            .run(PipelineStage::Searching, tool.search(&expanded.terms))
            .await?;

        let mode = tool.context_mode();
        let context = run.run_pure(PipelineStage::BuildingContext, || build_context(&hits, mode));

        let answer = run
            .run(
                PipelineStage::GeneratingAnswer,
                chains.generate_answer(query, &context, playground),
            )
            .await?;

        tracing::debug!(
            run_id = %run.run_id(),
            tool = tool.name(),
            terms = expanded.terms.len(),
            hits = hits.len(),
            "Answer drafted"
        );

        Ok(Drafted {
            answer,
            hits,
            expanded,
        })
    }

    /// Answer `query` with `[n]` citations rewritten to bold display numbers
    pub async fn search(
        &self,
        query: &str,
        model: &str,
        user: Option<&str>,
        use_highlights: bool,
    ) -> Result<SearchAnswer> {
        let mut run = PipelineRun::start(PIPELINE);
        tracing::info!(run_id = %run.run_id(), model = model, user = user, "Search started");

        let drafted = self.draft(&mut run, query, model, use_highlights, false).await?;

        let reconciled = run.run_pure(PipelineStage::Reconciling, || {
            reconcile_simple(&drafted.answer.response, &drafted.hits)
        });
        record_citations(PIPELINE, reconciled.references.len());
        run.finish();

        Ok(SearchAnswer {
            brief: drafted.answer.brief,
            references: reconciled.formatted_references(),
            response: reconciled.rewritten_text,
            expanded_query: render_fulltext_query(&drafted.expanded.terms),
        })
    }

    /// Answer `query` from highlights, resolving `[p:s]` markers to snippets
    pub async fn search_playground(&self, query: &str, model: &str) -> Result<PlaygroundAnswer> {
        let mut run = PipelineRun::start(PIPELINE);
        tracing::info!(run_id = %run.run_id(), model = model, "Playground search started");

        let drafted = self.draft(&mut run, query, model, true, true).await?;

        let resolved = run.run_pure(PipelineStage::Reconciling, || {
            reconcile_with_snippets(&drafted.answer.response, &drafted.hits)
        });
        record_citations(PIPELINE, resolved.citations.len());
        run.finish();

        Ok(PlaygroundAnswer {
            brief: drafted.answer.brief,
            response: resolved.text,
            citations: resolved.citations,
        })
    }
}
