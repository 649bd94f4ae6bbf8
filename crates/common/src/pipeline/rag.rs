//! RAG pipeline: embed, retrieve, rerank, cited answer

use super::stage::{PipelineRun, PipelineStage};
use crate::citation::{RagCitation, RankRemap};
use crate::context::build_rag_context;
use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::llm::{ChainRegistry, ChatMessage};
use crate::metrics::record_citations;
use crate::retrieval::{apply_rerank, RankedDocument, Reranker, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const PIPELINE: &str = "rag";

/// Retrieval collaborators, built once at startup and shared by all requests
#[derive(Clone)]
pub struct RagResources {
    pub embedder: Arc<dyn Embedder>,
    pub vector_store: Arc<dyn VectorStore>,
    pub reranker: Arc<dyn Reranker>,
    /// Candidates fetched before reranking
    pub k: usize,
    /// Documents kept after reranking
    pub top_n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub brief_answer: String,
    pub long_answer: String,
    pub citations: Vec<RagCitation>,
    pub trace_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagPaperAnswer {
    pub long_answer: String,
    pub trace_id: Uuid,
}

pub struct RagOrchestrator {
    chains: Arc<ChainRegistry>,
    resources: RagResources,
}

impl RagOrchestrator {
    pub fn new(chains: Arc<ChainRegistry>, resources: RagResources) -> Self {
        Self { chains, resources }
    }

    /// Embed, retrieve and rerank. A control number replaces similarity
    /// search with an exact filter on that record's chunks.
    async fn retrieve(
        &self,
        run: &mut PipelineRun,
        query: &str,
        control_number: Option<i64>,
    ) -> Result<Vec<RankedDocument>> {
        let res = &self.resources;

        let chunks = match control_number {
            Some(cn) => {
                run.run(
                    PipelineStage::Retrieving,
                    res.vector_store.find_by_control_number(cn, res.k),
                )
                .await?
            }
            None => {
                let vector = run
                    .run(PipelineStage::Embedding, res.embedder.embed(query))
                    .await?;
                run.run(
                    PipelineStage::Retrieving,
                    res.vector_store.similarity_search(&vector, res.k),
                )
                .await?
            }
        };

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let top_n = res.top_n;

        run.run(PipelineStage::Reranking, async {
            let results = res.reranker.rerank(query, &texts, top_n).await?;
            apply_rerank(chunks, results, top_n)
        })
        .await
    }

    /// Answer `query` from the whole corpus
    pub async fn answer(&self, query: &str, model: &str, user: Option<&str>) -> Result<RagAnswer> {
        let mut run = PipelineRun::start(PIPELINE);
        tracing::info!(run_id = %run.run_id(), model = model, user = user, "RAG query started");

        let chains = self.chains.get(model).await?;
        let documents = self.retrieve(&mut run, query, None).await?;
        let context = run.run_pure(PipelineStage::BuildingContext, || build_rag_context(&documents));

        let draft = run
            .run(
                PipelineStage::GeneratingAnswer,
                chains.generate_rag_answer(query, &context),
            )
            .await?;

        let (brief_answer, long_answer, citations) =
            run.run_pure(PipelineStage::Reconciling, || {
                let brief = draft.brief.trim();
                let long = draft.response.trim();
                let remap = RankRemap::from_texts(&[brief, long], documents.len());
                (remap.apply(brief), remap.apply(long), remap.citations(&documents))
            });

        record_citations(PIPELINE, citations.len());
        run.finish();

        Ok(RagAnswer {
            brief_answer,
            long_answer,
            citations,
            trace_id: run.run_id(),
        })
    }

    /// Answer `query` about one record, continuing `history`
    pub async fn answer_paper(
        &self,
        query: &str,
        model: &str,
        control_number: i64,
        history: &[ChatMessage],
    ) -> Result<RagPaperAnswer> {
        let mut run = PipelineRun::start(PIPELINE);
        tracing::info!(
            run_id = %run.run_id(),
            model = model,
            control_number = control_number,
            history = history.len(),
            "RAG paper query started"
        );

        let chains = self.chains.get(model).await?;
        let documents = self.retrieve(&mut run, query, Some(control_number)).await?;
        let context = run.run_pure(PipelineStage::BuildingContext, || build_rag_context(&documents));

        let draft = run
            .run(
                PipelineStage::GeneratingAnswer,
                chains.generate_paper_answer(query, &context, history),
            )
            .await?;

        let long_answer = run.run_pure(PipelineStage::Reconciling, || {
            let long = draft.response.trim();
            RankRemap::from_texts(&[long], documents.len()).apply(long)
        });
        run.finish();

        Ok(RagPaperAnswer {
            long_answer,
            trace_id: run.run_id(),
        })
    }
}
