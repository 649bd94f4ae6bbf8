//! Embedding-based retrieval for the RAG pipeline
//!
//! - `vector_store`: k-NN and exact control-number lookups over chunked
//!   full text
//! - `reranker`: relevance rescoring of retrieved chunks

mod reranker;
mod vector_store;

pub use reranker::{apply_rerank, HttpReranker, RerankResult, Reranker};
pub use vector_store::{OpenSearchVectorStore, VectorStore};

use serde::{Deserialize, Serialize};

/// A chunk of full text as stored in the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,

    /// Record the chunk was cut from; absent on malformed index entries
    pub control_number: Option<i64>,
}

/// A chunk after reranking, position in the list is its rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    pub text: String,
    pub control_number: Option<i64>,
    pub relevance_score: f32,
}
