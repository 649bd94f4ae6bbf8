//! Per-model chains and their registry

use super::prompts::{render_history, Prompts};
use super::{generate, AnswerDraft, ChatMessage, ExpandedQuery, LanguageModel, PaperAnswerDraft};
use crate::errors::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Builds the language model handle for a model identifier
pub type LlmFactory = Arc<dyn Fn(&str) -> Result<Arc<dyn LanguageModel>> + Send + Sync>;

/// One model bound to every prompt variant the pipelines use
pub struct ModelChains {
    llm: Arc<dyn LanguageModel>,
    prompts: Prompts,
}

impl ModelChains {
    pub fn new(llm: Arc<dyn LanguageModel>, prompts: Prompts) -> Self {
        Self { llm, prompts }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Expand a user question into full-text search terms
    pub async fn expand_query(&self, query: &str) -> Result<ExpandedQuery> {
        let prompt = self.prompts.expand_query.render(&[("query", query)]);
        generate(self.llm.as_ref(), &prompt).await
    }

    /// Answer from abstract or highlight context
    pub async fn generate_answer(
        &self,
        query: &str,
        context: &str,
        playground: bool,
    ) -> Result<AnswerDraft> {
        let template = if playground {
            &self.prompts.generate_answer_playground
        } else {
            &self.prompts.generate_answer
        };
        let prompt = template.render(&[("query", query), ("context", context)]);
        generate(self.llm.as_ref(), &prompt).await
    }

    /// Answer from reranked document context
    pub async fn generate_rag_answer(&self, question: &str, context: &str) -> Result<AnswerDraft> {
        let prompt = self
            .prompts
            .rag_query
            .render(&[("question", question), ("context", context)]);
        generate(self.llm.as_ref(), &prompt).await
    }

    /// Answer about a single paper, continuing a conversation
    pub async fn generate_paper_answer(
        &self,
        question: &str,
        context: &str,
        history: &[ChatMessage],
    ) -> Result<PaperAnswerDraft> {
        let history = render_history(history);
        let prompt = self.prompts.rag_paper_query.render(&[
            ("question", question),
            ("context", context),
            ("history", &history),
        ]);
        generate(self.llm.as_ref(), &prompt).await
    }
}

/// Lazily built chains, at most one set per model identifier
pub struct ChainRegistry {
    factory: LlmFactory,
    prompts: Prompts,
    chains: RwLock<HashMap<String, Arc<ModelChains>>>,
}

impl ChainRegistry {
    pub fn new(factory: LlmFactory) -> Self {
        Self::with_prompts(factory, Prompts::default())
    }

    pub fn with_prompts(factory: LlmFactory, prompts: Prompts) -> Self {
        Self {
            factory,
            prompts,
            chains: RwLock::new(HashMap::new()),
        }
    }

    /// Chains for `model`, constructing them on first use
    pub async fn get(&self, model: &str) -> Result<Arc<ModelChains>> {
        if let Some(chains) = self.chains.read().await.get(model) {
            return Ok(chains.clone());
        }

        let mut chains = self.chains.write().await;
        // Another request may have built it while we waited for the lock
        if let Some(existing) = chains.get(model) {
            return Ok(existing.clone());
        }

        let llm = (self.factory)(model)?;
        let built = Arc::new(ModelChains::new(llm, self.prompts.clone()));
        chains.insert(model.to_string(), built.clone());

        tracing::info!(model = model, "Initialized model chains");
        Ok(built)
    }

    /// Number of models with constructed chains
    pub async fn len(&self) -> usize {
        self.chains.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chains.read().await.is_empty()
    }
}
