// src/memory/engine.rs

//! The memory engine: owns the vector store and the embedding provider, and
//! enforces the write/read invariants (all-or-nothing persistence, empty
//! results instead of errors for empty queries and empty stores).

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ConvoError, Result};
use crate::llm::EmbeddingProvider;
use crate::memory::traits::VectorStore;
use crate::memory::types::{ConversationTurn, EmbeddingRecord, RecalledTurn, SentimentLabel};

pub struct MemoryEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    /// When set, recall failures degrade to an empty result instead of
    /// surfacing. Off by default.
    degrade_recall_to_empty: bool,
}

impl MemoryEngine {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            degrade_recall_to_empty: false,
        }
    }

    pub fn with_degraded_recall(mut self, degrade: bool) -> Self {
        self.degrade_recall_to_empty = degrade;
        self
    }

    /// Persists one conversation turn together with the embedding of its
    /// combined user+agent text.
    ///
    /// All-or-nothing: the embedding is computed first (failure leaves the
    /// store untouched) and the record lands as a single insert, so no partial
    /// turn is ever visible to `recall` or `get_all`.
    pub async fn remember(
        &self,
        user_text: &str,
        agent_text: &str,
        sentiment: SentimentLabel,
        score: f32,
    ) -> Result<Uuid> {
        let turn = ConversationTurn::new(user_text, agent_text, sentiment, score);
        let embedding = self.embedder.embed(&turn.content()).await?;

        let id = turn.id;
        self.store.insert(&EmbeddingRecord { turn, embedding }).await?;

        debug!(turn_id = %id, sentiment = %sentiment, "persisted conversation turn");
        Ok(id)
    }

    /// Returns the `k` stored turns most similar to `query_text`, best first.
    ///
    /// `k == 0` short-circuits to an empty result without calling the
    /// embedding provider. An empty store yields an empty result. Ordering is
    /// deterministic for identical input and store state.
    pub async fn recall(&self, query_text: &str, k: usize) -> Result<Vec<RecalledTurn>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        match self.recall_inner(query_text, k).await {
            Ok(hits) => Ok(hits),
            Err(e) if self.degrade_recall_to_empty => {
                warn!("recall degraded to empty result: {e}");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn recall_inner(&self, query_text: &str, k: usize) -> Result<Vec<RecalledTurn>> {
        let embedding = self
            .embedder
            .embed(query_text)
            .await
            .map_err(|e| ConvoError::Retrieval(e.to_string()))?;

        self.store
            .search(&embedding, k)
            .await
            .map_err(|e| ConvoError::Retrieval(e.to_string()))
    }

    /// Every persisted turn, in insertion (timestamp) order. Export/debug
    /// path; cost is unbounded in store size.
    pub async fn get_all(&self) -> Result<Vec<ConversationTurn>> {
        let records = self.store.get_all().await?;
        Ok(records.into_iter().map(|r| r.turn).collect())
    }
}
