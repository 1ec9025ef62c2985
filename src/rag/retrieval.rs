//! Retrieval stage: embed the question, fetch nearest chunks, keep only
//! those under the distance threshold.

use crate::error::Result;
use crate::llm::Embedder;
use crate::rag::index::DocumentStore;
use crate::rag::types::Chunk;
use std::sync::{Arc, RwLock};
use tracing::info;

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<RwLock<DocumentStore>>,
    top_k: usize,
    similarity_threshold: f32,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<RwLock<DocumentStore>>,
        top_k: usize,
        similarity_threshold: f32,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k,
            similarity_threshold,
        }
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<Chunk>> {
        let query = self.embedder.embed(question).await?;

        let store = self
            .store
            .read()
            .map_err(|_| crate::error::AssistantError::Execution("document store lock poisoned".to_string()))?;
        let hits = store.search(&query, self.top_k)?;

        let mut chunks = Vec::new();
        for (id, distance) in hits {
            if distance >= self.similarity_threshold {
                continue;
            }
            let (Some(text), Some(metadata)) = (store.text(id), store.metadata(id)) else {
                continue;
            };
            chunks.push(Chunk {
                text: text.to_string(),
                metadata: metadata.clone(),
                distance,
                score: 0.0,
            });
        }
        info!("Retrieved {} chunks", chunks.len());
        Ok(chunks)
    }
}
