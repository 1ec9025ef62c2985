//! In-memory vector index with positional chunk storage.
//!
//! The index holds embeddings plus parallel arrays of chunk text and
//! metadata, keyed positionally. Search is linear L2; the corpus here is a
//! few thousand policy chunks, well inside linear-scan territory.
//! Text and metadata persist as JSON; embeddings are recomputed on ingest.

use crate::error::{AssistantError, Result};
use crate::rag::types::ChunkMetadata;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Squared-L2 distance between two vectors.
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedStore {
    texts: Vec<String>,
    metadata: Vec<ChunkMetadata>,
    dimension: usize,
}

/// Document store: embeddings + parallel text/metadata arrays.
pub struct DocumentStore {
    embeddings: Vec<Vec<f32>>,
    texts: Vec<String>,
    metadata: Vec<ChunkMetadata>,
    dimension: usize,
}

impl DocumentStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            embeddings: Vec::new(),
            texts: Vec::new(),
            metadata: Vec::new(),
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Add one already-embedded chunk. Ingestion (loading, chunking,
    /// embedding) is an external batch collaborator.
    pub fn add(&mut self, embedding: Vec<f32>, text: String, metadata: ChunkMetadata) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(AssistantError::Execution(format!(
                "embedding dimension {} does not match store dimension {}",
                embedding.len(),
                self.dimension
            )));
        }
        self.embeddings.push(embedding);
        self.texts.push(text);
        self.metadata.push(metadata);
        Ok(())
    }

    pub fn add_chunks(
        &mut self,
        chunks: Vec<(Vec<f32>, String, ChunkMetadata)>,
    ) -> Result<()> {
        for (embedding, text, metadata) in chunks {
            self.add(embedding, text, metadata)?;
        }
        Ok(())
    }

    /// Nearest-neighbour search; returns positional ids with L2 distances,
    /// closest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if self.embeddings.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(AssistantError::Execution(format!(
                "query embedding dimension {} does not match store dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(idx, emb)| (idx, l2_distance(query, emb)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn text(&self, id: usize) -> Option<&str> {
        self.texts.get(id).map(|s| s.as_str())
    }

    pub fn metadata(&self, id: usize) -> Option<&ChunkMetadata> {
        self.metadata.get(id)
    }

    /// Persist texts and metadata. Embeddings are not serialized; callers
    /// re-embed on load.
    pub fn save(&self, path: &Path) -> Result<()> {
        let persisted = PersistedStore {
            texts: self.texts.clone(),
            metadata: self.metadata.clone(),
            dimension: self.dimension,
        };
        let encoded = serde_json::to_string_pretty(&persisted)?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Load texts and metadata; the returned store has no embeddings until
    /// the caller re-embeds each text.
    pub fn load_texts(path: &Path) -> Result<(Self, Vec<String>)> {
        let encoded = std::fs::read_to_string(path)?;
        let persisted: PersistedStore = serde_json::from_str(&encoded)?;
        let texts = persisted.texts.clone();
        Ok((
            Self {
                embeddings: Vec::new(),
                texts: persisted.texts,
                metadata: persisted.metadata,
                dimension: persisted.dimension,
            },
            texts,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str, page: u32) -> ChunkMetadata {
        ChunkMetadata {
            source: source.to_string(),
            page,
        }
    }

    #[test]
    fn search_returns_closest_first() {
        let mut store = DocumentStore::new(3);
        store
            .add(vec![1.0, 0.0, 0.0], "a".to_string(), meta("p.pdf", 1))
            .unwrap();
        store
            .add(vec![0.0, 1.0, 0.0], "b".to_string(), meta("p.pdf", 2))
            .unwrap();

        let results = store.search(&[0.9, 0.1, 0.0], 2).unwrap();
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 < results[1].1);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut store = DocumentStore::new(3);
        assert!(store
            .add(vec![1.0, 0.0], "a".to_string(), meta("p.pdf", 1))
            .is_err());
        store
            .add(vec![1.0, 0.0, 0.0], "a".to_string(), meta("p.pdf", 1))
            .unwrap();
        assert!(store.search(&[1.0], 1).is_err());
    }

    #[test]
    fn empty_store_returns_no_results() {
        let store = DocumentStore::new(3);
        assert!(store.search(&[0.0, 0.0, 0.0], 5).unwrap().is_empty());
    }
}
