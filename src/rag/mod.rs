//! Policy document question answering over an embedded vector index.

pub mod hallucination;
pub mod index;
pub mod pipeline;
pub mod prompts;
pub mod rerank;
pub mod retrieval;
pub mod types;

pub use pipeline::RagPipeline;
pub use types::{RagAnswer, RagState};
