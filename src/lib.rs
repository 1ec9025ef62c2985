//! HR compliance assistant core.
//!
//! Routes a question to the policy-document pipeline, the employee-data
//! pipeline, or both, reconciles their outputs, and keeps conversational
//! state per session. Entry points, ingestion, and the inference engines
//! live outside this crate behind the traits in [`llm`].

pub mod assistant;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod query;
pub mod rag;
pub mod router;
pub mod session;

pub use assistant::{Collaborators, ComplianceAssistant};
pub use config::AssistantConfig;
pub use error::{AssistantError, Result};
pub use query::{PolicyConstraint, QueryPipeline, Role, TabularStore, UserContext};
pub use rag::{RagAnswer, RagPipeline};
pub use router::{DependencyVerdict, HybridExecutor, Intent, IntentClassifier, IntentSet};
pub use session::SessionContext;

/// Initialize tracing with the environment filter; host binaries call this
/// once at startup.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}
