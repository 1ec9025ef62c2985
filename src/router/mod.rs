//! Routing and orchestration: who is the question about, which pipelines
//! does it need, in what order, and how many questions is it really?

pub mod dependency;
pub mod entity;
pub mod executor;
pub mod intent;
pub mod planner;

pub use dependency::{detect_dependency, DependencyVerdict};
pub use entity::{resolve_entity, ActiveEntityContext, ResolvedEntity};
pub use executor::HybridExecutor;
pub use intent::{Intent, IntentClassifier, IntentSet};
pub use planner::split_multi_part_question;
