//! Employee-data question answering: NL to SQL translation, repair,
//! row-level access control, execution, and deterministic narration.

pub mod access;
pub mod constraint;
pub mod generator;
pub mod narrate;
pub mod pipeline;
pub mod repair;
pub mod schema;
pub mod validate;

pub use access::{Role, UserContext};
pub use constraint::{ConstraintOp, PolicyConstraint};
pub use pipeline::QueryPipeline;
pub use schema::{SchemaRegistry, TabularStore};
