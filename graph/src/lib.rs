//! StackShift Knowledge Graph Module
//!
//! The graph module tracks the Bash-to-Python migration in a Neo4j knowledge
//! graph: session management over Bolt, schema constraints and snapshot
//! import, idempotent recording of files/decisions/transformations, and the
//! query layer that derives per-file status and project-wide statistics.

pub mod error;
pub mod models;
pub mod module;
pub mod query;
pub mod record;
pub mod schema;
pub mod session;

pub use error::GraphError;
pub use models::{
    DecisionRecord, FileLanguage, FileMigrationStatus, FileNode, MigrationStatistics,
    TransformationRecord,
};
pub use module::{KnowledgeGraphModule, ModuleStatus};
pub use schema::{NodeLabel, RelKind, SchemaManager};
pub use session::GraphSession;
