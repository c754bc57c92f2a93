//! The knowledge graph module facade.
//!
//! This is the surface collaborators call: the CLI, orchestration layers, and
//! tool wrappers that feed before/after snapshots into
//! `record_code_transformation`. Migration tracking is best-effort
//! instrumentation, so no error crosses this boundary: every operation
//! degrades to `None`, an empty collection, or zeroed statistics and logs the
//! cause instead.

use serde::Serialize;
use tracing::{error, warn};

use crate::models::{
    DecisionRecord, FileMigrationStatus, FileNode, MigrationStatistics, TransformationRecord,
};
use crate::query;
use crate::record;
use crate::schema::SchemaManager;
use crate::session::GraphSession;
use stackshift_core::GraphConfig;

pub const MODULE_NAME: &str = "knowledge_graph";
pub const MODULE_DESCRIPTION: &str =
    "Neo4j knowledge graph tracking the Bash-to-Python migration";

/// Status snapshot reported by [`KnowledgeGraphModule::status`].
#[derive(Debug, Clone, Serialize)]
pub struct ModuleStatus {
    pub name: &'static str,
    pub description: &'static str,
    pub connection_status: &'static str,
    pub migration_stats: MigrationStatistics,
}

pub struct KnowledgeGraphModule {
    session: GraphSession,
}

impl KnowledgeGraphModule {
    /// Construct the module in the unconnected state.
    pub fn new(config: GraphConfig) -> Self {
        Self {
            session: GraphSession::new(config),
        }
    }

    pub fn session(&self) -> &GraphSession {
        &self.session
    }

    /// Connect, apply the schema, and import any snapshot files configured
    /// and present on disk. Snapshot import failures are warnings; a module
    /// that cannot connect at all reports `false`.
    pub async fn start(&self) -> bool {
        if let Err(err) = self.session.connect().await {
            error!("Failed to start knowledge graph module: {err}");
            return false;
        }

        let schema = SchemaManager::new(&self.session);
        if !schema.create_schema().await {
            return false;
        }

        if let Some(path) = &self.session.config().schema_file {
            if path.is_file() && !schema.import_schema(path).await {
                warn!("Schema snapshot import failed: {}", path.display());
            }
        }
        if let Some(path) = &self.session.config().graph_file {
            if path.is_file() && !schema.import_graph(path).await {
                warn!("Graph snapshot import failed: {}", path.display());
            }
        }

        true
    }

    /// Close the session. Idempotent.
    pub async fn stop(&self) {
        self.session.close().await;
    }

    pub async fn status(&self) -> ModuleStatus {
        let connected = self.session.ensure_connected().await;
        ModuleStatus {
            name: MODULE_NAME,
            description: MODULE_DESCRIPTION,
            connection_status: if connected { "connected" } else { "disconnected" },
            migration_stats: self.get_migration_statistics().await,
        }
    }

    async fn ready(&self, operation: &str) -> bool {
        if self.session.ensure_connected().await {
            true
        } else {
            error!("No connection to the graph store; {operation} skipped");
            false
        }
    }

    pub async fn record_bash_file(&self, path: &str, content: &str) -> Option<FileNode> {
        if !self.ready("record_bash_file").await {
            return None;
        }
        match record::record_bash_file(&self.session, path, content).await {
            Ok(node) => Some(node),
            Err(err) => {
                error!("Failed to record bash file {path}: {err}");
                None
            }
        }
    }

    pub async fn record_python_file(
        &self,
        path: &str,
        content: &str,
        bash_file_path: Option<&str>,
    ) -> Option<FileNode> {
        if !self.ready("record_python_file").await {
            return None;
        }
        match record::record_python_file(&self.session, path, content, bash_file_path).await {
            Ok(node) => Some(node),
            Err(err) => {
                error!("Failed to record python file {path}: {err}");
                None
            }
        }
    }

    pub async fn record_migration_decision(
        &self,
        decision: &str,
        rationale: &str,
        bash_file_path: Option<&str>,
        python_file_path: Option<&str>,
        alternatives: &[String],
        impact: Option<&str>,
    ) -> Option<DecisionRecord> {
        if !self.ready("record_migration_decision").await {
            return None;
        }
        match record::record_migration_decision(
            &self.session,
            decision,
            rationale,
            bash_file_path,
            python_file_path,
            alternatives,
            impact,
        )
        .await
        {
            Ok(record) => Some(record),
            Err(err) => {
                error!("Failed to record migration decision: {err}");
                None
            }
        }
    }

    pub async fn record_code_transformation(
        &self,
        transformation_type: &str,
        before: &str,
        after: &str,
        bash_file_path: Option<&str>,
        python_file_path: Option<&str>,
        decision_id: Option<&str>,
    ) -> Option<TransformationRecord> {
        if !self.ready("record_code_transformation").await {
            return None;
        }
        match record::record_code_transformation(
            &self.session,
            transformation_type,
            before,
            after,
            bash_file_path,
            python_file_path,
            decision_id,
        )
        .await
        {
            Ok(record) => Some(record),
            Err(err) => {
                error!("Failed to record code transformation: {err}");
                None
            }
        }
    }

    pub async fn get_migration_decisions(
        &self,
        bash_file_path: Option<&str>,
        python_file_path: Option<&str>,
    ) -> Vec<DecisionRecord> {
        if !self.ready("get_migration_decisions").await {
            return Vec::new();
        }
        match query::get_migration_decisions(&self.session, bash_file_path, python_file_path).await
        {
            Ok(decisions) => decisions,
            Err(err) => {
                error!("Failed to fetch migration decisions: {err}");
                Vec::new()
            }
        }
    }

    pub async fn get_code_transformations(
        &self,
        bash_file_path: Option<&str>,
        python_file_path: Option<&str>,
        transformation_type: Option<&str>,
    ) -> Vec<TransformationRecord> {
        if !self.ready("get_code_transformations").await {
            return Vec::new();
        }
        match query::get_code_transformations(
            &self.session,
            bash_file_path,
            python_file_path,
            transformation_type,
        )
        .await
        {
            Ok(transformations) => transformations,
            Err(err) => {
                error!("Failed to fetch code transformations: {err}");
                Vec::new()
            }
        }
    }

    pub async fn get_file_migration_status(&self, bash_file_path: &str) -> FileMigrationStatus {
        if !self.ready("get_file_migration_status").await {
            return FileMigrationStatus::unknown(bash_file_path);
        }
        match query::get_file_migration_status(&self.session, bash_file_path).await {
            Ok(status) => status,
            Err(err) => {
                error!("Failed to fetch migration status for {bash_file_path}: {err}");
                FileMigrationStatus::unknown(bash_file_path)
            }
        }
    }

    pub async fn get_migration_statistics(&self) -> MigrationStatistics {
        if !self.ready("get_migration_statistics").await {
            return MigrationStatistics::default();
        }
        match query::get_migration_statistics(&self.session).await {
            Ok(stats) => stats,
            Err(err) => {
                error!("Failed to fetch migration statistics: {err}");
                MigrationStatistics::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_module() -> KnowledgeGraphModule {
        KnowledgeGraphModule::new(GraphConfig {
            uri: "bolt://127.0.0.1:9".to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_record_operations_degrade_without_connection() {
        let module = offline_module();

        assert!(module.record_bash_file("lib/a.sh", "#!/bin/bash").await.is_none());
        assert!(module
            .record_python_file("llm_stack/a.py", "import os", Some("lib/a.sh"))
            .await
            .is_none());
        assert!(module
            .record_migration_decision("decision", "rationale", None, None, &[], None)
            .await
            .is_none());
        assert!(module
            .record_code_transformation("syntax_change", "a", "b", None, None, None)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_query_operations_degrade_without_connection() {
        let module = offline_module();

        assert!(module.get_migration_decisions(None, None).await.is_empty());
        assert!(module
            .get_code_transformations(None, None, None)
            .await
            .is_empty());

        let status = module.get_file_migration_status("lib/a.sh").await;
        assert_eq!(status.source_path, "lib/a.sh");
        assert!(!status.migrated);

        let stats = module.get_migration_statistics().await;
        assert_eq!(stats.total_source_files, 0);
        assert_eq!(stats.migration_progress, 0.0);
    }

    #[tokio::test]
    async fn test_status_reports_disconnected() {
        let module = offline_module();
        let status = module.status().await;
        assert_eq!(status.name, MODULE_NAME);
        assert_eq!(status.connection_status, "disconnected");
        assert_eq!(status.migration_stats.total_decisions, 0);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let module = offline_module();
        module.stop().await;
        module.stop().await;
        assert!(!module.session().is_connected().await);
    }
}
