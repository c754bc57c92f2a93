//! The write path: idempotent recording of files, decisions, and
//! transformations.
//!
//! Every operation borrows the session for the duration of the call. File
//! upserts are keyed on path and never duplicate nodes; decisions and
//! transformations are events with fresh generated identities. Timestamps are
//! assigned here, at write time, never taken from the caller.
//!
//! The combined operations issue their node and edge statements as separate
//! implicit transactions; there is no wrapping multi-statement transaction,
//! so a mid-sequence failure can leave an orphan node behind.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::GraphError;
use crate::models::{
    encode_alternatives, parse_timestamp, DecisionRecord, FileLanguage, FileNode,
    TransformationRecord,
};
use crate::session::GraphSession;

pub(crate) fn new_decision_id() -> String {
    format!("decision:{}", Uuid::new_v4())
}

pub(crate) fn new_transformation_id() -> String {
    format!("transformation:{}", Uuid::new_v4())
}

/// Upsert a file node with content. Re-recording the same path updates the
/// content and `last_seen`, never inserting a second node.
async fn upsert_file(
    session: &GraphSession,
    path: &str,
    language: FileLanguage,
    content: &str,
) -> Result<FileNode, GraphError> {
    let now = Utc::now();
    let query = neo4rs::query(
        "MERGE (f:File {path: $path}) \
         ON CREATE SET f.created_at = $now \
         SET f.language = $language, f.content = $content, f.last_seen = $now \
         RETURN f.created_at AS created_at",
    )
    .param("path", path)
    .param("language", language.as_str())
    .param("content", content)
    .param("now", now.to_rfc3339().as_str());

    let rows = session.run(query).await?;
    let row = rows.first().ok_or_else(|| {
        GraphError::query(format!("file upsert for {path} returned no row"))
    })?;

    Ok(FileNode {
        path: path.to_string(),
        language,
        content: Some(content.to_string()),
        created_at: parse_timestamp(row.get::<String>("created_at").ok()),
        last_seen: now,
    })
}

/// Merge a file node by path without touching existing content. Used for
/// paths that are referenced before they are recorded.
async fn upsert_file_stub(
    session: &GraphSession,
    path: &str,
    language: FileLanguage,
) -> Result<(), GraphError> {
    let now = Utc::now().to_rfc3339();
    let query = neo4rs::query(
        "MERGE (f:File {path: $path}) \
         ON CREATE SET f.language = $language, f.created_at = $now, f.last_seen = $now",
    )
    .param("path", path)
    .param("language", language.as_str())
    .param("now", now.as_str());
    session.run(query).await?;
    Ok(())
}

/// Record a Bash source file.
pub async fn record_bash_file(
    session: &GraphSession,
    path: &str,
    content: &str,
) -> Result<FileNode, GraphError> {
    let node = upsert_file(session, path, FileLanguage::Source, content).await?;
    info!("Recorded bash file {path}");
    Ok(node)
}

/// Record a Python target file. When a source path is supplied, the source
/// node is merged as a stub (its content, if any, is left alone) and the
/// `MIGRATED_TO` edge is maintained: a stale edge to a different target is
/// replaced, so each source file keeps at most one outgoing migration edge.
pub async fn record_python_file(
    session: &GraphSession,
    path: &str,
    content: &str,
    bash_file_path: Option<&str>,
) -> Result<FileNode, GraphError> {
    let node = upsert_file(session, path, FileLanguage::Target, content).await?;

    if let Some(source) = bash_file_path {
        upsert_file_stub(session, source, FileLanguage::Source).await?;

        let query = neo4rs::query(
            "MATCH (s:File {path: $source}), (t:File {path: $target}) \
             OPTIONAL MATCH (s)-[stale:MIGRATED_TO]->(old:File) \
             WHERE old.path <> $target \
             DELETE stale \
             MERGE (s)-[:MIGRATED_TO]->(t)",
        )
        .param("source", source)
        .param("target", path);
        session.run(query).await?;
        debug!("Linked {source} MIGRATED_TO {path}");
    }

    info!("Recorded python file {path}");
    Ok(node)
}

/// Link an already-created entity node to a file, merging the file as a stub
/// first so the edge always has an endpoint.
async fn link_to_file(
    session: &GraphSession,
    entity_label: &str,
    entity_id: &str,
    rel: &str,
    path: &str,
    language: FileLanguage,
) -> Result<(), GraphError> {
    upsert_file_stub(session, path, language).await?;
    let statement = format!(
        "MATCH (n:{entity_label} {{id: $id}}), (f:File {{path: $path}}) \
         MERGE (n)-[:{rel}]->(f)"
    );
    let query = neo4rs::query(&statement)
        .param("id", entity_id)
        .param("path", path);
    session.run(query).await?;
    Ok(())
}

/// Record a migration decision. Decisions are events: identical arguments
/// recorded twice produce two nodes with distinct generated ids.
pub async fn record_migration_decision(
    session: &GraphSession,
    decision: &str,
    rationale: &str,
    bash_file_path: Option<&str>,
    python_file_path: Option<&str>,
    alternatives: &[String],
    impact: Option<&str>,
) -> Result<DecisionRecord, GraphError> {
    let id = new_decision_id();
    let now = Utc::now();
    let encoded_alternatives = encode_alternatives(alternatives);

    let query = neo4rs::query(
        "CREATE (d:Decision {id: $id, decision: $decision, rationale: $rationale, \
         alternatives: $alternatives, impact: $impact, created_at: $now}) \
         RETURN d.id AS id",
    )
    .param("id", id.as_str())
    .param("decision", decision)
    .param("rationale", rationale)
    .param("alternatives", encoded_alternatives.as_str())
    .param("impact", impact.unwrap_or_default())
    .param("now", now.to_rfc3339().as_str());

    let rows = session.run(query).await?;
    if rows.is_empty() {
        return Err(GraphError::query("decision create returned no row"));
    }

    if let Some(path) = bash_file_path {
        link_to_file(session, "Decision", &id, "CONCERNS", path, FileLanguage::Source).await?;
    }
    if let Some(path) = python_file_path {
        link_to_file(session, "Decision", &id, "CONCERNS", path, FileLanguage::Target).await?;
    }

    info!("Recorded migration decision {id}");
    Ok(DecisionRecord {
        id,
        decision: decision.to_string(),
        rationale: rationale.to_string(),
        alternatives: alternatives.to_vec(),
        impact: impact.map(str::to_string),
        created_at: now,
    })
}

/// Record a code transformation with `AFFECTS` edges to the supplied file
/// paths and, when a decision id is given, a `MOTIVATES` edge from that
/// decision. A decision id that matches nothing simply produces no edge; the
/// transformation itself is still persisted.
pub async fn record_code_transformation(
    session: &GraphSession,
    transformation_type: &str,
    before: &str,
    after: &str,
    bash_file_path: Option<&str>,
    python_file_path: Option<&str>,
    decision_id: Option<&str>,
) -> Result<TransformationRecord, GraphError> {
    let id = new_transformation_id();
    let now = Utc::now();

    let query = neo4rs::query(
        "CREATE (t:Transformation {id: $id, transformation_type: $transformation_type, \
         before: $before, after: $after, created_at: $now}) \
         RETURN t.id AS id",
    )
    .param("id", id.as_str())
    .param("transformation_type", transformation_type)
    .param("before", before)
    .param("after", after)
    .param("now", now.to_rfc3339().as_str());

    let rows = session.run(query).await?;
    if rows.is_empty() {
        return Err(GraphError::query("transformation create returned no row"));
    }

    if let Some(path) = bash_file_path {
        link_to_file(
            session,
            "Transformation",
            &id,
            "AFFECTS",
            path,
            FileLanguage::Source,
        )
        .await?;
    }
    if let Some(path) = python_file_path {
        link_to_file(
            session,
            "Transformation",
            &id,
            "AFFECTS",
            path,
            FileLanguage::Target,
        )
        .await?;
    }

    let mut linked_decision = None;
    if let Some(decision) = decision_id {
        // MATCH on both endpoints: an absent decision matches zero rows and
        // the MERGE never runs, leaving the transformation without a
        // MOTIVATES edge rather than failing.
        let query = neo4rs::query(
            "MATCH (d:Decision {id: $decision_id}), (t:Transformation {id: $id}) \
             MERGE (d)-[:MOTIVATES]->(t) \
             RETURN d.id AS id",
        )
        .param("decision_id", decision)
        .param("id", id.as_str());
        let rows = session.run(query).await?;
        if rows.is_empty() {
            debug!("Decision {decision} not found; transformation {id} recorded without MOTIVATES edge");
        } else {
            linked_decision = Some(decision.to_string());
        }
    }

    info!("Recorded code transformation {id}");
    Ok(TransformationRecord {
        id,
        transformation_type: transformation_type.to_string(),
        before: before.to_string(),
        after: after.to_string(),
        decision_id: linked_decision,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_prefixed_and_unique() {
        let a = new_decision_id();
        let b = new_decision_id();
        assert!(a.starts_with("decision:"));
        assert_ne!(a, b);

        let t = new_transformation_id();
        assert!(t.starts_with("transformation:"));
    }

    #[tokio::test]
    async fn test_record_without_session_reports_not_connected() {
        let session = GraphSession::new(Default::default());
        let result = record_bash_file(&session, "lib/core/logging.sh", "#!/bin/bash").await;
        assert!(matches!(result, Err(GraphError::NotConnected)));

        let result = record_migration_decision(
            &session,
            "Use pathlib",
            "portable path handling",
            None,
            None,
            &[],
            None,
        )
        .await;
        assert!(matches!(result, Err(GraphError::NotConnected)));
    }
}
