//! The read path: decisions, transformations, per-file status, and
//! graph-wide statistics.
//!
//! Filtered lookups assemble their Cypher dynamically; the builders are pure
//! functions over the filter arguments so the generated statements can be
//! checked without a running store.

use neo4rs::Row;
use tracing::debug;

use crate::error::GraphError;
use crate::models::{
    decode_alternatives, parse_timestamp, progress_percent, DecisionRecord, FileMigrationStatus,
    MigrationStatistics, TransformationRecord,
};
use crate::session::GraphSession;

const DECISION_COLUMNS: &str = "d.id AS id, d.decision AS decision, d.rationale AS rationale, \
     d.alternatives AS alternatives, d.impact AS impact, d.created_at AS created_at";

const TRANSFORMATION_COLUMNS: &str = "t.id AS id, t.transformation_type AS transformation_type, \
     t.before AS before, t.after AS after, md.id AS decision_id, t.created_at AS created_at";

/// Build the decision lookup. Path filters use OR semantics: a decision
/// matches when any `CONCERNS` edge points at either supplied path.
pub(crate) fn decisions_statement(
    bash_file_path: Option<&str>,
    python_file_path: Option<&str>,
) -> (String, Vec<(&'static str, String)>) {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if let Some(path) = bash_file_path {
        conditions.push("f.path = $bash_path");
        params.push(("bash_path", path.to_string()));
    }
    if let Some(path) = python_file_path {
        conditions.push("f.path = $python_path");
        params.push(("python_path", path.to_string()));
    }

    let statement = if conditions.is_empty() {
        format!("MATCH (d:Decision) RETURN {DECISION_COLUMNS} ORDER BY created_at")
    } else {
        format!(
            "MATCH (d:Decision)-[:CONCERNS]->(f:File) WHERE {} \
             RETURN DISTINCT {DECISION_COLUMNS} ORDER BY created_at",
            conditions.join(" OR ")
        )
    };
    (statement, params)
}

/// Build the transformation lookup: OR semantics across the path filters,
/// exact match on the transformation type, linked decision id resolved via
/// an optional `MOTIVATES` match.
pub(crate) fn transformations_statement(
    bash_file_path: Option<&str>,
    python_file_path: Option<&str>,
    transformation_type: Option<&str>,
) -> (String, Vec<(&'static str, String)>) {
    let mut path_conditions = Vec::new();
    let mut params = Vec::new();

    if let Some(path) = bash_file_path {
        path_conditions.push("f.path = $bash_path");
        params.push(("bash_path", path.to_string()));
    }
    if let Some(path) = python_file_path {
        path_conditions.push("f.path = $python_path");
        params.push(("python_path", path.to_string()));
    }

    let mut statement = String::from("MATCH (t:Transformation)");
    let mut has_where = false;

    if !path_conditions.is_empty() {
        statement.push_str(&format!(
            " MATCH (t)-[:AFFECTS]->(f:File) WHERE ({})",
            path_conditions.join(" OR ")
        ));
        has_where = true;
    }

    if let Some(kind) = transformation_type {
        let keyword = if has_where { "AND" } else { "WHERE" };
        statement.push_str(&format!(" {keyword} t.transformation_type = $transformation_type"));
        params.push(("transformation_type", kind.to_string()));
    }

    statement.push_str(&format!(
        " OPTIONAL MATCH (md:Decision)-[:MOTIVATES]->(t) \
         RETURN DISTINCT {TRANSFORMATION_COLUMNS} ORDER BY created_at"
    ));
    (statement, params)
}

fn apply_params(statement: &str, params: &[(&'static str, String)]) -> neo4rs::Query {
    let mut query = neo4rs::query(statement);
    for (key, value) in params {
        query = query.param(key, value.as_str());
    }
    query
}

fn decision_from_row(row: &Row) -> Result<DecisionRecord, GraphError> {
    Ok(DecisionRecord {
        id: row.get::<String>("id").map_err(GraphError::query)?,
        decision: row.get::<String>("decision").map_err(GraphError::query)?,
        rationale: row.get::<String>("rationale").unwrap_or_default(),
        alternatives: row
            .get::<String>("alternatives")
            .map(|raw| decode_alternatives(&raw))
            .unwrap_or_default(),
        impact: row.get::<String>("impact").ok().filter(|s| !s.is_empty()),
        created_at: parse_timestamp(row.get::<String>("created_at").ok()),
    })
}

fn transformation_from_row(row: &Row) -> Result<TransformationRecord, GraphError> {
    Ok(TransformationRecord {
        id: row.get::<String>("id").map_err(GraphError::query)?,
        transformation_type: row
            .get::<String>("transformation_type")
            .map_err(GraphError::query)?,
        before: row.get::<String>("before").unwrap_or_default(),
        after: row.get::<String>("after").unwrap_or_default(),
        decision_id: row.get::<String>("decision_id").ok(),
        created_at: parse_timestamp(row.get::<String>("created_at").ok()),
    })
}

/// Fetch decisions, optionally filtered by the file paths they concern.
pub async fn get_migration_decisions(
    session: &GraphSession,
    bash_file_path: Option<&str>,
    python_file_path: Option<&str>,
) -> Result<Vec<DecisionRecord>, GraphError> {
    let (statement, params) = decisions_statement(bash_file_path, python_file_path);
    let rows = session.run(apply_params(&statement, &params)).await?;

    let mut decisions = Vec::with_capacity(rows.len());
    for row in &rows {
        decisions.push(decision_from_row(row)?);
    }
    debug!("Fetched {} decision(s)", decisions.len());
    Ok(decisions)
}

/// Fetch transformations, optionally filtered by affected file paths and
/// exact transformation type.
pub async fn get_code_transformations(
    session: &GraphSession,
    bash_file_path: Option<&str>,
    python_file_path: Option<&str>,
    transformation_type: Option<&str>,
) -> Result<Vec<TransformationRecord>, GraphError> {
    let (statement, params) =
        transformations_statement(bash_file_path, python_file_path, transformation_type);
    let rows = session.run(apply_params(&statement, &params)).await?;

    let mut transformations = Vec::with_capacity(rows.len());
    for row in &rows {
        transformations.push(transformation_from_row(row)?);
    }
    debug!("Fetched {} transformation(s)", transformations.len());
    Ok(transformations)
}

/// Resolve the migration status of one source file: its target (if a
/// `MIGRATED_TO` edge exists) plus all decisions and transformations linked
/// to either side.
pub async fn get_file_migration_status(
    session: &GraphSession,
    bash_file_path: &str,
) -> Result<FileMigrationStatus, GraphError> {
    let exists = session
        .run(
            neo4rs::query("MATCH (f:File {path: $path}) RETURN f.path AS path")
                .param("path", bash_file_path),
        )
        .await?;
    if exists.is_empty() {
        return Ok(FileMigrationStatus::unknown(bash_file_path));
    }

    let target_rows = session
        .run(
            neo4rs::query(
                "MATCH (s:File {path: $path})-[:MIGRATED_TO]->(t:File) RETURN t.path AS path",
            )
            .param("path", bash_file_path),
        )
        .await?;
    let target_path = target_rows
        .first()
        .and_then(|row| row.get::<String>("path").ok());

    let decisions =
        get_migration_decisions(session, Some(bash_file_path), target_path.as_deref()).await?;
    let transformations = get_code_transformations(
        session,
        Some(bash_file_path),
        target_path.as_deref(),
        None,
    )
    .await?;

    Ok(FileMigrationStatus {
        source_path: bash_file_path.to_string(),
        migrated: target_path.is_some(),
        target_path,
        decisions,
        transformations,
    })
}

async fn count(session: &GraphSession, statement: &str) -> Result<u64, GraphError> {
    let rows = session.run_statement(statement).await?;
    let count = rows
        .first()
        .map(|row| row.get::<i64>("count").unwrap_or(0))
        .unwrap_or(0);
    Ok(count.max(0) as u64)
}

/// Aggregate graph-wide migration statistics.
pub async fn get_migration_statistics(
    session: &GraphSession,
) -> Result<MigrationStatistics, GraphError> {
    let total_source_files = count(
        session,
        "MATCH (f:File) WHERE f.language = 'source' RETURN count(f) AS count",
    )
    .await?;
    let total_target_files = count(
        session,
        "MATCH (f:File) WHERE f.language = 'target' RETURN count(f) AS count",
    )
    .await?;
    let migrated_files = count(
        session,
        "MATCH (s:File)-[:MIGRATED_TO]->(:File) WHERE s.language = 'source' \
         RETURN count(DISTINCT s) AS count",
    )
    .await?;
    let total_decisions = count(session, "MATCH (d:Decision) RETURN count(d) AS count").await?;
    let total_transformations =
        count(session, "MATCH (t:Transformation) RETURN count(t) AS count").await?;

    Ok(MigrationStatistics {
        total_source_files,
        total_target_files,
        migrated_files,
        migration_progress: progress_percent(migrated_files, total_source_files),
        total_decisions,
        total_transformations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decisions_statement_unfiltered() {
        let (statement, params) = decisions_statement(None, None);
        assert!(statement.starts_with("MATCH (d:Decision) RETURN"));
        assert!(!statement.contains("WHERE"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_decisions_statement_single_filter() {
        let (statement, params) = decisions_statement(Some("lib/core/secrets.sh"), None);
        assert!(statement.contains("[:CONCERNS]"));
        assert!(statement.contains("f.path = $bash_path"));
        assert!(!statement.contains("$python_path"));
        assert_eq!(params, vec![("bash_path", "lib/core/secrets.sh".to_string())]);
    }

    #[test]
    fn test_decisions_statement_both_filters_use_or() {
        let (statement, params) =
            decisions_statement(Some("lib/a.sh"), Some("llm_stack/a.py"));
        assert!(statement.contains("f.path = $bash_path OR f.path = $python_path"));
        assert!(statement.contains("DISTINCT"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_transformations_statement_unfiltered() {
        let (statement, params) = transformations_statement(None, None, None);
        assert!(statement.starts_with("MATCH (t:Transformation) OPTIONAL MATCH"));
        assert!(statement.contains("[:MOTIVATES]"));
        assert!(statement.contains("md.id AS decision_id"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_transformations_statement_type_only() {
        let (statement, params) = transformations_statement(None, None, Some("syntax_change"));
        assert!(statement.contains("WHERE t.transformation_type = $transformation_type"));
        assert!(!statement.contains("AFFECTS"));
        assert_eq!(
            params,
            vec![("transformation_type", "syntax_change".to_string())]
        );
    }

    #[test]
    fn test_transformations_statement_paths_and_type() {
        let (statement, params) = transformations_statement(
            Some("lib/a.sh"),
            Some("llm_stack/a.py"),
            Some("function_migration"),
        );
        assert!(statement.contains("[:AFFECTS]"));
        assert!(statement.contains("(f.path = $bash_path OR f.path = $python_path)"));
        assert!(statement.contains("AND t.transformation_type = $transformation_type"));
        assert_eq!(params.len(), 3);
    }

    #[tokio::test]
    async fn test_queries_without_session_report_not_connected() {
        let session = GraphSession::new(Default::default());
        assert!(matches!(
            get_migration_decisions(&session, None, None).await,
            Err(GraphError::NotConnected)
        ));
        assert!(matches!(
            get_migration_statistics(&session).await,
            Err(GraphError::NotConnected)
        ));
    }
}
