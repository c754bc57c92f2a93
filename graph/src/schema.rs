//! Schema management for the migration knowledge graph.
//!
//! Declares the node labels and relationship kinds the tracker uses, applies
//! the uniqueness constraints and indexes idempotently at startup, and
//! bulk-loads previously exported JSON-LD snapshots.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::GraphError;
use crate::session::GraphSession;

/// Node labels for the three entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLabel {
    File,
    Decision,
    Transformation,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::File => "File",
            NodeLabel::Decision => "Decision",
            NodeLabel::Transformation => "Transformation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "File" => Some(NodeLabel::File),
            "Decision" => Some(NodeLabel::Decision),
            "Transformation" => Some(NodeLabel::Transformation),
            _ => None,
        }
    }
}

/// Relationship kinds between entities. Closed set; snapshots carrying other
/// edge types are skipped with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelKind {
    /// File(source) → File(target)
    MigratedTo,
    /// Transformation → File
    Affects,
    /// Decision → Transformation
    Motivates,
    /// Decision → File
    Concerns,
}

impl RelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelKind::MigratedTo => "MIGRATED_TO",
            RelKind::Affects => "AFFECTS",
            RelKind::Motivates => "MOTIVATES",
            RelKind::Concerns => "CONCERNS",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MIGRATED_TO" => Some(RelKind::MigratedTo),
            "AFFECTS" => Some(RelKind::Affects),
            "MOTIVATES" => Some(RelKind::Motivates),
            "CONCERNS" => Some(RelKind::Concerns),
            _ => None,
        }
    }
}

const CONSTRAINTS: &[&str] = &[
    "CREATE CONSTRAINT file_path_unique IF NOT EXISTS FOR (f:File) REQUIRE f.path IS UNIQUE",
    "CREATE CONSTRAINT decision_id_unique IF NOT EXISTS FOR (d:Decision) REQUIRE d.id IS UNIQUE",
    "CREATE CONSTRAINT transformation_id_unique IF NOT EXISTS FOR (t:Transformation) REQUIRE t.id IS UNIQUE",
];

const INDEXES: &[&str] = &[
    "CREATE INDEX file_language_idx IF NOT EXISTS FOR (f:File) ON (f.language)",
    "CREATE INDEX transformation_type_idx IF NOT EXISTS FOR (t:Transformation) ON (t.transformation_type)",
];

/// A JSON-LD-style snapshot: a `@graph` list of typed nodes plus an explicit
/// `edges` list.
#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotDocument {
    #[serde(rename = "@graph", default)]
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotNode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(flatten)]
    pub properties: serde_json::Map<String, Value>,
}

impl SnapshotNode {
    fn string_property(&self, key: &str) -> Option<String> {
        match self.properties.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Array(items)) => serde_json::to_string(items).ok(),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Manager for the knowledge graph schema. Borrows the session per call.
pub struct SchemaManager<'a> {
    session: &'a GraphSession,
}

impl<'a> SchemaManager<'a> {
    pub fn new(session: &'a GraphSession) -> Self {
        Self { session }
    }

    /// Apply the uniqueness constraints and indexes. Idempotent: every
    /// statement is `IF NOT EXISTS`, so this is safe on every startup.
    /// Individual statement failures are logged and skipped.
    pub async fn create_schema(&self) -> bool {
        for statement in CONSTRAINTS.iter().chain(INDEXES) {
            match self.session.run_statement(statement).await {
                Ok(_) => {}
                Err(GraphError::NotConnected) => {
                    warn!("Cannot apply schema: no active session");
                    return false;
                }
                Err(err) => warn!("Schema statement failed ({statement}): {err}"),
            }
        }
        info!("Knowledge graph schema applied");
        true
    }

    /// Import a previously exported schema description. Type declarations are
    /// upserted as `SchemaType` meta nodes keyed on `@id`; edges in schema
    /// documents are ignored. Best-effort: bad entries are skipped with a
    /// warning.
    pub async fn import_schema(&self, path: &Path) -> bool {
        let document = match load_snapshot(path) {
            Some(document) => document,
            None => return false,
        };

        let mut imported = 0usize;
        for node in &document.nodes {
            let query = neo4rs::query(
                "MERGE (s:SchemaType {id: $id}) \
                 SET s.kind = $kind, s.name = $name, s.description = $description",
            )
            .param("id", node.id.as_str())
            .param("kind", node.kind.as_str())
            .param(
                "name",
                node.string_property("name").unwrap_or_default().as_str(),
            )
            .param(
                "description",
                node.string_property("description")
                    .unwrap_or_default()
                    .as_str(),
            );

            match self.session.run(query).await {
                Ok(_) => imported += 1,
                Err(err) => warn!("Skipping schema entry {}: {err}", node.id),
            }
        }

        info!(
            "Imported {imported}/{} schema entries from {}",
            document.nodes.len(),
            path.display()
        );
        true
    }

    /// Import a graph snapshot. Nodes are upserted under the same identity
    /// rules as live recording (File by path, Decision/Transformation by id),
    /// edges by their endpoints and kind. Unknown node or edge types and
    /// individually failing entries are skipped with a warning; re-importing
    /// the same snapshot never duplicates nodes or edges.
    pub async fn import_graph(&self, path: &Path) -> bool {
        let document = match load_snapshot(path) {
            Some(document) => document,
            None => return false,
        };

        let mut imported = 0usize;
        for node in &document.nodes {
            match self.import_node(node).await {
                Ok(()) => imported += 1,
                Err(err) => warn!("Skipping node {}: {err}", node.id),
            }
        }

        let mut edges = 0usize;
        for edge in &document.edges {
            match self.import_edge(edge).await {
                Ok(()) => edges += 1,
                Err(err) => warn!(
                    "Skipping edge {} -{}-> {}: {err}",
                    edge.source, edge.kind, edge.target
                ),
            }
        }

        info!(
            "Imported {imported}/{} nodes and {edges}/{} edges from {}",
            document.nodes.len(),
            document.edges.len(),
            path.display()
        );
        true
    }

    async fn import_node(&self, node: &SnapshotNode) -> Result<(), GraphError> {
        const FILE_KEYS: &[&str] = &["language", "content", "created_at", "last_seen"];
        const DECISION_KEYS: &[&str] =
            &["decision", "rationale", "alternatives", "impact", "created_at"];
        const TRANSFORMATION_KEYS: &[&str] =
            &["transformation_type", "before", "after", "created_at"];

        let label = NodeLabel::parse(&node.kind)
            .ok_or_else(|| GraphError::query(format!("unknown node type '{}'", node.kind)))?;

        let (merge_key, merge_value, value_keys) = match label {
            NodeLabel::File => {
                let path = node
                    .string_property("path")
                    .ok_or_else(|| GraphError::query("File node without a path property"))?;
                ("path", path, FILE_KEYS)
            }
            NodeLabel::Decision => (
                "id",
                node.string_property("id").unwrap_or_else(|| node.id.clone()),
                DECISION_KEYS,
            ),
            NodeLabel::Transformation => (
                "id",
                node.string_property("id").unwrap_or_else(|| node.id.clone()),
                TRANSFORMATION_KEYS,
            ),
        };

        let mut assignments = Vec::new();
        let mut params: Vec<(&str, String)> = vec![(merge_key, merge_value)];
        for &key in value_keys {
            if let Some(value) = node.string_property(key) {
                assignments.push(format!("n.{key} = ${key}"));
                params.push((key, value));
            }
        }

        let statement = if assignments.is_empty() {
            format!(
                "MERGE (n:{label} {{{merge_key}: ${merge_key}}})",
                label = label.as_str()
            )
        } else {
            format!(
                "MERGE (n:{label} {{{merge_key}: ${merge_key}}}) SET {sets}",
                label = label.as_str(),
                sets = assignments.join(", ")
            )
        };

        let mut query = neo4rs::query(&statement);
        for (key, value) in &params {
            query = query.param(key, value.as_str());
        }
        self.session.run(query).await?;
        debug!("Upserted snapshot node {}", node.id);
        Ok(())
    }

    async fn import_edge(&self, edge: &SnapshotEdge) -> Result<(), GraphError> {
        let kind = RelKind::parse(&edge.kind)
            .ok_or_else(|| GraphError::query(format!("unknown edge type '{}'", edge.kind)))?;

        // Endpoints are matched by either identity key; a missing endpoint
        // yields zero rows and therefore no edge.
        let statement = format!(
            "MATCH (a) WHERE (a:File AND a.path = $source) OR a.id = $source \
             MATCH (b) WHERE (b:File AND b.path = $target) OR b.id = $target \
             MERGE (a)-[:{kind}]->(b)",
            kind = kind.as_str()
        );
        let query = neo4rs::query(&statement)
            .param("source", edge.source.as_str())
            .param("target", edge.target.as_str());
        self.session.run(query).await?;
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> Option<SnapshotDocument> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!("Cannot read snapshot {}: {err}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(document) => Some(document),
        Err(err) => {
            warn!("Cannot parse snapshot {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rel_kind_roundtrip() {
        for kind in [
            RelKind::MigratedTo,
            RelKind::Affects,
            RelKind::Motivates,
            RelKind::Concerns,
        ] {
            assert_eq!(RelKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RelKind::parse("DEPENDS_ON"), None);
    }

    #[test]
    fn test_node_label_parse() {
        assert_eq!(NodeLabel::parse("File"), Some(NodeLabel::File));
        assert_eq!(NodeLabel::parse("Widget"), None);
    }

    #[test]
    fn test_constraints_are_idempotent_statements() {
        for statement in CONSTRAINTS.iter().chain(INDEXES) {
            assert!(statement.contains("IF NOT EXISTS"), "{statement}");
        }
    }

    #[test]
    fn test_parse_snapshot_document() {
        let raw = r##"{
            "@graph": [
                {"@id": "file:1", "@type": "File", "path": "lib/core/secrets.sh",
                 "language": "source", "content": "#!/bin/bash"},
                {"@id": "decision:abc", "@type": "Decision",
                 "decision": "Use click for the CLI", "rationale": "mature",
                 "alternatives": ["argparse"]}
            ],
            "edges": [
                {"source": "decision:abc", "target": "lib/core/secrets.sh", "type": "CONCERNS"}
            ]
        }"##;
        let document: SnapshotDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(document.nodes.len(), 2);
        assert_eq!(document.edges.len(), 1);
        assert_eq!(document.nodes[0].kind, "File");
        assert_eq!(
            document.nodes[0].string_property("path").as_deref(),
            Some("lib/core/secrets.sh")
        );
        // Array-valued properties flatten to their JSON encoding
        assert_eq!(
            document.nodes[1].string_property("alternatives").as_deref(),
            Some(r#"["argparse"]"#)
        );
        assert_eq!(document.edges[0].kind, "CONCERNS");
    }

    #[test]
    fn test_parse_snapshot_without_edges() {
        let document: SnapshotDocument = serde_json::from_str(r#"{"@graph": []}"#).unwrap();
        assert!(document.nodes.is_empty());
        assert!(document.edges.is_empty());
    }

    #[test]
    fn test_load_snapshot_missing_and_malformed() {
        assert!(load_snapshot(Path::new("/nonexistent/graph.json")).is_none());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();
        assert!(load_snapshot(file.path()).is_none());
    }
}
