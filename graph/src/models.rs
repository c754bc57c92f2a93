//! Record types returned by the migration knowledge graph.
//!
//! The graph's dynamic node/edge model is narrowed here to the three entity
//! kinds the migration tracker cares about, so each record carries exactly
//! the properties its kind defines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the migration a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileLanguage {
    /// Original Bash file
    Source,
    /// Python equivalent
    Target,
}

impl FileLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileLanguage::Source => "source",
            FileLanguage::Target => "target",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "source" => Some(FileLanguage::Source),
            "target" => Some(FileLanguage::Target),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked file, unique by path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    pub path: String,
    pub language: FileLanguage,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A recorded migration decision. Decisions are events: every recording
/// produces a new node with a fresh identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    pub decision: String,
    pub rationale: String,
    pub alternatives: Vec<String>,
    pub impact: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A recorded code transformation, optionally motivated by a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationRecord {
    pub id: String,
    pub transformation_type: String,
    pub before: String,
    pub after: String,
    pub decision_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-file migration status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMigrationStatus {
    pub source_path: String,
    pub target_path: Option<String>,
    pub migrated: bool,
    pub decisions: Vec<DecisionRecord>,
    pub transformations: Vec<TransformationRecord>,
}

impl FileMigrationStatus {
    /// Status for a file the graph knows nothing about.
    pub fn unknown(source_path: &str) -> Self {
        Self {
            source_path: source_path.to_string(),
            target_path: None,
            migrated: false,
            decisions: Vec::new(),
            transformations: Vec::new(),
        }
    }
}

/// Graph-wide migration statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationStatistics {
    pub total_source_files: u64,
    pub total_target_files: u64,
    pub migrated_files: u64,
    pub migration_progress: f64,
    pub total_decisions: u64,
    pub total_transformations: u64,
}

/// Percentage of source files with a recorded target, 0.0 for an empty graph.
pub fn progress_percent(migrated: u64, total_source: u64) -> f64 {
    if total_source == 0 {
        0.0
    } else {
        (migrated as f64 / total_source as f64) * 100.0
    }
}

/// Parse an RFC 3339 node property, falling back to "now" for missing or
/// malformed values rather than failing the whole read.
pub(crate) fn parse_timestamp(raw: Option<String>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Alternatives are stored on the node as a JSON-encoded string property.
pub(crate) fn encode_alternatives(alternatives: &[String]) -> String {
    serde_json::to_string(alternatives).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn decode_alternatives(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}
