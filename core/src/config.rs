//! Connection configuration for the knowledge graph store.
//!
//! Settings resolve in three layers: compiled-in defaults, an optional TOML
//! configuration file, and environment variables. Callers (the CLI) may apply
//! a fourth layer of explicit flag overrides on top.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while loading configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Neo4j connection settings for the migration knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Bolt URI of the graph store
    pub uri: String,
    /// Username for authentication
    pub username: String,
    /// Password for authentication
    pub password: String,
    /// Database name (Neo4j 4.x+)
    pub database: String,
    /// Result fetch size per pull
    pub fetch_size: usize,
    /// Optional JSON-LD schema snapshot applied at startup
    pub schema_file: Option<PathBuf>,
    /// Optional JSON-LD graph snapshot applied at startup
    pub graph_file: Option<PathBuf>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
            fetch_size: 200,
            schema_file: None,
            graph_file: None,
        }
    }
}

impl GraphConfig {
    /// Load settings from a TOML file, falling back to defaults for any
    /// missing keys.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Loaded graph config from {}", path.display());
        Ok(config)
    }

    /// Apply environment variable overrides on top of `self`.
    ///
    /// `NEO4J_URI` wins over `NEO4J_BOLT_PORT`; the latter only rewrites the
    /// port of the default localhost URI.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("NEO4J_BOLT_PORT") {
            if port.parse::<u16>().is_ok() {
                self.uri = format!("bolt://localhost:{port}");
            } else {
                warn!("Ignoring non-numeric NEO4J_BOLT_PORT value: {port}");
            }
        }
        if let Ok(uri) = std::env::var("NEO4J_URI") {
            self.uri = uri;
        }
        if let Ok(username) = std::env::var("NEO4J_USERNAME") {
            self.username = username;
        }
        if let Ok(password) = std::env::var("NEO4J_PASSWORD") {
            self.password = password;
        }
        if let Ok(database) = std::env::var("NEO4J_DATABASE") {
            self.database = database;
        }
        self
    }

    /// Resolve the effective configuration: optional file, then environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.username, "neo4j");
        assert_eq!(config.password, "password");
        assert_eq!(config.database, "neo4j");
        assert!(config.schema_file.is_none());
    }

    #[test]
    fn test_from_file_partial_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "uri = \"bolt://graph.internal:7687\"\npassword = \"s3cret\""
        )
        .unwrap();

        let config = GraphConfig::from_file(file.path()).unwrap();
        assert_eq!(config.uri, "bolt://graph.internal:7687");
        assert_eq!(config.password, "s3cret");
        // Unspecified keys keep their defaults
        assert_eq!(config.username, "neo4j");
        assert_eq!(config.database, "neo4j");
    }

    #[test]
    fn test_from_file_missing() {
        let result = GraphConfig::from_file(Path::new("/nonexistent/stackshift.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_from_file_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "uri = [not toml").unwrap();

        let result = GraphConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    // Kept as a single test: the override keys are process-global.
    #[test]
    fn test_env_overrides() {
        std::env::set_var("NEO4J_BOLT_PORT", "7999");
        std::env::set_var("NEO4J_PASSWORD", "from-env");
        let config = GraphConfig::default().with_env_overrides();
        assert_eq!(config.uri, "bolt://localhost:7999");
        assert_eq!(config.password, "from-env");

        // A full URI wins over the bolt-port shorthand
        std::env::set_var("NEO4J_URI", "bolt://graph.internal:7687");
        let config = GraphConfig::default().with_env_overrides();
        assert_eq!(config.uri, "bolt://graph.internal:7687");

        std::env::remove_var("NEO4J_BOLT_PORT");
        std::env::remove_var("NEO4J_PASSWORD");
        std::env::remove_var("NEO4J_URI");
    }

    #[test]
    fn test_snapshot_paths_deserialize() {
        let config: GraphConfig =
            toml::from_str("schema_file = \"docs/schema.json\"\ngraph_file = \"docs/graph.json\"")
                .unwrap();
        assert_eq!(config.schema_file, Some(PathBuf::from("docs/schema.json")));
        assert_eq!(config.graph_file, Some(PathBuf::from("docs/graph.json")));
    }
}
