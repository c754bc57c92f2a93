//! CLI argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "stackshift",
    version,
    about = "Track a Bash-to-Python migration in a Neo4j knowledge graph"
)]
pub struct Cli {
    /// Bolt URI of the graph store
    #[arg(long, global = true)]
    pub uri: Option<String>,

    /// Username for the graph store
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Password for the graph store
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Database name
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show module status and migration statistics
    Status,

    /// Show migration statistics
    Stats,

    /// Record a migration decision
    RecordDecision {
        /// The decision that was made
        #[arg(long)]
        decision: String,
        /// Justification for the decision
        #[arg(long)]
        rationale: String,
        /// Bash file the decision concerns
        #[arg(long = "bash-file")]
        bash_file: Option<String>,
        /// Python file the decision concerns
        #[arg(long = "python-file")]
        python_file: Option<String>,
        /// Alternatives that were considered (comma-separated)
        #[arg(long, value_delimiter = ',')]
        alternatives: Vec<String>,
        /// Impact of the decision
        #[arg(long)]
        impact: Option<String>,
    },

    /// Record a code transformation
    RecordTransformation {
        /// Transformation type, e.g. function_migration or syntax_change
        #[arg(long = "type")]
        transformation_type: String,
        /// Code before the transformation
        #[arg(long)]
        before: String,
        /// Code after the transformation
        #[arg(long)]
        after: String,
        #[arg(long = "bash-file")]
        bash_file: Option<String>,
        #[arg(long = "python-file")]
        python_file: Option<String>,
        /// Id of the motivating decision
        #[arg(long = "decision-id")]
        decision_id: Option<String>,
    },

    /// Record a Bash source file
    RecordBashFile {
        #[arg(long = "file-path")]
        file_path: String,
        /// Inline file content
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,
        /// Read content from this file
        #[arg(long = "content-file")]
        content_file: Option<PathBuf>,
    },

    /// Record a Python target file
    RecordPythonFile {
        #[arg(long = "file-path")]
        file_path: String,
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,
        #[arg(long = "content-file")]
        content_file: Option<PathBuf>,
        /// Bash file this Python file replaces
        #[arg(long = "bash-file")]
        bash_file: Option<String>,
    },

    /// List migration decisions
    GetDecisions {
        #[arg(long = "bash-file")]
        bash_file: Option<String>,
        #[arg(long = "python-file")]
        python_file: Option<String>,
    },

    /// List code transformations
    GetTransformations {
        #[arg(long = "bash-file")]
        bash_file: Option<String>,
        #[arg(long = "python-file")]
        python_file: Option<String>,
        #[arg(long = "type")]
        transformation_type: Option<String>,
    },

    /// Show the migration status of a Bash file
    GetFileStatus {
        #[arg(long = "bash-file")]
        bash_file: String,
    },

    /// Import a JSON-LD schema snapshot
    ImportSchema {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Import a JSON-LD graph snapshot
    ImportGraph {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_parse_status() {
        let cli = Cli::try_parse_from(["stackshift", "status"]).unwrap();
        assert!(matches!(cli.command, Command::Status));
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "stackshift",
            "--uri",
            "bolt://graph:7687",
            "--json",
            "stats",
        ])
        .unwrap();
        assert_eq!(cli.uri.as_deref(), Some("bolt://graph:7687"));
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Stats));
    }

    #[test]
    fn test_parse_record_decision() {
        let cli = Cli::try_parse_from([
            "stackshift",
            "record-decision",
            "--decision",
            "Use click",
            "--rationale",
            "mature",
            "--bash-file",
            "lib/core/secrets.sh",
            "--alternatives",
            "argparse,docopt",
        ])
        .unwrap();
        match cli.command {
            Command::RecordDecision {
                decision,
                alternatives,
                bash_file,
                python_file,
                ..
            } => {
                assert_eq!(decision, "Use click");
                assert_eq!(alternatives, vec!["argparse", "docopt"]);
                assert_eq!(bash_file.as_deref(), Some("lib/core/secrets.sh"));
                assert!(python_file.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_record_decision_requires_rationale() {
        let err = Cli::try_parse_from(["stackshift", "record-decision", "--decision", "x"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_parse_record_transformation() {
        let cli = Cli::try_parse_from([
            "stackshift",
            "record-transformation",
            "--type",
            "syntax_change",
            "--before",
            "[ -z \"$x\" ]",
            "--after",
            "if not x:",
            "--decision-id",
            "decision:abc",
        ])
        .unwrap();
        match cli.command {
            Command::RecordTransformation {
                transformation_type,
                decision_id,
                ..
            } => {
                assert_eq!(transformation_type, "syntax_change");
                assert_eq!(decision_id.as_deref(), Some("decision:abc"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_content_and_content_file_conflict() {
        let err = Cli::try_parse_from([
            "stackshift",
            "record-bash-file",
            "--file-path",
            "lib/a.sh",
            "--content",
            "echo",
            "--content-file",
            "/tmp/a.sh",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_parse_get_transformations_with_type() {
        let cli = Cli::try_parse_from([
            "stackshift",
            "get-transformations",
            "--python-file",
            "llm_stack/core/secrets.py",
            "--type",
            "function_migration",
        ])
        .unwrap();
        match cli.command {
            Command::GetTransformations {
                python_file,
                transformation_type,
                bash_file,
            } => {
                assert_eq!(python_file.as_deref(), Some("llm_stack/core/secrets.py"));
                assert_eq!(transformation_type.as_deref(), Some("function_migration"));
                assert!(bash_file.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_import_graph() {
        let cli = Cli::try_parse_from(["stackshift", "import-graph", "docs/graph.json"]).unwrap();
        match cli.command {
            Command::ImportGraph { path } => {
                assert_eq!(path, PathBuf::from("docs/graph.json"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["stackshift", "frobnicate"]).is_err());
    }
}
