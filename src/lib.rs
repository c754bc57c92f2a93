//! StackShift CLI
//!
//! Thin command-line surface over the knowledge graph module: every
//! subcommand is a direct pass-through to one core operation, formatted for a
//! terminal (or as JSON with `--json`).

pub mod cli;

pub use cli::{run, Cli};
