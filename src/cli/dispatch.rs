//! Command dispatch: resolve configuration, start the shared module, run one
//! subcommand, and map the outcome to an exit code.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::warn;

use stackshift_core::{GraphConfig, ServiceRegistry};
use stackshift_graph::{
    DecisionRecord, FileMigrationStatus, KnowledgeGraphModule, MigrationStatistics, SchemaManager,
    TransformationRecord,
};

use crate::cli::args::{Cli, Command};

/// Run a parsed CLI invocation. Returns the process exit code: 0 on success,
/// 1 when the underlying operation reports failure, 2 on usage/config errors.
pub async fn run(cli: Cli) -> i32 {
    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return 2;
        }
    };

    let registry: ServiceRegistry<KnowledgeGraphModule> = ServiceRegistry::new();
    let module = registry
        .get_or_init(|| async { KnowledgeGraphModule::new(config) })
        .await;

    if !module.start().await {
        // Tracking is best-effort: queries still answer with empty results
        // and record commands report failure through their exit code.
        warn!("Graph store unavailable; continuing in degraded mode");
    }

    let code = match execute(&cli, &module).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    };

    module.stop().await;
    code
}

fn build_config(cli: &Cli) -> Result<GraphConfig> {
    let mut config =
        GraphConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(uri) = &cli.uri {
        config.uri = uri.clone();
    }
    if let Some(username) = &cli.username {
        config.username = username.clone();
    }
    if let Some(password) = &cli.password {
        config.password = password.clone();
    }
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    Ok(config)
}

async fn execute(cli: &Cli, module: &Arc<KnowledgeGraphModule>) -> Result<i32> {
    match &cli.command {
        Command::Status => {
            let status = module.status().await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Name:        {}", status.name);
                println!("Description: {}", status.description);
                println!("Connection:  {}", status.connection_status);
                println!();
                print_statistics(&status.migration_stats);
            }
            Ok(0)
        }

        Command::Stats => {
            let stats = module.get_migration_statistics().await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_statistics(&stats);
            }
            Ok(0)
        }

        Command::RecordDecision {
            decision,
            rationale,
            bash_file,
            python_file,
            alternatives,
            impact,
        } => {
            match module
                .record_migration_decision(
                    decision,
                    rationale,
                    bash_file.as_deref(),
                    python_file.as_deref(),
                    alternatives,
                    impact.as_deref(),
                )
                .await
            {
                Some(record) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&record)?);
                    } else {
                        println!("Recorded migration decision {}", record.id);
                    }
                    Ok(0)
                }
                None => {
                    eprintln!("Failed to record migration decision");
                    Ok(1)
                }
            }
        }

        Command::RecordTransformation {
            transformation_type,
            before,
            after,
            bash_file,
            python_file,
            decision_id,
        } => {
            match module
                .record_code_transformation(
                    transformation_type,
                    before,
                    after,
                    bash_file.as_deref(),
                    python_file.as_deref(),
                    decision_id.as_deref(),
                )
                .await
            {
                Some(record) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&record)?);
                    } else {
                        println!("Recorded code transformation {}", record.id);
                    }
                    Ok(0)
                }
                None => {
                    eprintln!("Failed to record code transformation");
                    Ok(1)
                }
            }
        }

        Command::RecordBashFile {
            file_path,
            content,
            content_file,
        } => {
            let content = load_content(content.as_deref(), content_file.as_deref())?;
            match module.record_bash_file(file_path, &content).await {
                Some(_) => {
                    println!("Recorded bash file {file_path}");
                    Ok(0)
                }
                None => {
                    eprintln!("Failed to record bash file {file_path}");
                    Ok(1)
                }
            }
        }

        Command::RecordPythonFile {
            file_path,
            content,
            content_file,
            bash_file,
        } => {
            let content = load_content(content.as_deref(), content_file.as_deref())?;
            match module
                .record_python_file(file_path, &content, bash_file.as_deref())
                .await
            {
                Some(_) => {
                    println!("Recorded python file {file_path}");
                    Ok(0)
                }
                None => {
                    eprintln!("Failed to record python file {file_path}");
                    Ok(1)
                }
            }
        }

        Command::GetDecisions {
            bash_file,
            python_file,
        } => {
            let decisions = module
                .get_migration_decisions(bash_file.as_deref(), python_file.as_deref())
                .await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&decisions)?);
            } else {
                print_decisions(&decisions);
            }
            Ok(0)
        }

        Command::GetTransformations {
            bash_file,
            python_file,
            transformation_type,
        } => {
            let transformations = module
                .get_code_transformations(
                    bash_file.as_deref(),
                    python_file.as_deref(),
                    transformation_type.as_deref(),
                )
                .await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&transformations)?);
            } else {
                print_transformations(&transformations);
            }
            Ok(0)
        }

        Command::GetFileStatus { bash_file } => {
            let status = module.get_file_migration_status(bash_file).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_file_status(&status);
            }
            Ok(0)
        }

        Command::ImportSchema { path } => import_snapshot(module, path, true).await,
        Command::ImportGraph { path } => import_snapshot(module, path, false).await,
    }
}

async fn import_snapshot(
    module: &Arc<KnowledgeGraphModule>,
    path: &PathBuf,
    schema: bool,
) -> Result<i32> {
    if !module.session().ensure_connected().await {
        eprintln!("Cannot import: graph store unavailable");
        return Ok(1);
    }
    let manager = SchemaManager::new(module.session());
    let ok = if schema {
        manager.import_schema(path).await
    } else {
        manager.import_graph(path).await
    };
    if ok {
        println!("Imported {}", path.display());
        Ok(0)
    } else {
        eprintln!("Import of {} failed", path.display());
        Ok(1)
    }
}

fn load_content(content: Option<&str>, content_file: Option<&std::path::Path>) -> Result<String> {
    match (content, content_file) {
        (Some(content), None) => Ok(content.to_string()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => bail!("either --content or --content-file must be given"),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

fn print_statistics(stats: &MigrationStatistics) {
    println!("Total Bash Files:      {}", stats.total_source_files);
    println!("Total Python Files:    {}", stats.total_target_files);
    println!("Migrated Files:        {}", stats.migrated_files);
    println!("Migration Progress:    {:.2}%", stats.migration_progress);
    println!("Total Decisions:       {}", stats.total_decisions);
    println!("Total Transformations: {}", stats.total_transformations);
}

fn print_decisions(decisions: &[DecisionRecord]) {
    if decisions.is_empty() {
        println!("No migration decisions found");
        return;
    }
    for decision in decisions {
        println!("{}", decision.id);
        println!("  decision:  {}", decision.decision);
        println!("  rationale: {}", decision.rationale);
        if !decision.alternatives.is_empty() {
            println!("  alternatives: {}", decision.alternatives.join(", "));
        }
        if let Some(impact) = &decision.impact {
            println!("  impact:    {impact}");
        }
        println!("  recorded:  {}", decision.created_at.to_rfc3339());
    }
}

fn print_transformations(transformations: &[TransformationRecord]) {
    if transformations.is_empty() {
        println!("No code transformations found");
        return;
    }
    for transformation in transformations {
        println!("{}", transformation.id);
        println!("  type:   {}", transformation.transformation_type);
        println!("  before: {}", truncate(&transformation.before, 50));
        println!("  after:  {}", truncate(&transformation.after, 50));
        if let Some(decision_id) = &transformation.decision_id {
            println!("  decision: {decision_id}");
        }
        println!("  recorded: {}", transformation.created_at.to_rfc3339());
    }
}

fn print_file_status(status: &FileMigrationStatus) {
    println!("Bash File:       {}", status.source_path);
    println!(
        "Python File:     {}",
        status.target_path.as_deref().unwrap_or("Not migrated")
    );
    println!("Migrated:        {}", if status.migrated { "Yes" } else { "No" });
    println!("Decisions:       {}", status.decisions.len());
    println!("Transformations: {}", status.transformations.len());
}
