use crate::config::Config;
use crate::gateway::{self, AppState};
use crate::prompt::PromptSet;
use crate::providers;
use crate::scoring;
use crate::store::Store;
use crate::synthesis::{self, ScenarioStatus, TracingObserver};
use crate::transfer::{self, ImportEntry};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// `judgebench` - workbench for building and evaluating LLM judge prompts.
#[derive(Parser, Debug)]
#[command(name = "judgebench")]
#[command(version = "0.1.0")]
#[command(about = "Build and evaluate LLM judge prompts.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the workspace and configuration
    Init,

    /// Start the HTTP gateway
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
    },

    /// Expand a project's taxonomy and synthesize every scenario
    Synthesize {
        /// Project id
        #[arg(long)]
        project: i64,
    },

    /// Export a project's synthetic inputs as a JSON exchange file
    Export {
        /// Project id
        #[arg(long)]
        project: i64,

        /// Output file path
        #[arg(long)]
        out: PathBuf,
    },

    /// Import model outputs from a JSON exchange file
    Import {
        /// Model id the outputs belong to
        #[arg(long)]
        model: i64,

        /// Input file path
        #[arg(long)]
        file: PathBuf,
    },

    /// Aggregate a model's evaluations into scores
    Score {
        /// Model id
        #[arg(long)]
        model: i64,
    },
}

async fn open_store(config: &Config) -> Result<Store> {
    let db_path = config.store.database_path(&config.workspace_dir);
    Store::open(&db_path).await
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Init => {
            println!("✓ Config ready at {}", config.config_path.display());
            println!("  Workspace: {}", config.workspace_dir.display());
            Ok(())
        }

        Commands::Serve { port, host } => {
            let store = Arc::new(open_store(&config).await?);
            let state = AppState {
                provider: providers::create_provider(&config),
                store,
                prompts: Arc::new(PromptSet::new()?),
            };
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, state).await
        }

        Commands::Synthesize { project } => {
            let store = open_store(&config).await?;
            let provider = providers::create_provider(&config);
            let prompts = PromptSet::new()?;

            let row = store
                .get_project(project)
                .await?
                .with_context(|| format!("project {project} not found"))?;
            let taxonomy = row
                .taxonomy()?
                .with_context(|| format!("project {project} has no taxonomy"))?;

            let outcomes = synthesis::run_batch(
                &store,
                provider.as_ref(),
                &prompts,
                &taxonomy,
                project,
                &TracingObserver,
            )
            .await;

            let completed = outcomes
                .iter()
                .filter(|o| o.status == ScenarioStatus::Completed)
                .count();
            println!(
                "✓ Synthesized {completed}/{} scenarios for project {project}",
                outcomes.len()
            );
            Ok(())
        }

        Commands::Export { project, out } => {
            let store = open_store(&config).await?;
            let entries = transfer::export_inputs(&store, project).await?;
            let json = serde_json::to_string_pretty(&entries)?;
            tokio::fs::write(&out, json)
                .await
                .with_context(|| format!("write {}", out.display()))?;
            println!("✓ Exported {} inputs to {}", entries.len(), out.display());
            Ok(())
        }

        Commands::Import { model, file } => {
            let store = open_store(&config).await?;
            let contents = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            let entries: Vec<ImportEntry> =
                serde_json::from_str(&contents).context("parse exchange file")?;
            let report = transfer::import_outputs(&store, model, &entries).await?;
            println!("✓ Updated {} evaluations", report.updated);
            if !report.missing.is_empty() {
                println!("! No evaluation row for ids: {:?}", report.missing);
            }
            Ok(())
        }

        Commands::Score { model } => {
            let store = open_store(&config).await?;
            let rows = store.list_evaluations_for_model(model).await?;
            let scores = scoring::score(&rows);
            store.set_model_score(model, scores.overall).await?;
            println!(
                "Overall: {}%  Judge quality: {}%  ({} evaluations)",
                scoring::display_rounded(scores.overall),
                scoring::display_rounded(scores.judge_quality),
                rows.len()
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve_with_overrides() {
        let cli = Cli::try_parse_from(["judgebench", "serve", "--port", "9000", "--host", "0.0.0.0"])
            .unwrap();
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, Some(9000));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_synthesize() {
        let cli = Cli::try_parse_from(["judgebench", "synthesize", "--project", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Synthesize { project: 3 }
        ));
    }

    #[test]
    fn cli_rejects_missing_required_args() {
        assert!(Cli::try_parse_from(["judgebench", "export", "--project", "1"]).is_err());
    }
}
