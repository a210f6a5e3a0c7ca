//! # flowgraph
//!
//! Drive the demo number graph through a persistent pipe: start runs, answer their
//! interrupts, and inspect stored snapshots.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

mod demo;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use demo::Tally;
use flowgraph_core::{
    Execution, ExecutionContext, ExecutionOutcome, Pipe, PipeConfig, ResumeConfig,
    SerializationFormat, StoreConfig,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flowgraph")]
#[command(about = "Run, pause and resume the flowgraph demo graph", long_about = None)]
#[command(version)]
struct Cli {
    /// Pipe configuration (.toml, .yaml or .yml)
    #[arg(short, long, global = true, env = "FLOWGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new run
    Invoke {
        /// Execution instance id
        #[arg(long)]
        id: String,

        /// Initial sum
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        sum: i64,
    },

    /// Answer the pending interrupt of a run and continue it
    Continue {
        #[arg(long)]
        id: String,

        /// Answer as key=value; repeatable
        #[arg(long = "answer", value_parser = parse_answer)]
        answers: Vec<(String, String)>,
    },

    /// Print the stored execution state
    Show {
        #[arg(long)]
        id: String,
    },

    /// Print the graph as a mermaid diagram
    Graph,
}

fn parse_answer(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Without a config file, snapshots go to `./.flowgraph` so runs survive between calls
fn default_config() -> PipeConfig {
    PipeConfig {
        flow_name: demo::FLOW_NAME.to_string(),
        store: StoreConfig::File {
            path: PathBuf::from(".flowgraph"),
            format: SerializationFormat::Json,
        },
        ..PipeConfig::default()
    }
}

fn init_tracing(config: &PipeConfig) {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(rust_log)
        .with_writer(std::io::stderr)
        .init();
}

fn report(execution: &Execution<Tally>) -> anyhow::Result<()> {
    let (status, interrupt, error) = match &execution.outcome {
        ExecutionOutcome::Completed => ("completed", None, None),
        ExecutionOutcome::Interrupted(interrupt) => ("interrupted", Some(interrupt), None),
        ExecutionOutcome::Failed(e) => ("failed", None, Some(e.to_string())),
    };

    let summary = json!({
        "status": status,
        "node": execution.checkpoint.checkpoint_id,
        "state": execution.state,
        "interrupt": interrupt,
        "error": error,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    match error {
        Some(e) => Err(anyhow!("run failed: {}", e)),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipeConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => default_config(),
    };
    init_tracing(&config);

    if config.store == StoreConfig::Memory && !matches!(cli.command, Commands::Graph) {
        tracing::warn!("In-memory store configured; state is lost when this command exits");
    }

    let pipe: Pipe<Tally> = config.build_pipe(demo::graph()?);
    let ctx = ExecutionContext::new();

    match cli.command {
        Commands::Invoke { id, sum } => {
            let execution = pipe
                .invoke(&ctx, &id, Tally { sum, decision: None })
                .await?;
            report(&execution)?;
        }
        Commands::Continue { id, answers } => {
            let answers: HashMap<String, String> = answers.into_iter().collect();
            let execution = pipe.resume(&ctx, &id, ResumeConfig::from(answers)).await?;
            report(&execution)?;
        }
        Commands::Show { id } => {
            let snapshot = pipe.snapshot(&id).await?;
            if !snapshot.checkpoint_state.is_started() {
                bail!("no execution '{}' found for flow '{}'", id, pipe.name());
            }
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Graph => {
            print!("{}", pipe.graph().to_mermaid());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(
            parse_answer("decision=approve").unwrap(),
            ("decision".to_string(), "approve".to_string())
        );
        assert_eq!(parse_answer("note=a=b").unwrap().1, "a=b");
        assert!(parse_answer("decision").is_err());
        assert!(parse_answer("=x").is_err());
    }

    #[test]
    fn test_cli_parses_continue() {
        let cli = Cli::try_parse_from([
            "flowgraph",
            "continue",
            "--id",
            "r1",
            "--answer",
            "decision=approve",
        ])
        .unwrap();

        match cli.command {
            Commands::Continue { id, answers } => {
                assert_eq!(id, "r1");
                assert_eq!(answers, vec![("decision".to_string(), "approve".to_string())]);
            }
            _ => panic!("expected continue"),
        }
    }
}
