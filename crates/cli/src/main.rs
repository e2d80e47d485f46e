use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orchestrator::{ChatOracle, RunnerConfig, TaskRunner, ToolRegistry};
use pilot_core::Role;
use tools::{
    CreateSearchIndex, EvalScript, QuerySearchIndex, ReadFile, RunScript, SearchApi,
    UploadToSearchIndex, WriteFile,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_INTERPRETER: &str = "python3";

#[derive(Parser)]
#[command(name = "pilot")]
#[command(about = "Run a task through the tool pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task to completion and print the result
    Run {
        /// The task to accomplish
        task: String,

        /// Interpreter used by the script tools
        #[arg(long, default_value = DEFAULT_INTERPRETER)]
        interpreter: String,

        /// Script execution timeout in seconds
        #[arg(long, default_value_t = 30)]
        script_timeout: u64,

        /// Stage ceiling before the run is forced to finalize
        #[arg(long)]
        max_steps: Option<u32>,

        /// Print the full narration history, not just the final answer
        #[arg(long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            task,
            interpreter,
            script_timeout,
            max_steps,
            verbose,
        } => run_task(task, interpreter, script_timeout, max_steps, verbose).await,
    }
}

async fn run_task(
    task: String,
    interpreter: String,
    script_timeout: u64,
    max_steps: Option<u32>,
    verbose: bool,
) -> Result<()> {
    let oracle = ChatOracle::from_env()
        .context("oracle configuration (set PILOT_ORACLE_ENDPOINT and PILOT_ORACLE_API_KEY)")?;
    let registry = build_registry(&interpreter, Duration::from_secs(script_timeout));

    let mut config = RunnerConfig::default();
    if let Some(max_steps) = max_steps {
        config = config.with_max_steps(max_steps);
    }

    let runner = TaskRunner::new(Arc::new(oracle), Arc::new(registry), config);
    let record = runner.run(task).await.context("task run failed")?;

    if verbose {
        for message in record.history() {
            let label = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            println!("[{}] {}\n", label, message.content);
        }
    } else if let Some(output) = record.final_output() {
        println!("{}", output);
    }

    if !record.errors().is_empty() {
        eprintln!("{} error(s) occurred during the run:", record.errors().len());
        for error in record.errors() {
            eprintln!("  [{}] {}", error.kind.as_str(), error.message);
        }
    }

    Ok(())
}

fn build_registry(interpreter: &str, script_timeout: Duration) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(
        RunScript::new(interpreter).with_timeout(script_timeout),
    ));
    registry.register(Arc::new(
        EvalScript::new(interpreter).with_timeout(script_timeout),
    ));
    registry.register(Arc::new(ReadFile));
    registry.register(Arc::new(WriteFile));

    // Search tools are registered only when the endpoint is configured.
    match SearchApi::from_env() {
        Ok(api) => {
            let api = Arc::new(api);
            registry.register(Arc::new(CreateSearchIndex::new(api.clone())));
            registry.register(Arc::new(UploadToSearchIndex::new(api.clone())));
            registry.register(Arc::new(QuerySearchIndex::new(api)));
        }
        Err(e) => {
            tracing::debug!(error = %e, "Search tools disabled");
        }
    }

    registry
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pilot=info,orchestrator=info,tools=info".into()),
        )
        .init();
}
