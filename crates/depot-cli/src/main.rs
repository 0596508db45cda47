//! Agent Depot CLI
//!
//! The `depot` command registers agents, stages their code and runs them.
//!
//! ## Commands
//!
//! - `register`: Register an agent from a JSON card
//! - `list` / `show`: Inspect registered agents
//! - `stage` / `unstage` / `stagings`: Manage staged checkouts per target
//! - `run` / `run-local`: Invoke an agent's entrypoint
//! - `validate`: Stage to the sample target and smoke-run

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use depot_core::metrics::METRICS;
use depot_core::{Depot, DepotConfig, StagingStatus};
use depot_state::{AgentFilter, AgentRegistration, JsonMap, SurrealHandle};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "depot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Agent Depot: registry and control plane for pluggable agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Root directory for staged checkouts
    #[arg(long, global = true, env = "AGENTS_WORKDIR")]
    workdir: Option<PathBuf>,

    /// Create staging directories without touching version control
    #[arg(long, global = true)]
    skip_vcs: bool,

    /// Deadline for a single invocation, in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an agent from a JSON card
    Register {
        /// Path to the agent card (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List registered agents
    List {
        /// Only agents with this name
        #[arg(long)]
        name: Option<String>,

        /// Only agents of this type
        #[arg(long = "type")]
        agent_type: Option<String>,

        /// Only agents carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show one agent (id, name@version or name)
    Show { agent: String },

    /// Stage an agent's code for a target
    Stage {
        agent: String,

        #[arg(short, long)]
        target: String,
    },

    /// Run an agent from its ready staging on a target
    Run {
        agent: String,

        #[arg(short, long)]
        target: String,

        /// Path to the inputs (JSON object)
        #[arg(short, long)]
        inputs: Option<PathBuf>,
    },

    /// Stage to the local target and run immediately
    RunLocal {
        agent: String,

        /// Path to the inputs (JSON object)
        #[arg(short, long)]
        inputs: Option<PathBuf>,
    },

    /// Smoke-validate an agent and record the outcome
    Validate {
        agent: String,

        /// Score to record on success
        #[arg(long)]
        score: Option<f64>,
    },

    /// List staging records for an agent, newest first
    Stagings { agent: String },

    /// Mark an agent's staging for a target as deleted
    Unstage {
        agent: String,

        #[arg(short, long)]
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    depot_core::telemetry::init_tracing(cli.json, level);

    let config = build_config(&cli)?;

    // Initialize database connection
    let handle = SurrealHandle::setup_from_env()
        .await
        .context("Failed to connect to the depot database")?;
    let depot = Depot::with_surreal(
        config,
        Arc::new(handle),
        Arc::new(depot_agents::demo_catalog()),
    );

    let result = match cli.command {
        Commands::Register { file } => cmd_register(&depot, &file).await,
        Commands::List {
            name,
            agent_type,
            tag,
        } => {
            let filter = AgentFilter {
                name,
                agent_type,
                tag,
            };
            cmd_list(&depot, &filter).await
        }
        Commands::Show { agent } => cmd_show(&depot, &agent).await,
        Commands::Stage { agent, target } => cmd_stage(&depot, &agent, &target).await,
        Commands::Run {
            agent,
            target,
            inputs,
        } => cmd_run(&depot, &agent, &target, inputs.as_deref()).await,
        Commands::RunLocal { agent, inputs } => {
            cmd_run_local(&depot, &agent, inputs.as_deref()).await
        }
        Commands::Validate { agent, score } => cmd_validate(&depot, &agent, score).await,
        Commands::Stagings { agent } => cmd_stagings(&depot, &agent).await,
        Commands::Unstage { agent, target } => cmd_unstage(&depot, &agent, &target).await,
    };

    METRICS.flush();
    result
}

/// Environment configuration with command-line overrides applied.
fn build_config(cli: &Cli) -> Result<DepotConfig> {
    let mut config = DepotConfig::from_env().context("Invalid depot configuration")?;
    if let Some(workdir) = &cli.workdir {
        config = config.with_workdir(workdir);
    }
    if cli.skip_vcs {
        config = config.with_skip_vcs(true);
    }
    if cli.timeout_ms.is_some() {
        config = config.with_invoke_timeout_ms(cli.timeout_ms);
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Read a JSON object from `path`; no path means no inputs.
fn read_inputs(path: Option<&Path>) -> Result<JsonMap> {
    let Some(path) = path else {
        return Ok(JsonMap::new());
    };
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read inputs file: {:?}", path))?;
    let value: Value =
        serde_json::from_str(&content).context("Failed to parse inputs as JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!(
            "Inputs must be a JSON object, got {}",
            json_type_name(&other)
        ),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Register an agent from a JSON card
async fn cmd_register(depot: &Depot, file: &Path) -> Result<()> {
    let content =
        std::fs::read_to_string(file).context(format!("Failed to read agent card: {:?}", file))?;
    let registration: AgentRegistration =
        serde_json::from_str(&content).context("Failed to parse agent card")?;

    let agent = depot.register_agent(registration).await?;
    info!(agent_id = %agent.id, "registered {}", agent.display_name());
    print_json(&agent)
}

async fn cmd_list(depot: &Depot, filter: &AgentFilter) -> Result<()> {
    let agents = depot.list_agents(filter).await?;
    print_json(&agents)
}

async fn cmd_show(depot: &Depot, identifier: &str) -> Result<()> {
    let agent = depot.find_agent(identifier).await?;
    print_json(&agent)
}

/// Stage an agent. A failed staging is printed, then reported as an error.
async fn cmd_stage(depot: &Depot, identifier: &str, target: &str) -> Result<()> {
    let agent = depot.find_agent(identifier).await?;
    let record = depot.stage_agent(&agent.id, target).await?;
    print_json(&record)?;

    if record.status == StagingStatus::Failed {
        anyhow::bail!(
            "Staging {} for target '{}' failed: {}",
            agent.display_name(),
            target,
            record.last_error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

async fn cmd_run(
    depot: &Depot,
    identifier: &str,
    target: &str,
    inputs: Option<&Path>,
) -> Result<()> {
    let inputs = read_inputs(inputs)?;
    let agent = depot.find_agent(identifier).await?;
    let result = depot.run_agent(&agent.id, inputs, target).await?;
    print_json(&result)
}

async fn cmd_run_local(depot: &Depot, identifier: &str, inputs: Option<&Path>) -> Result<()> {
    let inputs = read_inputs(inputs)?;
    let result = depot.run_local(identifier, inputs).await?;
    print_json(&result)
}

/// Validate an agent, printing the outcome and the stored validation state
async fn cmd_validate(depot: &Depot, identifier: &str, score: Option<f64>) -> Result<()> {
    let agent = depot.find_agent(identifier).await?;
    let (outcome, updated) = depot.validate_agent(&agent.id, score).await?;
    print_json(&serde_json::json!({
        "agent_id": updated.id,
        "outcome": outcome,
        "validation": updated.validation,
    }))
}

async fn cmd_stagings(depot: &Depot, identifier: &str) -> Result<()> {
    let agent = depot.find_agent(identifier).await?;
    let records = depot.list_stagings(&agent.id).await?;
    print_json(&records)
}

async fn cmd_unstage(depot: &Depot, identifier: &str, target: &str) -> Result<()> {
    let agent = depot.find_agent(identifier).await?;
    match depot.unstage(&agent.id, target).await? {
        Some(record) => print_json(&record),
        None => anyhow::bail!(
            "No active staging for {} on target '{}'",
            agent.display_name(),
            target
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_state::ValidationStatus;
    use serde_json::json;

    async fn test_depot(workdir: &Path) -> Depot {
        let handle = SurrealHandle::setup_db().await.unwrap();
        let config = DepotConfig::default()
            .with_workdir(workdir)
            .with_skip_vcs(true);
        Depot::with_surreal(
            config,
            Arc::new(handle),
            Arc::new(depot_agents::demo_catalog()),
        )
    }

    fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    fn stats_card() -> Value {
        json!({
            "name": "stats-demo",
            "version": "0.1.0",
            "agent_type": "demo",
            "code_source": {"repo": "https://example.invalid/agents-demo.git"},
            "entrypoint": "agents_demo.stats_agent:StatsDemoAgent",
            "validation_inputs": {"values": [1, 2, 3]}
        })
    }

    #[tokio::test]
    async fn test_register_stage_run_validate() {
        let temp_dir = tempfile::tempdir().unwrap();
        let depot = test_depot(&temp_dir.path().join("agents")).await;

        let card = write_json(temp_dir.path(), "card.json", &stats_card());
        cmd_register(&depot, &card).await.unwrap();

        let agent = depot.find_agent("stats-demo@0.1.0").await.unwrap();
        assert_eq!(
            agent.sample_inputs.as_ref().and_then(|m| m.get("values")),
            Some(&json!([1, 2, 3]))
        );

        cmd_stage(&depot, "stats-demo", "dev").await.unwrap();
        let inputs = write_json(temp_dir.path(), "inputs.json", &json!({"values": [2, 4]}));
        cmd_run(&depot, "stats-demo", "dev", Some(inputs.as_path()))
            .await
            .unwrap();

        cmd_validate(&depot, "stats-demo", Some(0.5)).await.unwrap();
        let validated = depot.get_agent(&agent.id).await.unwrap();
        assert_eq!(validated.validation.status, ValidationStatus::Validated);
        assert_eq!(validated.validation.score, Some(0.5));
    }

    #[tokio::test]
    async fn test_unstage_then_run_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let depot = test_depot(&temp_dir.path().join("agents")).await;
        let card = write_json(temp_dir.path(), "card.json", &stats_card());
        cmd_register(&depot, &card).await.unwrap();

        cmd_stage(&depot, "stats-demo", "dev").await.unwrap();
        cmd_unstage(&depot, "stats-demo", "dev").await.unwrap();

        let err = cmd_run(&depot, "stats-demo", "dev", None).await.unwrap_err();
        assert!(format!("{err:#}").contains("no ready staging"));
        assert!(cmd_unstage(&depot, "stats-demo", "dev").await.is_err());
    }

    #[test]
    fn test_inputs_must_be_an_object() {
        let temp_dir = tempfile::tempdir().unwrap();
        let array = write_json(temp_dir.path(), "array.json", &json!([1, 2, 3]));
        let err = read_inputs(Some(array.as_path())).unwrap_err();
        assert!(err.to_string().contains("JSON object"));

        let object = write_json(temp_dir.path(), "object.json", &json!({"values": [1]}));
        let inputs = read_inputs(Some(object.as_path())).unwrap();
        assert_eq!(inputs.get("values"), Some(&json!([1])));

        assert!(read_inputs(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stage_without_code_source_reports_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let depot = test_depot(&temp_dir.path().join("agents")).await;
        let card = write_json(
            temp_dir.path(),
            "card.json",
            &json!({"name": "orphan", "version": "1", "entrypoint": "agents_demo.greeter:greet"}),
        );
        cmd_register(&depot, &card).await.unwrap();

        let err = cmd_stage(&depot, "orphan", "dev").await.unwrap_err();
        assert!(err.to_string().contains("failed"));
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "depot",
            "--skip-vcs",
            "--workdir",
            "/tmp/depot",
            "run",
            "stats-demo",
            "--target",
            "dev",
        ])
        .unwrap();
        assert!(cli.skip_vcs);
        assert_eq!(cli.workdir.as_deref(), Some(Path::new("/tmp/depot")));
        assert!(matches!(cli.command, Commands::Run { .. }));
    }
}
