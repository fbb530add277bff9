//! `conclave`: drives one design through the competitive pipeline.
//!
//! Real LLM/sandbox/analyzer providers are out of scope for this binary
//! (spec §1's collaborator boundary) — every run here wires the mock
//! collaborators from `conclave-collab`, which is enough to exercise the
//! full graph end to end offline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use conclave_checkpoint::{CheckpointSaver, FileCheckpointSaver, InMemoryCheckpointSaver};
use conclave_collab::{MockAnalyzer, MockLlmAdapter, MockSandbox, MockToolCallingLlmAdapter, NullVaultIndexer};
use conclave_pipeline::graph_def::Collaborators;
use conclave_pipeline::{Pipeline, PipelineConfig, PipelineOutcome};
use conclave_store::{DesignStore, FileDesignStore, InMemoryDesignStore};

#[derive(Parser)]
#[command(name = "conclave")]
#[command(about = "Competitive multi-agent CAD design pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML pipeline config. Falls back to a small built-in demo
    /// config (one proposal agent, debate and human approval off).
    #[arg(long, env = "CONCLAVE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory to persist checkpoints and finalized designs under. When
    /// omitted, both are in-memory and vanish when the process exits.
    #[arg(long, env = "CONCLAVE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new design from a prompt and run it to completion or to the
    /// first human-approval interrupt.
    Run {
        /// The design request, e.g. "a 50mm cube with a through hole".
        prompt: String,
    },

    /// Resume a design previously suspended awaiting human approval.
    Resume {
        /// The thread id printed by `run` when it stopped for approval.
        thread_id: String,

        /// Approve the winning proposal and advance to the learner.
        #[arg(long, conflicts_with = "reject")]
        approve: bool,

        /// Reject the winning proposal, failing the design.
        #[arg(long)]
        reject: bool,

        /// Feedback recorded alongside a rejection.
        #[arg(long)]
        feedback: Option<String>,
    },
}

fn default_config() -> String {
    r#"
        supervisor_model = "demo-supervisor"
        judge_model = "demo-judge"
        merger_model = "demo-merger"
        proposal_agents = [{ model = "demo-worker" }]
        fidelity_threshold = 70.0
        max_rounds = 2
        debate_enabled = false
        human_approval_required = false
    "#
    .to_string()
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PipelineConfig> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => default_config(),
    };
    Ok(PipelineConfig::from_toml_str(&raw)?)
}

fn demo_collaborators() -> Collaborators {
    let canned_json = r#"{"specification": "demo specification", "key_constraints": [], "critical_dimensions": {}, "manufacturing_notes": []}"#;
    let canned_fidelity = r#"{"llm_score": 85, "text_similarity": 85, "geometric_accuracy": 85, "manufacturing_viability": 85, "reasoning": "plausible geometry"}"#;
    let canned_learning = r#"{"pattern": "straightforward solid", "notes": "no surprises"}"#;

    Collaborators {
        supervisor_llm: Arc::new(MockLlmAdapter::new([canned_json])),
        // Sized for up to `max_rounds` invocations of the demo config above —
        // each round's worker consumes a submit-then-stop pair of turns.
        proposal_llm: Arc::new(MockToolCallingLlmAdapter::new([
            Some("fn build() { cuboid(50.0, 50.0, 50.0) }".to_string()),
            None,
            Some("fn build() { cuboid(50.0, 50.0, 50.0) }".to_string()),
            None,
        ])),
        critic_llm: Arc::new(MockLlmAdapter::new(Vec::<String>::new())),
        judge_llm: Arc::new(MockLlmAdapter::new([canned_fidelity; 4])),
        merger_llm: Arc::new(MockLlmAdapter::unavailable()),
        learner_llm: Arc::new(MockLlmAdapter::new([canned_learning])),
        sandbox: Arc::new(MockSandbox::succeeding("out/demo.stl")),
        analyzer: Arc::new(MockAnalyzer::clean((50.0, 50.0, 50.0))),
        vault: Arc::new(NullVaultIndexer),
    }
}

async fn checkpointer(data_dir: Option<&PathBuf>) -> anyhow::Result<Arc<dyn CheckpointSaver>> {
    match data_dir {
        Some(dir) => Ok(Arc::new(FileCheckpointSaver::new(dir.join("checkpoints")).await?)),
        None => Ok(Arc::new(InMemoryCheckpointSaver::new())),
    }
}

async fn design_store(data_dir: Option<&PathBuf>) -> anyhow::Result<Arc<dyn DesignStore<conclave_pipeline::DesignRecord>>> {
    match data_dir {
        Some(dir) => Ok(Arc::new(FileDesignStore::new(dir.join("designs")).await?)),
        None => Ok(Arc::new(InMemoryDesignStore::new())),
    }
}

fn report(outcome: PipelineOutcome) {
    match outcome {
        PipelineOutcome::Completed(design, _events) => {
            println!("design {} completed", design.id);
            if let Some(code) = &design.final_code {
                println!("final code:\n{code}");
            }
        }
        PipelineOutcome::Failed(design, _events) => {
            println!("design {} failed", design.id);
        }
        PipelineOutcome::AwaitingApproval { thread_id, design, .. } => {
            println!("design {} awaiting human approval", design.id);
            println!("resume with: conclave resume {thread_id} --approve");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let checkpointer = checkpointer(cli.data_dir.as_ref()).await?;
    let store = design_store(cli.data_dir.as_ref()).await?;
    let pipeline = Pipeline::new(config, demo_collaborators(), checkpointer, store)?;

    match cli.command {
        Commands::Run { prompt } => {
            let outcome = pipeline.run(prompt).await?;
            report(outcome);
        }
        Commands::Resume { thread_id, approve, reject, feedback } => {
            let approved = approve && !reject;
            let outcome = pipeline.resume(&thread_id, approved, feedback).await?;
            report(outcome);
        }
    }

    Ok(())
}
