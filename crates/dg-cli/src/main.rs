//! CLI frontend for the Dirigent turn orchestrator.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use dg_progress::EngineType;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dg",
    about = "Dirigent: turn orchestration for interactive stories",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a story interactively
    Play {
        /// Runtime directory holding progress state
        #[arg(short, long, default_value = "runtime")]
        runtime: PathBuf,

        /// Story definition file (JSON)
        #[arg(short, long)]
        story: PathBuf,

        /// Engine to run under: orchestrated or linear
        #[arg(short, long)]
        engine: Option<EngineType>,

        /// Continue from the stored checkpoint
        #[arg(long)]
        resume: bool,

        /// RNG seed for probabilistic events
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Show the stored progress record
    Status {
        /// Runtime directory holding progress state
        #[arg(short, long, default_value = "runtime")]
        runtime: PathBuf,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Switch the stored engine (only at a scene boundary)
    SwitchEngine {
        /// Target engine: orchestrated or linear
        engine: EngineType,

        /// Runtime directory holding progress state
        #[arg(short, long, default_value = "runtime")]
        runtime: PathBuf,
    },

    /// Validate a story file and summarize its acts and events
    CheckStory {
        /// Story definition file (JSON)
        file: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("DIRIGENT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            runtime,
            story,
            engine,
            resume,
            seed,
        } => commands::play::run(&runtime, &story, engine, resume, seed),
        Commands::Status { runtime, json } => commands::status::run(&runtime, json),
        Commands::SwitchEngine { engine, runtime } => commands::switch::run(&runtime, engine),
        Commands::CheckStory { file } => commands::check::run(&file),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
