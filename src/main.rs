//! mazekeeper - explore mazes with persistent knowledge
//!
//! Command-line driver over the maze engine and its SQLite archive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mazekeeper::commands::{self, GenerateArgs, KnowledgeOperation, SolveArgs};
use mazekeeper::config::{load_config, MazePaths};

#[derive(Parser)]
#[command(name = "mazekeeper")]
#[command(author, version, about = "Explore mazes and remember what was learned")]
struct Cli {
    /// Use this directory instead of ~/.mazekeeper
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize mazekeeper (first-time setup)
    Init,

    /// Generate a maze and store it
    Generate {
        /// Maze identifier (e.g., "tower-3")
        id: String,

        /// Seed for a reproducible maze
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        rows: Option<usize>,

        #[arg(long)]
        cols: Option<usize>,

        /// Number of keys to place
        #[arg(long)]
        keys: Option<usize>,

        /// Load a text layout (# . S G K) instead of generating
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Lint a stored maze
    Check {
        id: String,
    },

    /// Run an exploration session
    Solve {
        id: String,

        /// Traversal policy: optimistic or conservative
        #[arg(short, long)]
        policy: Option<String>,

        /// Stop after this many transitions
        #[arg(long)]
        max_steps: Option<usize>,

        /// Start without archived knowledge
        #[arg(long)]
        fresh: bool,

        /// Print the walked trail
        #[arg(long)]
        show: bool,
    },

    /// Manage archived knowledge
    Knowledge {
        #[command(subcommand)]
        operation: KnowledgeOperationCli,
    },

    /// Show recorded sessions
    History {
        id: String,

        /// Show the events of one session
        #[arg(short, long)]
        session: Option<String>,
    },
}

// Clap-compatible wrapper enum for CLI parsing
#[derive(Subcommand)]
enum KnowledgeOperationCli {
    /// Write a maze's knowledge to a JSON file
    Export {
        id: String,

        /// Output path (defaults to exports/<id>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace a maze's knowledge with a JSON file
    Import {
        id: String,

        file: PathBuf,
    },

    /// List mazes and how much is known about each
    List,
}

impl From<KnowledgeOperationCli> for KnowledgeOperation {
    fn from(op: KnowledgeOperationCli) -> Self {
        match op {
            KnowledgeOperationCli::Export { id, output } => KnowledgeOperation::Export { id, output },
            KnowledgeOperationCli::Import { id, file } => KnowledgeOperation::Import { id, file },
            KnowledgeOperationCli::List => KnowledgeOperation::List,
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.home {
        Some(root) => MazePaths::at(root),
        None => MazePaths::new()?,
    };
    let config = load_config(&paths)?;
    init_logging(&config.log_level);

    match cli.command {
        Commands::Init => {
            commands::init(&paths)?;
        }
        Commands::Generate {
            id,
            seed,
            rows,
            cols,
            keys,
            from,
        } => {
            let args = GenerateArgs {
                seed,
                rows,
                cols,
                keys,
                from,
            };
            commands::generate_maze(&paths, &id, &args)?;
        }
        Commands::Check { id } => {
            commands::check(&paths, &id)?;
        }
        Commands::Solve {
            id,
            policy,
            max_steps,
            fresh,
            show,
        } => {
            let args = SolveArgs {
                policy,
                max_steps,
                fresh,
                show,
            };
            commands::solve(&paths, &id, &args)?;
        }
        Commands::Knowledge { operation } => {
            commands::knowledge(&paths, operation.into())?;
        }
        Commands::History { id, session } => {
            commands::history(&paths, &id, session.as_deref())?;
        }
    }

    Ok(())
}
