use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};

use askline::cli::queue::QueueAction;
use askline::config::BrokerConfig;

#[derive(Debug, Parser)]
#[command(name = "askline")]
#[command(about = "Human-in-the-loop question broker for AI agents")]
#[command(version)]
struct Cli {
    /// Project root holding `.askline/` (default: current directory)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Agent endpoint socket path
    #[arg(long, global = true)]
    agent_socket: Option<PathBuf>,

    /// UI endpoint socket path
    #[arg(long, global = true)]
    ui_socket: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the broker with its agent and UI endpoints
    Serve,
    /// Ask the running broker a question and print the answer
    Ask {
        question: String,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Inspect or edit the prompt queue on disk
    Queue {
        #[command(subcommand)]
        action: QueueCommand,
    },
    /// Show stored exchanges
    History {
        /// Show at most this many
        #[arg(long)]
        limit: Option<usize>,
        /// Delete all stored exchanges
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Subcommand)]
enum QueueCommand {
    List,
    Add { text: String },
    Remove { id: String },
    Clear,
    Enable,
    Disable,
}

impl From<QueueCommand> for QueueAction {
    fn from(cmd: QueueCommand) -> Self {
        match cmd {
            QueueCommand::List => QueueAction::List,
            QueueCommand::Add { text } => QueueAction::Add(text),
            QueueCommand::Remove { id } => QueueAction::Remove(id),
            QueueCommand::Clear => QueueAction::Clear,
            QueueCommand::Enable => QueueAction::Enable,
            QueueCommand::Disable => QueueAction::Disable,
        }
    }
}

fn init_tracing(level: &str) {
    let level = tracing::Level::from_str(level).unwrap_or(tracing::Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("askline: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let project_dir = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let mut config = BrokerConfig::load_project(&project_dir)?;
    if cli.agent_socket.is_some() {
        config.agent_socket = cli.agent_socket;
    }
    if cli.ui_socket.is_some() {
        config.ui_socket = cli.ui_socket;
    }

    let level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    init_tracing(level);

    match cli.command {
        Commands::Serve => askline::cli::serve::run_serve(&config, &project_dir).await?,
        Commands::Ask { question, timeout } => {
            askline::cli::ask::run_ask(&config, &question, timeout).await?
        }
        Commands::Queue { action } => {
            askline::cli::queue::run_queue(&config, &project_dir, action.into()).await?
        }
        Commands::History { limit, clear } => {
            askline::cli::history::run_history(&config, &project_dir, limit, clear).await?
        }
    }
    Ok(())
}
