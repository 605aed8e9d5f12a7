//! # choff CLI
//!
//! Segments conversation text, embeds and classifies each segment, and
//! records cross-segment resonance in SQLite.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `choff init` | Create the SQLite database and run schema migrations |
//! | `choff process [FILE]` | Process text from a file (or stdin) as a new conversation |
//! | `choff segments <id>` | Print a conversation's segments and labels |
//! | `choff annotations <id>` | Print a conversation's annotations per segment |
//! | `choff serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! choff init --config ./config/choff.toml
//! echo "We observed a failure. The theory explains it." | choff process
//! choff process notes.txt --threshold 0.3 --json
//! choff segments 1
//! choff serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use choff::{config, get, ingest, migrate, server};

/// Conversation segment analysis: classification, embeddings, and resonance.
#[derive(Parser)]
#[command(name = "choff", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/choff.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Process text as a new conversation.
    ///
    /// The text is split on `.` into segments. Each segment is embedded,
    /// classified, and compared against its siblings for resonance.
    Process {
        /// Input file. Reads stdin when omitted.
        file: Option<PathBuf>,

        /// Similarity threshold for resonance matches, overriding `[resonance].threshold`.
        #[arg(long)]
        threshold: Option<f32>,

        /// Conversation title. Derived from the text when omitted.
        #[arg(long)]
        title: Option<String>,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a conversation's segments with their labels.
    Segments {
        /// Conversation id.
        id: i64,
    },

    /// Print a conversation's annotations grouped by segment.
    Annotations {
        /// Conversation id.
        id: i64,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "choff=debug,choff_core=debug"
    } else {
        "choff=info,choff_core=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Process {
            file,
            threshold,
            title,
            json,
        } => {
            ingest::run_process(&cfg, file.as_deref(), threshold, title.as_deref(), json).await?;
        }
        Commands::Segments { id } => {
            get::run_segments(&cfg, id).await?;
        }
        Commands::Annotations { id } => {
            get::run_annotations(&cfg, id).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
