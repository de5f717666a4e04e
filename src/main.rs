//! # medrag CLI
//!
//! ## Usage
//!
//! ```bash
//! medrag --config ./config/medrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `medrag index` | Build the vector index from the dataset |
//! | `medrag ask "<question>"` | Answer one question with sources |
//! | `medrag questions` | List the canned evaluation questions |
//! | `medrag eval` | Run one or all evaluation questions |
//! | `medrag stats` | Show what the index was built from |
//! | `medrag serve` | Start the HTTP server and web UI |
//!
//! The query commands (`ask`, `eval`, `serve`) read the generation API key
//! from the environment variable named by `[generation].api_key_env`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use medrag::config::{load_config, Config};
use medrag::context::QueryContext;
use medrag::index_store::IndexError;
use medrag::indexer::IndexOptions;
use medrag::progress::ProgressMode;
use medrag::{ask, eval, indexer, logging, server, stats};

/// Medical transcription question answering with retrieval-augmented generation.
#[derive(Parser)]
#[command(
    name = "medrag",
    about = "Retrieval-augmented question answering over medical transcription samples",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Default: ./config/medrag.toml
    ///
    /// Built-in defaults are used only when this flag is omitted and the
    /// default file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from the dataset.
    ///
    /// Always rebuilds from scratch and replaces any existing index.
    Index {
        /// Dataset CSV (defaults to `[dataset].path`).
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Index directory (defaults to `[index].path`).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Only read the first N rows.
        #[arg(long)]
        limit: Option<usize>,

        /// Show record and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,

        /// Progress on stderr: off, human, or json. Default: human when
        /// stderr is a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Answer a question from the indexed corpus.
    Ask {
        question: String,

        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the canned evaluation questions.
    Questions,

    /// Run evaluation questions through the pipeline.
    Eval {
        /// Question number from `medrag questions`; all when omitted.
        #[arg(long)]
        question: Option<usize>,
    },

    /// Show index statistics.
    Stats,

    /// Start the HTTP server and web UI on `[server].bind`.
    Serve,
}

const DEFAULT_CONFIG: &str = "./config/medrag.toml";

fn read_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let path = Path::new(DEFAULT_CONFIG);
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::default())
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = read_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Index {
            dataset,
            output,
            limit,
            dry_run,
            progress,
        } => {
            let opts = IndexOptions {
                dataset,
                output,
                limit,
                dry_run,
                progress: progress.unwrap_or_else(ProgressMode::default_for_tty),
            };
            indexer::run_index(&config, opts).await?;
        }
        Commands::Ask { question, json } => {
            let ctx = QueryContext::initialize(&config).await?;
            ask::run_ask(&ctx, &question, json).await?;
        }
        Commands::Questions => {
            eval::list_questions();
        }
        Commands::Eval { question } => {
            let ctx = QueryContext::initialize(&config).await?;
            eval::run_eval(&ctx, question).await?;
        }
        Commands::Stats => {
            stats::run_stats(&config.index.path).await?;
        }
        Commands::Serve => {
            server::run_server(&config).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(err) = run(cli).await {
        if let Some(IndexError::NotFound { path }) = err.downcast_ref::<IndexError>() {
            eprintln!("Index not found at {}. Run: medrag index", path.display());
            std::process::exit(2);
        }
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
