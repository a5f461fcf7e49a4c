use aidvice::Result;
use aidvice::commands::{SessionOptions, ask, chat, match_query};
use aidvice::config::{get_config_dir, run_interactive_config, show_config};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aidvice")]
#[command(about = "Medical question assistant backed by a curated Q&A dataset and a chat model")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.aidvice)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct DatasetArgs {
    /// Question/answer CSV file, overriding the configured path
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// Minimum similarity (0-100) for a dataset answer to be shown
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    threshold: Option<u8>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Answer from the dataset only, without contacting the chat model
        #[arg(long)]
        no_fallback: bool,
    },
    /// Ask a single question
    Ask {
        /// The question to ask
        query: String,
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Answer from the dataset only, without contacting the chat model
        #[arg(long)]
        no_fallback: bool,
    },
    /// Show the closest dataset questions and their scores
    Match {
        /// The question to score
        query: String,
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Number of matches to list
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Configure the chat model and dataset
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

fn session_options(
    config_dir: Option<PathBuf>,
    dataset: DatasetArgs,
    no_fallback: bool,
) -> SessionOptions {
    SessionOptions {
        config_dir,
        dataset: dataset.dataset,
        threshold: dataset.threshold,
        no_fallback,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            dataset,
            no_fallback,
        } => {
            chat(&session_options(cli.config_dir, dataset, no_fallback))?;
        }
        Commands::Ask {
            query,
            dataset,
            no_fallback,
        } => {
            ask(&session_options(cli.config_dir, dataset, no_fallback), &query)?;
        }
        Commands::Match {
            query,
            dataset,
            top,
        } => {
            match_query(&session_options(cli.config_dir, dataset, true), &query, top)?;
        }
        Commands::Config { show } => {
            let config_dir = get_config_dir(cli.config_dir.as_deref())?;
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
    }

    Ok(())
}
