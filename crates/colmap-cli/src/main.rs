//! colmap CLI
//!
//! Developer tool for building field mappings against local catalogs.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod workspace;

/// colmap - map uploaded file columns onto target fields
#[derive(Parser)]
#[command(name = "colmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "colmap.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new colmap project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Validate configuration, catalogs, scripts and stored patterns
    Validate,

    /// Replay a session script and print the resulting mappings
    Run {
        /// Script path, or name under sessions/
        script: String,

        /// Store the patterns built by `save` steps
        #[arg(long)]
        save: bool,
    },

    /// Manage stored patterns
    Pattern {
        #[command(subcommand)]
        command: PatternCommands,
    },

    /// Show sample values of a source field
    Preview {
        /// Source field name
        field: String,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },

    /// Replay a session script and submit its mappings
    Submit {
        /// Script path, or name under sessions/
        script: String,
    },
}

#[derive(Subcommand)]
enum PatternCommands {
    /// List stored patterns
    List,

    /// Show a stored pattern
    Show {
        /// Pattern id
        id: String,
    },

    /// Delete a stored pattern
    Delete {
        /// Pattern id
        id: String,
    },

    /// Check a stored pattern against the current catalogs
    Check {
        /// Pattern id
        id: String,
    },

    /// Replace a stored pattern with the mappings a session script builds
    Update {
        /// Pattern id
        id: String,

        /// Script path, or name under sessions/
        script: String,

        /// New pattern name (defaults to the script's last save, then the stored name)
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config).await?;
        }
        Commands::Run { script, save } => {
            commands::run::run(&cli.config, &script, save).await?;
        }
        Commands::Pattern { command } => match command {
            PatternCommands::List => {
                commands::pattern::list(&cli.config).await?;
            }
            PatternCommands::Show { id } => {
                commands::pattern::show(&cli.config, &id).await?;
            }
            PatternCommands::Delete { id } => {
                commands::pattern::delete(&cli.config, &id).await?;
            }
            PatternCommands::Check { id } => {
                commands::pattern::check(&cli.config, &id).await?;
            }
            PatternCommands::Update { id, script, name } => {
                commands::pattern::update(&cli.config, &id, &script, name.as_deref()).await?;
            }
        },
        Commands::Preview { field, pages } => {
            commands::preview::run(&cli.config, &field, pages).await?;
        }
        Commands::Submit { script } => {
            commands::submit::run(&cli.config, &script).await?;
        }
    }

    Ok(())
}
