//! Cognode CLI
//!
//! Runs the cognitive graph server and checks model connectivity.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "cognode")]
#[command(author = "Cognode Contributors")]
#[command(version)]
#[command(about = "Question decomposition into a live cognitive graph", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./cognode.json, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default cognode.json
    Init {
        /// Directory to write into (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Start the WebSocket server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,
    },

    /// Send one question to the model to check connectivity
    Ask {
        /// Question to send
        question: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays clean.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Serve { port, host } => commands::serve(config, host, port).await,
        Commands::Ask { question } => commands::ask(config, &question).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        let mut cause = e.source();
        while let Some(inner) = cause {
            eprintln!("  {} {}", "caused by:".dimmed(), inner);
            cause = inner.source();
        }
        std::process::exit(1);
    }
}
