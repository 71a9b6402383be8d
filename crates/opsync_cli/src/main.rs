//! opsync CLI
//!
//! Command-line replica for opsync stores.
//!
//! # Commands
//!
//! - `op` - Apply an op to the local branch
//! - `push` / `pull` / `rebase` / `sync` - Exchange work through a server log
//! - `get` - Print a branch's root value
//! - `log` - Print a branch's history
//! - `dump-log` - Print server log records
//! - `ops` - List registered ops

mod commands;

use clap::{Parser, Subcommand};
use commands::{Context, OutputFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// opsync command-line replica.
#[derive(Parser)]
#[command(name = "opsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Identifier recorded as the source of new commits
    #[arg(global = true, long, default_value = "cli")]
    source: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an op to the local branch and commit the result
    Op {
        /// Path to the store directory
        db: PathBuf,

        /// Op name
        name: String,

        /// Op arguments
        args: Vec<String>,

        /// Parse each argument as JSON instead of taking it as a string
        #[arg(long)]
        json_args: bool,
    },

    /// Append local commits to the server log
    Push {
        /// Path to the store directory
        db: PathBuf,

        /// Path to the server log
        log: PathBuf,
    },

    /// Replay new server log records onto the remote-tracking branch
    Pull {
        /// Path to the store directory
        db: PathBuf,

        /// Path to the server log
        log: PathBuf,
    },

    /// Replay local-only commits on top of the remote-tracking branch
    Rebase {
        /// Path to the store directory
        db: PathBuf,
    },

    /// Pull, rebase, then push
    Sync {
        /// Path to the store directory
        db: PathBuf,

        /// Path to the server log
        log: PathBuf,
    },

    /// Print the root value of a branch as JSON
    Get {
        /// Path to the store directory
        db: PathBuf,

        /// Branch to read
        #[arg(short, long, default_value = "local")]
        branch: String,
    },

    /// Print the history of a branch
    Log {
        /// Path to the store directory
        db: PathBuf,

        /// Branch to read
        #[arg(short, long, default_value = "local")]
        branch: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print server log records
    DumpLog {
        /// Path to the server log
        log: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List registered ops
    Ops,

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays machine-readable.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::new(cli.source, cli.verbose);

    match cli.command {
        Commands::Op {
            db,
            name,
            args,
            json_args,
        } => commands::op::run(&ctx, &db, &name, &args, json_args)?,
        Commands::Push { db, log } => commands::replicate::push(&ctx, &db, &log)?,
        Commands::Pull { db, log } => commands::replicate::pull(&ctx, &db, &log)?,
        Commands::Rebase { db } => commands::replicate::rebase(&ctx, &db)?,
        Commands::Sync { db, log } => commands::replicate::sync(&ctx, &db, &log)?,
        Commands::Get { db, branch } => commands::inspect::get(&db, &branch)?,
        Commands::Log { db, branch, format } => commands::inspect::log(&db, &branch, format)?,
        Commands::DumpLog { log, format } => commands::dump_log::run(&log, format)?,
        Commands::Ops => commands::inspect::ops(),
        Commands::Version => {
            println!("opsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
