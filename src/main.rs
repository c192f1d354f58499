//! pit - a minimal version control tool
//!
//! This is the main entry point for the pit command-line interface.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pit::config::PitConfig;
use pit::storage::{InitStatus, Repository, StagingMode, StorageError, StorageResult};

/// pit - content-addressed snapshots of your files
#[derive(Parser)]
#[command(name = "pit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run as if pit was started in this directory
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the repository in the working directory
    Init,
    /// Stage files for the next commit
    Add {
        /// Files to stage
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Keep earlier staged entries for the same path instead of replacing them
        #[arg(long)]
        keep_duplicates: bool,
    },
    /// Record the staged files as a new commit
    #[command(group(ArgGroup::new("msg").required(true).args(["message", "text"])))]
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
        /// Commit message (positional form)
        text: Option<String>,
    },
    /// Show commit history from HEAD
    Log {
        /// Number of commits to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show the changes a commit made relative to its parent
    Diff {
        /// Commit digest, abbreviated digest, or HEAD
        commit: String,
    },
    /// List staged files
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = PitConfig::new(&cli.dir).verbose(cli.verbose);
    init_logging(&config);

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &PitConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, config: PitConfig) -> StorageResult<()> {
    match command {
        Commands::Init => {
            let (repo, status) = Repository::init(&config)?;
            match status {
                InitStatus::Created => println!(
                    "Initialized empty pit repository in {}",
                    repo.layout().root.display()
                ),
                InitStatus::AlreadyInitialized => println!("Already initialized pit in this repo"),
            }
            Ok(())
        }
        Commands::Add {
            paths,
            keep_duplicates,
        } => {
            let config = if keep_duplicates {
                config.staging_mode(StagingMode::AppendDuplicates)
            } else {
                config
            };
            let repo = Repository::open_with_config(&config)?;
            for path in paths {
                let entry = repo.add(&path)?;
                println!("added {} ({})", entry.path, entry.id.short());
            }
            Ok(())
        }
        Commands::Commit { message, text } => {
            let repo = Repository::open_with_config(&config)?;
            let message = message.or(text).unwrap_or_default();
            let commit = repo.commit(message)?;
            println!("[{}] {}", commit.id.short(), commit.summary());
            Ok(())
        }
        Commands::Log { limit } => {
            let repo = Repository::open_with_config(&config)?;
            let commits = repo.log(limit)?;
            if commits.is_empty() {
                println!("No commits yet");
            }
            for (i, commit) in commits.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print!("{}", commit);
            }
            Ok(())
        }
        Commands::Diff { commit } => {
            let repo = Repository::open_with_config(&config)?;
            let report = match repo.resolve(&commit) {
                Ok(Some(id)) => repo.diff(&id)?,
                Ok(None) => None,
                Err(StorageError::InvalidObjectId(e)) => {
                    println!("Commit not found: {} ({})", commit, e);
                    return Ok(());
                }
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };

            match report {
                Some(report) => print!("{}", report),
                None => println!("Commit not found: {}", commit),
            }
            Ok(())
        }
        Commands::Status => {
            let repo = Repository::open_with_config(&config)?;
            let staged = repo.staged()?;
            if staged.is_empty() {
                println!("Nothing staged");
            }
            for entry in staged {
                println!("{}", entry);
            }
            Ok(())
        }
    }
}
