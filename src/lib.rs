//! Keep a library of AI agent definitions in sync between one canonical store and many
//! projects, and import rules from files and web pages into it.

// Allow println/print in this module as it's a CLI tool
#![allow(clippy::print_stdout)]

pub mod agents;
pub mod cancel;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod fs;
pub mod git;
pub mod ignore;
pub mod import;
pub mod logging;
pub mod models;
pub mod parser;
pub mod paths;
pub mod projects;
pub mod security;
pub mod source;
pub mod storage;
pub mod sync;

pub use cli::{Cli, Commands};
pub use error::{Result, VibeError};

use commands::Session;
use tracing::{debug, info};

/// Run the application with parsed CLI arguments
pub fn run(args: Cli) -> Result<()> {
    let paths = paths::AppPaths::resolve()?;
    logging::init_logging(args.verbose, args.debug, Some(&paths.log_file()));

    debug!(?args, "starting vibe");
    let mut session = Session::load(paths)?;

    match args.command {
        Commands::Init => {
            info!("Running init command");
            commands::run_init(&session)
        }
        Commands::Merge => {
            info!("Running merge command");
            commands::run_merge(&session)
        }
        Commands::Sync => {
            info!("Running sync command");
            commands::run_sync(&session)
        }
        Commands::Clean => {
            info!("Running clean command");
            commands::run_clean(&session)
        }
        Commands::Import { source, force, yes } => {
            info!(source, "Running import command");
            commands::run_import(&session, &source, force, yes)
        }
        Commands::Agent { command } => commands::run_agent(&mut session, command),
    }
}
