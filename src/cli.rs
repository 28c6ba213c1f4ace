//! Command-line interface definitions
//!
//! This module defines the CLI structure using clap's derive macros.

use crate::error::ErrorKind;
use crate::VibeError;
use clap::{Parser, Subcommand};

/// Process exit codes
pub mod exit {
    pub const USAGE: i32 = 1;
    pub const INIT: i32 = 10;
    pub const AGENT: i32 = 15;
    pub const SETUP: i32 = 20;
    pub const CONFIG: i32 = 25;
}

/// Vibe CLI application
#[derive(Parser, Debug)]
#[command(
    name = "vibe",
    version,
    about = "Keep AI agent definitions in sync between a canonical store and your projects",
    long_about = "Vibe keeps one canonical library of agent definitions, copies it into projects, merges project edits back, and imports rules from files and web pages."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print the full chain of causes when a command fails
    #[arg(long, global = true)]
    pub verbose_errors: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Copy the agent definitions into the current project and register it
    #[command(about = "Initialize agent definitions in the current directory")]
    Init,

    /// Push this project's definitions to the canonical store and every other project
    #[command(about = "Merge local definitions back and out to all registered projects")]
    Merge,

    /// Overwrite this project's definitions with the canonical store
    #[command(about = "Sync definitions from the canonical store into the current directory")]
    Sync,

    /// Forget registered projects that no longer exist
    #[command(about = "Remove missing projects from the project registry")]
    Clean,

    /// Import rules from a local file or URL
    #[command(about = "Import rules from a file or web page")]
    Import {
        /// Path or http(s) URL to import from
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Overwrite existing rule files without asking
        #[arg(long, short)]
        force: bool,

        /// Import without asking for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Work with agent definitions
    Agent {
        #[command(subcommand)]
        command: Option<AgentCommand>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AgentCommand {
    /// List available agents (default)
    List,

    /// Choose an agent, interactively when none is given
    Select {
        #[arg(value_name = "ID|INDEX|NAME")]
        agent: Option<String>,
    },

    /// Show details for one agent
    Info {
        #[arg(value_name = "ID|INDEX|NAME")]
        agent: String,
    },

    /// Load an agent and record a run
    Run {
        #[arg(value_name = "ID|NAME")]
        agent: String,
    },
}

impl Commands {
    /// Exit code for a failure of this command
    pub fn exit_code(&self, err: &VibeError) -> i32 {
        if err.kind() == ErrorKind::Config {
            return exit::CONFIG;
        }
        if is_setup_failure(err) {
            return exit::SETUP;
        }
        match self {
            Self::Agent { .. } => exit::AGENT,
            Self::Init | Self::Merge | Self::Sync | Self::Clean | Self::Import { .. } => {
                if err.kind() == ErrorKind::Cancelled {
                    exit::USAGE
                } else {
                    exit::INIT
                }
            }
        }
    }
}

fn is_setup_failure(err: &VibeError) -> bool {
    match err {
        VibeError::Operation { op, source, .. } => op == "setup" || is_setup_failure(source),
        _ => false,
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse arguments from an iterator (useful for testing)
    pub fn parse_args_from<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        // Verify the CLI structure is valid
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_agent_subcommands() {
        let cli = Cli::parse_args_from(["vibe", "agent", "info", "2", "--verbose"]);
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Commands::Agent {
                command: Some(AgentCommand::Info {
                    agent: "2".to_string()
                })
            }
        );

        let cli = Cli::parse_args_from(["vibe", "agent"]);
        assert_eq!(cli.command, Commands::Agent { command: None });
    }

    #[test]
    fn test_import_flags() {
        let cli = Cli::parse_args_from(["vibe", "--debug", "import", "rules.md", "--force"]);
        assert!(cli.debug);
        assert_eq!(
            cli.command,
            Commands::Import {
                source: "rules.md".to_string(),
                force: true,
                yes: false,
            }
        );
    }

    #[test]
    fn test_exit_codes() {
        let config = VibeError::config("rulesDirName", "bad");
        let setup = VibeError::operation(
            "init",
            "/tmp/x",
            VibeError::operation("setup", "/tmp/x", VibeError::Other("clone failed".into())),
        );
        let missing = VibeError::not_found("agent", "x");

        assert_eq!(Commands::Init.exit_code(&config), exit::CONFIG);
        assert_eq!(Commands::Init.exit_code(&setup), exit::SETUP);
        assert_eq!(Commands::Init.exit_code(&missing), exit::INIT);
        assert_eq!(
            Commands::Agent { command: None }.exit_code(&missing),
            exit::AGENT
        );
    }
}
