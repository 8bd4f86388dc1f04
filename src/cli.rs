use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "driftwood")]
#[command(version)]
#[command(about = "Declarative reconciliation for remotely managed resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file declaring the desired objects
    #[arg(short, long, global = true, env = "DRIFTWOOD_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Management API endpoint; without one the remote is emulated locally
    #[arg(long, global = true, env = "DRIFTWOOD_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Bearer token for the management API
    #[arg(long, global = true, env = "DRIFTWOOD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(TargetArgs),

    /// Make the remote objects match the configuration
    Apply(ApplyArgs),

    /// Re-read every tracked object and record drift
    Refresh(TargetArgs),

    /// Adopt an existing remote object into state
    Import {
        /// Local address, e.g. aws_cloudwatch_event_archive.orders
        address: String,

        /// Identifier assigned by the remote system
        id: String,
    },

    /// Delete tracked objects from the remote system
    Destroy(DestroyArgs),

    /// Inspect or edit the state file
    #[command(subcommand)]
    State(StateCommand),

    /// Describe the supported resource types
    Schema {
        /// Resource type to describe; lists all types when omitted
        resource_type: Option<String>,
    },

    /// Check the configuration without contacting the remote system
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Limit to a resource type or a single object (type.name)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Limit to a resource type or a single object (type.name)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of objects reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Limit to a resource type or a single object (type.name)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of objects deleted in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Subcommand)]
pub enum StateCommand {
    /// List tracked objects
    List,

    /// Show the recorded attributes of one object
    Show {
        /// Local address
        address: String,
    },

    /// Stop tracking an object without deleting it remotely
    Rm {
        /// Local address
        address: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::try_parse_from(["driftwood", "apply", "-t", "aws_cloudwatch_event_archive", "--yes", "-j", "8"]).unwrap();
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.target.as_deref(), Some("aws_cloudwatch_event_archive"));
                assert!(args.yes);
                assert!(!args.dry_run);
                assert_eq!(args.jobs, 8);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "driftwood",
            "plan",
            "--config",
            "other.toml",
            "--endpoint",
            "https://manage.example.com",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert_eq!(cli.endpoint.as_deref(), Some("https://manage.example.com"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_import_args() {
        let cli = Cli::try_parse_from(["driftwood", "import", "aws_cloudwatch_event_archive.orders", "archive/orders"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Import { ref address, ref id }
                if address == "aws_cloudwatch_event_archive.orders" && id == "archive/orders"
        ));
    }
}
