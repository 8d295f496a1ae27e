use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "floe")]
#[command(version)]
#[command(about = "Declarative Snowflake-on-OVH resources: validate manifests and preview plans", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List registered resource and data source types
    Types,

    /// Show the attribute table of one type
    Schema {
        /// Type name (e.g. snowflake_warehouse)
        resource_type: String,
    },

    /// Apply defaults and validate every resource in a manifest
    Validate {
        /// Manifest file (TOML)
        manifest: String,
    },

    /// Preview the actions needed to reach a manifest
    Plan(PlanArgs),

    /// Provider configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, clap::Args)]
pub struct PlanArgs {
    /// Manifest file (TOML)
    pub manifest: String,

    /// Recorded state snapshot (JSON); without it every resource is created
    #[arg(short, long)]
    pub state: Option<String>,

    /// Limit the plan to a type or a single instance (type.label)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Resolve the provider configuration and report what is missing
    Check {
        /// Provider file (defaults to ~/.config/floe/provider.toml)
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Print the default provider file location
    Path,
}
