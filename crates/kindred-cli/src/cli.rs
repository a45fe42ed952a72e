//! CLI command definitions and argument parsing.

use crate::config::OutputFormat;
use clap::{Parser, Subcommand};

/// Kindred CLI - Record people and grow family trees by mutual consent.
#[derive(Debug, Parser)]
#[command(name = "kindred")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// SQLite database path
    #[arg(short, long, global = true, env = "KINDRED_DATABASE")]
    pub database: Option<String>,

    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => OutputFormat::Table,
            CliFormat::Json => OutputFormat::Json,
            CliFormat::Quiet => OutputFormat::Quiet,
        }
    }
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage people in the registry
    Person(PersonArgs),

    /// Propose that someone is one of your relatives
    Propose(ProposeArgs),

    /// Approve a connection request
    Approve(DecisionArgs),

    /// Reject a connection request and everything tied to it
    Reject(DecisionArgs),

    /// List connection requests
    Requests(RequestsArgs),

    /// Show a person's direct relatives
    Relations(HandleArgs),

    /// Lay out a person's relatives around them
    Tree(HandleArgs),

    /// Show the family a person belongs to
    Family(HandleArgs),

    /// Check the whole registry for inconsistencies
    Audit,
}

/// Arguments for the person command.
#[derive(Debug, Parser)]
pub struct PersonArgs {
    #[command(subcommand)]
    pub action: PersonAction,
}

/// Person actions.
#[derive(Debug, Subcommand)]
pub enum PersonAction {
    /// Register a new person in a family of their own
    Add {
        /// Unique handle
        handle: String,

        /// First name
        #[arg(long)]
        first_name: String,

        /// Last name
        #[arg(long)]
        last_name: String,

        /// Sex (male or female)
        #[arg(long)]
        sex: String,

        /// Photo URL
        #[arg(long, default_value = "")]
        photo: String,
    },

    /// Show a person by id
    Show {
        /// Person id
        id: String,
    },

    /// Look up a person by handle
    Find {
        /// Handle
        handle: String,
    },

    /// Remove a person and detach them from their relatives
    Remove {
        /// Handle
        handle: String,
    },
}

/// Arguments for the propose command.
#[derive(Debug, Parser)]
pub struct ProposeArgs {
    /// Handle of the person you are acting as
    #[arg(long = "as")]
    pub actor: String,

    /// Handle of the proposed relative
    pub target: String,

    /// What the target is to you (father, mother, spouse, brother, sister, son, daughter)
    pub relation: String,
}

/// Arguments for the approve and reject commands.
#[derive(Debug, Parser)]
pub struct DecisionArgs {
    /// Handle of the person you are acting as
    #[arg(long = "as")]
    pub actor: String,

    /// Request id
    pub request: String,
}

/// Arguments for the requests command.
#[derive(Debug, Parser)]
pub struct RequestsArgs {
    #[command(subcommand)]
    pub action: RequestsAction,
}

/// Request listings.
#[derive(Debug, Subcommand)]
pub enum RequestsAction {
    /// Requests that involve a person without being theirs
    Incoming(HandleArgs),

    /// Proposals a person started
    Outgoing(HandleArgs),

    /// Requests still waiting for a person's approval
    Awaiting(HandleArgs),

    /// Show a request together with its satellites
    Show {
        /// Request id
        id: String,
    },
}

/// A single person argument.
#[derive(Debug, Parser)]
pub struct HandleArgs {
    /// Handle
    pub handle: String,
}
