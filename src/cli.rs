use clap::{Parser, Subcommand};

/// taskdeck: personal task lists backed by a hosted database
#[derive(Parser, Debug, Clone)]
#[command(name = "taskdeck", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Path to config file (default: taskdeck.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Project base URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Table holding task rows (default: tasks)
    #[arg(long, global = true)]
    pub table: Option<String>,

    /// Where the signed-in session is stored
    #[arg(long, global = true)]
    pub session_file: Option<String>,

    /// Quiet period before a search is sent, in milliseconds
    #[arg(long, global = true)]
    pub search_debounce_ms: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Sign in with email and password (password from TASKDECK_PASSWORD or stdin)
    Login {
        #[arg(long)]
        email: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Print tasks once and exit
    List {
        /// Only tasks with this status (all, todo, in-progress, done)
        #[arg(long, default_value = "all")]
        status: String,

        /// Case-insensitive title search
        #[arg(long)]
        search: Option<String>,
    },

    /// Open the interactive task view
    Open,
}
