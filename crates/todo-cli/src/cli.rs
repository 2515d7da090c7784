use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use todo_core::Priority;

#[derive(Parser)]
#[command(name = "todo")]
#[command(about = "Offline-first to-do list that syncs when the server is reachable")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new to-do item
    #[command(alias = "new")]
    Add {
        /// Item title
        title: Vec<String>,
        /// Priority bucket
        #[arg(short, long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
    },
    /// List items, newest first
    #[command(alias = "ls")]
    List {
        /// Only show open items of this priority, or `completed` for done items
        #[arg(short, long, value_enum)]
        priority: Option<SelectorArg>,
        /// Case-insensitive title filter
        #[arg(short, long)]
        query: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the title or priority of an item
    Edit {
        /// Item ID or unique ID prefix
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New priority
        #[arg(short, long, value_enum)]
        priority: Option<PriorityArg>,
    },
    /// Flip the completion flag of an item
    #[command(alias = "done")]
    Toggle {
        /// Item ID or unique ID prefix
        id: String,
    },
    /// Delete an item
    #[command(alias = "rm")]
    Delete {
        /// Item ID or unique ID prefix
        id: String,
    },
    /// Deliver queued changes, then replace local items with the server list
    Sync,
    /// Deliver queued changes without pulling
    Push,
    /// Show changes not yet confirmed by the server
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show queue depth and endpoint
    Status,
    /// Manage the remote endpoint configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Priority accepted when creating or editing an item.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PriorityArg {
    High,
    Medium,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::High => Self::High,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::Low => Self::Low,
        }
    }
}

/// List selector: a priority bucket or the completed items.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SelectorArg {
    High,
    Medium,
    Low,
    Completed,
}

impl From<SelectorArg> for Priority {
    fn from(value: SelectorArg) -> Self {
        match value {
            SelectorArg::High => Self::High,
            SelectorArg::Medium => Self::Medium,
            SelectorArg::Low => Self::Low,
            SelectorArg::Completed => Self::Completed,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Set the remote API base URL
    SetApiUrl {
        /// Base URL, e.g. http://localhost:8080/api
        url: String,
    },
    /// Remove the remote API base URL (offline only)
    ClearApiUrl,
    /// Drain queued changes at the start of every command
    SetSyncOnStart {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}
