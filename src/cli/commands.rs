use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::category::Category;

#[derive(Parser)]
#[command(name = "gather", about = concat!("gather v", env!("CARGO_PKG_VERSION"), " - every open checkbox in one list"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different vault directory
    #[arg(short = 'C', long = "vault", global = true)]
    pub vault: Option<String>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up a vault in the current directory
    Init(InitArgs),
    /// Re-collect every note and rewrite the aggregate
    Refresh,
    /// Apply edits made in the aggregate back to the notes
    Sync,
    /// Move a task to another time section
    Move(MoveArgs),
    /// Drag a task next to another one
    Reorder(ReorderArgs),
    /// Open the aggregate in $EDITOR (or print its path)
    Open,
    /// List open tasks with their keys and sections
    List,
    /// Manage excluded folders
    Exclude(ExcludeCmd),
    /// Keep the aggregate in sync until interrupted
    Watch,
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Aggregate document path, relative to the vault (default: Tasks.md)
    #[arg(long)]
    pub output: Option<String>,
    /// Folder to leave out of collection (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,
    /// One flat list instead of time sections
    #[arg(long)]
    pub flat: bool,
    /// Overwrite an existing .gather/config.toml
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Ordering args
// ---------------------------------------------------------------------------

/// Section names as typed on the command line
#[derive(Clone, Copy, ValueEnum)]
pub enum SectionArg {
    Today,
    Tomorrow,
    ThisWeek,
    Backlog,
}

impl From<SectionArg> for Category {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Today => Category::Today,
            SectionArg::Tomorrow => Category::Tomorrow,
            SectionArg::ThisWeek => Category::ThisWeek,
            SectionArg::Backlog => Category::Backlog,
        }
    }
}

#[derive(Args)]
pub struct MoveArgs {
    /// Target section
    #[arg(value_enum)]
    pub section: SectionArg,
    /// Aggregate line (1-based) holding the task
    #[arg(long)]
    pub line: usize,
}

#[derive(Args)]
pub struct ReorderArgs {
    /// Aggregate line of the task being dragged
    #[arg(long)]
    pub from: usize,
    /// Aggregate line of the task it is dropped on
    #[arg(long)]
    pub to: usize,
    /// Drop below the target instead of above it
    #[arg(long)]
    pub after: bool,
}

// ---------------------------------------------------------------------------
// Exclude
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ExcludeCmd {
    #[command(subcommand)]
    pub action: ExcludeAction,
}

#[derive(Subcommand)]
pub enum ExcludeAction {
    /// Stop collecting tasks from a folder
    Add {
        /// Folder, relative to the vault
        folder: String,
    },
    /// Collect tasks from a folder again
    Remove {
        /// Folder, relative to the vault
        folder: String,
    },
}
