use std::path::PathBuf;

use atrium_core::models::{RecordKind, SortDirection, SortField};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "atrium")]
#[command(about = "Inspect record projections and checklist outlines")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional engine config file (JSON)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a records fixture and print the resulting view
    View(ViewArgs),
    /// Apply an edit to a checklist file and print the outline
    Checklist {
        /// JSON file holding an array of checklist items
        file: PathBuf,
        #[command(subcommand)]
        action: ChecklistAction,
        /// Write the edited checklist back to the file
        #[arg(long, global = true)]
        write: bool,
        /// Output as JSON
        #[arg(long, global = true)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output file path (defaults to stdout)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// JSON file holding an array of records
    pub fixture: PathBuf,
    /// User the view is built for
    #[arg(short, long, default_value = "me")]
    pub user: String,
    /// Full-text search query
    #[arg(short, long)]
    pub search: Option<String>,
    /// Show only records carrying this label
    #[arg(short, long)]
    pub label: Option<String>,
    /// Show only records with one of these colors (repeatable)
    #[arg(long = "color", value_name = "COLOR")]
    pub colors: Vec<String>,
    /// Show only records of this kind
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,
    /// Sort field for unpinned records
    #[arg(long, value_enum, default_value_t = SortArg::Updated)]
    pub sort: SortArg,
    /// Sort unpinned records in ascending order
    #[arg(long)]
    pub ascending: bool,
    /// Space to open instead of the personal scope
    #[arg(long, value_name = "SPACE_ID")]
    pub space: Option<String>,
    /// Show the trash instead of active records
    #[arg(long, conflicts_with = "archived")]
    pub trash: bool,
    /// Show archived records instead of active records
    #[arg(long)]
    pub archived: bool,
    /// Show every unpinned record instead of the first page
    #[arg(long)]
    pub all: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistAction {
    /// Mark an item complete
    Complete { index: usize },
    /// Mark an item incomplete
    Uncomplete { index: usize },
    /// Move an item and its children to another position
    Move { from: usize, to: usize },
    /// Remove an item and its children
    Remove { index: usize },
    /// Nest an item (and its children) one level deeper
    Indent { index: usize },
    /// Move an item (and its children) one level out
    Unindent { index: usize },
    /// Collapse or expand an item's children
    Collapse { index: usize },
    /// Sort top-level groups by priority, then due date
    Sort,
    /// Print the outline without changing it
    Show,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum KindArg {
    Text,
    Checklist,
    Spreadsheet,
}

impl From<KindArg> for RecordKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Text => Self::Text,
            KindArg::Checklist => Self::Checklist,
            KindArg::Spreadsheet => Self::Spreadsheet,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SortArg {
    Title,
    Created,
    Updated,
    Date,
}

impl From<SortArg> for SortField {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Title => Self::Title,
            SortArg::Created => Self::CreatedAt,
            SortArg::Updated => Self::UpdatedAt,
            SortArg::Date => Self::RecordDate,
        }
    }
}

impl ViewArgs {
    pub const fn sort_direction(&self) -> SortDirection {
        if self.ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }
}
