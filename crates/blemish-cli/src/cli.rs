use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "blemish")]
#[command(about = "Capture inspection defects offline and sync them later")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Treat the client as offline (mutations queue without syncing)
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage inspection sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Manage inspected items within a session
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// Manage defect marks on an item
    Defect {
        #[command(subcommand)]
        command: DefectCommands,
    },
    /// Replay queued operations against the server
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Manage cached reference catalogs
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
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

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Start a new inspection session
    Start {
        /// Product catalog id
        #[arg(long, value_name = "ID")]
        product: i64,
        /// Workstation catalog id
        #[arg(long, value_name = "ID")]
        workstation: i64,
        /// Inspector user reference
        #[arg(long, value_name = "NAME")]
        inspector: String,
    },
    /// Pause an open session
    Pause {
        /// Session ID
        id: String,
    },
    /// Resume a paused session
    Resume {
        /// Session ID
        id: String,
    },
    /// Close a session
    Close {
        /// Session ID
        id: String,
    },
    /// Add active time to a session
    Tick {
        /// Session ID
        id: String,
        /// Seconds of active time to add
        #[arg(long, default_value = "60")]
        seconds: i64,
    },
    /// List recent sessions
    List {
        /// Number of sessions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ItemCommands {
    /// Advance to the next inspected unit
    Add {
        /// Owning session ID
        #[arg(long, value_name = "ID")]
        session: String,
        /// Mark the unit defective instead of OK
        #[arg(long)]
        defective: bool,
    },
    /// List a session's items
    List {
        /// Owning session ID
        #[arg(long, value_name = "ID")]
        session: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum DefectCommands {
    /// Mark a defect on an item
    Add {
        /// Owning item ID
        #[arg(long, value_name = "ID")]
        item: String,
        /// Defect type catalog id
        #[arg(long = "type", value_name = "ID")]
        defect_type: i64,
        /// Normalized X position in [0,1]
        #[arg(short)]
        x: f64,
        /// Normalized Y position in [0,1]
        #[arg(short)]
        y: f64,
        /// Optional severity grading
        #[arg(long, value_enum)]
        severity: Option<SeverityArg>,
        /// Optional free-form note
        #[arg(long)]
        note: Option<String>,
    },
    /// Remove a defect mark
    Remove {
        /// Defect ID
        id: String,
    },
    /// List an item's defects
    List {
        /// Owning item ID
        #[arg(long, value_name = "ID")]
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Drain the pending-operation queue now
    Now,
    /// Show queue depth and per-status entity tallies
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Pull products, workstations, and defect types from the server
    Refresh,
    /// List the cached catalogs
    List,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SeverityArg {
    Minor,
    Major,
    Critical,
}

impl From<SeverityArg> for blemish_core::models::Severity {
    fn from(value: SeverityArg) -> Self {
        match value {
            SeverityArg::Minor => Self::Minor,
            SeverityArg::Major => Self::Major,
            SeverityArg::Critical => Self::Critical,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
