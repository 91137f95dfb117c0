use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "canvasport",
    about = "Canvasport: content-addressed project export/import with integrity verification",
    version
)]
pub struct Cli {
    /// Path to canvasport.toml (defaults to ./canvasport.toml when present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a project document from a snapshot directory
    Export {
        /// Snapshot directory containing project.json and canvases/
        snapshot: String,

        /// Output document path
        #[arg(long, short)]
        output: String,

        /// Export timestamp (RFC 3339); defaults to now
        #[arg(long)]
        exported_at: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate a document, printing the pre-import summary
    Inspect {
        /// Project document path
        file: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recompute every digest and compare against the embedded manifest
    Verify {
        /// Project document path
        file: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import a document into a directory-backed store
    Import {
        /// Project document path
        file: String,

        /// Store root (overrides [store] root)
        #[arg(long)]
        store: Option<String>,

        /// Write the import report here (.json for JSON, anything else for text)
        #[arg(long)]
        report: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
