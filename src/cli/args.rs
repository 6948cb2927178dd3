//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Mind-map outline editor: collapsible trees that keep their view state across edits
#[derive(Parser, Debug)]
#[command(name = "mindtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (repeat for more: -d -d -d)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Document file (default: `default_document` from config)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a document with a single root node
    Init {
        /// Name of the root node
        #[arg(long)]
        root: Option<String>,
        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },

    /// Print the tree
    Show {
        /// Expand every node
        #[arg(short, long)]
        all: bool,
        /// Print the serialized document instead of the tree
        #[arg(long, conflicts_with = "all")]
        json: bool,
    },

    /// Add a child node
    Add {
        /// Parent node (id or name)
        parent: String,
        /// Name of the new node
        name: String,
        /// Body content
        #[arg(short, long)]
        body: Option<String>,
    },

    /// Delete a node and its subtree
    Delete {
        /// Node (id or name)
        node: String,
    },

    /// Move a node and its subtree under a new parent
    Move {
        /// Node to move (id or name)
        node: String,
        /// New parent (id or name)
        new_parent: String,
    },

    /// Rename a node or change its body
    Edit {
        /// Node (id or name)
        node: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New body content
        #[arg(short, long, conflicts_with = "interactive")]
        body: Option<String>,
        /// Edit the body in the configured editor
        #[arg(short, long)]
        interactive: bool,
    },

    /// List every node with the given name
    Find {
        name: String,
    },

    /// Show document statistics
    Stats,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
