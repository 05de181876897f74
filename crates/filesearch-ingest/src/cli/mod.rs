//! `filesearch` command-line interface
//!
//! Every command prints its result as pretty JSON on stdout; progress and
//! logs go to stderr.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// filesearch - ingest documents into Gemini File Search stores
#[derive(Parser, Debug)]
#[command(name = "filesearch")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Provider API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Provider base URL
    #[arg(long, env = "FILESEARCH_API_BASE_URL", global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file and import it into a store
    Upload {
        /// File to upload
        path: PathBuf,

        /// Target store id or `fileSearchStores/{id}`
        #[arg(short, long)]
        store: String,

        /// Display name (defaults to the file name)
        #[arg(short, long)]
        display_name: Option<String>,

        /// MIME type (guessed from the extension when omitted)
        #[arg(short, long)]
        mime_type: Option<String>,

        #[command(flatten)]
        chunking: ChunkingArgs,

        /// Block until indexing finishes
        #[arg(short, long)]
        wait: bool,

        /// Wait limit in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Import a previously uploaded file into a store
    Import {
        /// File resource name, `files/{id}`
        file_name: String,

        #[arg(short, long)]
        store: String,

        #[command(flatten)]
        chunking: ChunkingArgs,

        #[arg(short, long)]
        wait: bool,

        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Wait for an operation to finish
    Wait {
        /// Operation name
        operation: String,

        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Fetch an operation's current status once
    Operation {
        /// Operation name
        name: String,
    },

    /// Ask a question grounded on one or more stores
    Search {
        /// Question to answer
        query: String,

        /// Store id or `fileSearchStores/{id}`; repeat for several
        #[arg(short, long = "store", required = true)]
        stores: Vec<String>,

        /// Model id
        #[arg(short, long, default_value = filesearch_common::types::DEFAULT_SEARCH_MODEL)]
        model: String,

        /// Filter over custom metadata, e.g. `author = "kim"`
        #[arg(long)]
        metadata_filter: Option<String>,
    },

    /// List models that can answer searches
    Models,

    /// Manage stores
    Stores {
        #[command(subcommand)]
        command: StoreCommand,
    },

    /// Manage documents in a store
    Documents {
        #[command(subcommand)]
        command: DocumentCommand,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ChunkingArgs {
    /// Maximum tokens per chunk
    #[arg(long, default_value_t = filesearch_common::types::DEFAULT_MAX_TOKENS_PER_CHUNK)]
    pub max_tokens_per_chunk: u32,

    /// Overlapping tokens between chunks
    #[arg(long, default_value_t = filesearch_common::types::DEFAULT_MAX_OVERLAP_TOKENS)]
    pub max_overlap_tokens: u32,
}

#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    /// List stores
    List {
        #[arg(long, default_value_t = 20)]
        page_size: u32,

        #[arg(long)]
        page_token: Option<String>,
    },

    /// Create a store
    Create {
        #[arg(short, long)]
        display_name: Option<String>,
    },

    /// Show one store
    Get { store: String },

    /// Delete a store
    Delete {
        store: String,

        /// Also delete the store's documents
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocumentCommand {
    /// List documents in a store
    List {
        store: String,

        #[arg(long, default_value_t = 20)]
        page_size: u32,

        #[arg(long)]
        page_token: Option<String>,
    },

    /// Show one document
    Get {
        store: String,
        document: String,
    },

    /// Delete a document
    Delete {
        store: String,
        document: String,

        #[arg(short, long)]
        force: bool,
    },
}
