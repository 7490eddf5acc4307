use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "flatdb",
    about = "Inspect and maintain a flatdb document store and its logs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./flatdb.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the store's data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the logs directory
    #[arg(long, global = true)]
    pub logs_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the logs directory and the given collection directories
    Init(InitArgs),
    /// List collections
    Collections,
    /// List the keys of a collection
    Ls(CollectionArgs),
    /// Print a record
    Get(RecordArgs),
    /// Store a new record
    Create(WriteArgs),
    /// Replace an existing record
    Update(WriteArgs),
    /// Delete a record
    Rm(RecordArgs),
    /// Work with log topics and archives
    Log(LogArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub collections: Vec<String>,
}

#[derive(Args)]
pub struct CollectionArgs {
    pub collection: String,
}

#[derive(Args)]
pub struct RecordArgs {
    pub collection: String,
    pub key: String,
}

#[derive(Args)]
pub struct WriteArgs {
    pub collection: String,
    pub key: String,
    /// Document as a JSON object
    pub json: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[command(subcommand)]
    pub action: LogAction,
}

#[derive(Subcommand)]
pub enum LogAction {
    /// Append a line to a topic
    Append { topic: String, line: String },
    /// List topics, optionally with archives
    List {
        #[arg(long)]
        archives: bool,
    },
    /// Print the live contents of a topic
    Show { topic: String },
    /// Snapshot a topic into a new archive
    Compress { topic: String, archive: String },
    /// Print the text captured by an archive
    Decompress { archive: String },
    /// Empty a topic without archiving it
    Truncate { topic: String },
    /// Archive and truncate one topic, or every topic
    Rotate { topic: Option<String> },
    /// Rotate every topic periodically until interrupted
    Watch {
        /// Seconds between sweeps (defaults to `logs.rotation_interval_secs`)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}
