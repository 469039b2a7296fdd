use clap::{Args, Parser, Subcommand};
use pond_core::options::DEFAULT_CHUNK_SIZE;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "ponddev CLI (alpha)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Upload options; flags win over the JSON config file.
#[derive(Args, Clone, Debug, Default)]
pub struct OptionArgs {
    /// JSON file with upload options (camelCase keys)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// upper bound on files in the session
    #[arg(long)]
    pub max_files: Option<usize>,

    /// bytes per chunk
    #[arg(long)]
    pub chunk_size: Option<u64>,

    /// keep processed files in the session instead of evicting them
    #[arg(long)]
    pub retain: bool,

    /// accepted MIME pattern (repeatable), e.g. "image/*" or ".pdf"
    #[arg(long = "accept")]
    pub accept: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run local files through an upload session over the loopback adapter
    Upload {
        /// files or directories (walked recursively)
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,

        /// deliver chunk acks out of index order
        #[arg(long)]
        reorder: bool,

        /// file name to remove right after its first chunk is acked
        #[arg(long)]
        cancel: Option<String>,

        /// record adapter events to this log for `replay`
        #[arg(long)]
        record: Option<PathBuf>,

        /// write processed files that stay in the session into this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replay a recorded event log and print the resulting session
    Replay {
        log: PathBuf,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Print the chunk plan of one file
    Plan {
        file: PathBuf,

        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
    },
}
