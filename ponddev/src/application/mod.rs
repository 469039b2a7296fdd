pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use pond_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Upload {
            inputs,
            options,
            reorder,
            cancel,
            record,
            out,
        } => handlers::handle_upload(inputs, options, reorder, cancel, record, out),
        Commands::Replay { log, options } => handlers::handle_replay(log, options),
        Commands::Plan { file, chunk_size } => handlers::handle_plan(file, chunk_size),
    }
}
