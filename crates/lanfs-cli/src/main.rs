//! Lanfs CLI - LAN file sharing
//!
//! Runs the sharing server over a directory, or scans the local network
//! for running servers.
//!
//! ## Quick Start
//!
//! ```bash
//! # Serve a directory
//! lanfs serve --root ./shared
//!
//! # Find servers on the network (on another device)
//! lanfs scan
//! ```

#![allow(clippy::doc_markdown)]

use anyhow::Result;
use clap::Parser;

mod commands;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => commands::serve::run(args).await,
        Command::Scan(args) => commands::scan::run(args).await,
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,lanfs=info,lanfs_core=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
