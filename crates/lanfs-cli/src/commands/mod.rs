//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod scan;
pub mod serve;

/// Lanfs - LAN file sharing
#[derive(Parser)]
#[command(name = "lanfs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Serve a directory to the local network
    Serve(ServeArgs),

    /// Scan the network for running servers
    Scan(ScanArgs),
}

/// Arguments for the serve command.
#[derive(clap::Args)]
pub struct ServeArgs {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to share (overrides the config file)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// File protocol port (TCP)
    #[arg(long)]
    pub tcp_port: Option<u16>,

    /// Discovery port (UDP)
    #[arg(long)]
    pub udp_port: Option<u16>,

    /// Path to the credentials file
    #[arg(long)]
    pub credentials: Option<PathBuf>,
}

/// Arguments for the scan command.
#[derive(clap::Args)]
pub struct ScanArgs {
    /// Discovery port (UDP) to probe
    #[arg(long, default_value_t = lanfs_core::DEFAULT_DISCOVERY_PORT)]
    pub port: u16,

    /// How long to wait for replies, in seconds
    #[arg(short, long, default_value_t = 3)]
    pub timeout: u64,
}
