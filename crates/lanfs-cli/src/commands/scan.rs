//! Scan command implementation.

use std::time::Duration;

use anyhow::{Context, Result};

use lanfs_core::discovery;

use super::ScanArgs;

/// Run the scan command.
pub async fn run(args: ScanArgs) -> Result<()> {
    println!();
    println!("Scanning for servers ({}s)...", args.timeout);
    println!();

    tracing::debug!("broadcasting discovery probe on udp/{}", args.port);

    let hosts = discovery::discover(args.port, Duration::from_secs(args.timeout))
        .await
        .context("discovery probe failed")?;

    println!("Servers on the network:");
    println!("{}", "─".repeat(48));

    if hosts.is_empty() {
        println!("  (no servers found)");
        println!("{}", "─".repeat(48));
        return Ok(());
    }

    println!("  {:24}  {:20}", "Hostname", "Address");
    println!("{}", "─".repeat(48));
    for host in hosts {
        println!("  {:24}  {:20}", host.hostname, host.addr.ip());
    }
    println!("{}", "─".repeat(48));

    Ok(())
}
