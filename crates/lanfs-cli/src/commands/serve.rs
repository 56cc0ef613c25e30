//! Serve command implementation.

use anyhow::{Context, Result};

use lanfs_core::config::Config;
use lanfs_core::server::Server;

use super::ServeArgs;

/// Run the serve command.
pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            tracing::info!("loaded configuration from {}", path.display());
            config
        }
        None => Config::default(),
    };

    if let Some(root) = args.root {
        config.root = root;
    }
    if let Some(port) = args.tcp_port {
        config.tcp_port = port;
    }
    if let Some(port) = args.udp_port {
        config.udp_port = port;
    }
    if let Some(credentials) = args.credentials {
        config.credentials_file = credentials;
    }

    let server = Server::bind(&config)
        .await
        .context("failed to start server")?;

    println!(
        "Serving {} on {} (discovery on udp/{})",
        config.root.display(),
        server.local_addr()?,
        server.discovery_addr()?.port(),
    );

    server.run().await.context("server stopped unexpectedly")
}
