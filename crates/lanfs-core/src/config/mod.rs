//! Configuration management.
//!
//! Server configuration is a small TOML file; every field has a default so
//! a missing file or a partial file both work. The CLI overlays flags on
//! top of whatever was loaded.
//!
//! ```toml
//! root = "/srv/shared"
//! tcp_port = 9999
//! udp_port = 9998
//! credentials_file = "authorized_users"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory tree exposed to clients
    pub root: PathBuf,
    /// File protocol port (TCP); 0 binds an ephemeral port
    pub tcp_port: u16,
    /// Discovery port (UDP); 0 binds an ephemeral port
    pub udp_port: u16,
    /// Path to the `username password` credentials file
    pub credentials_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./shared"),
            tcp_port: crate::DEFAULT_TCP_PORT,
            udp_port: crate::DEFAULT_DISCOVERY_PORT,
            credentials_file: PathBuf::from("authorized_users"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tcp_port, crate::DEFAULT_TCP_PORT);
        assert_eq!(config.udp_port, crate::DEFAULT_DISCOVERY_PORT);
        assert_eq!(config.credentials_file, PathBuf::from("authorized_users"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "root = \"/srv/data\"\ntcp_port = 4000\n").expect("write");

        let config = Config::load(&path).expect("load");
        assert_eq!(config.root, PathBuf::from("/srv/data"));
        assert_eq!(config.tcp_port, 4000);
        assert_eq!(config.udp_port, crate::DEFAULT_DISCOVERY_PORT);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tcp_port = \"not a number\"").expect("write");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
