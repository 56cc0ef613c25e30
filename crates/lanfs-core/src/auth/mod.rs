//! Credential store and username/password verification.
//!
//! The authorized-user list is a static external file of
//! `username password` records, one per line, whitespace-delimited with at
//! most one split so passwords may contain spaces. The store is loaded once
//! at startup, is read-only afterwards, and is shared across connection
//! workers without locking.
//!
//! Verification is intentionally minimal: plain-text exact match, first
//! matching pair wins. No hashing, no lockout, no rate limiting.

use std::path::Path;

use crate::error::Result;

/// An ordered, read-only set of `(username, password)` pairs.
#[derive(Debug, Default, Clone)]
pub struct CredentialStore {
    entries: Vec<(String, String)>,
}

impl CredentialStore {
    /// Load the store from a credentials file.
    ///
    /// A missing file yields an empty store (every verification fails),
    /// matching the behavior of serving with no authorized users.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            tracing::warn!(
                "credentials file {} not found, all logins will be rejected",
                path.display()
            );
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let store = Self::parse(&text);
        tracing::info!(
            "loaded {} credential(s) from {}",
            store.entries.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parse credential records from text, skipping malformed lines.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                let (username, password) = line.split_once(char::is_whitespace)?;
                Some((username.to_string(), password.trim_start().to_string()))
            })
            .collect();

        Self { entries }
    }

    /// Check a username/password pair against the store.
    ///
    /// Scans in order and returns true on the first exact match, false if
    /// the store is empty or exhausted. Pure read, safe to call from any
    /// number of connection workers concurrently.
    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.entries
            .iter()
            .any(|(user, pass)| user == username && pass == password)
    }

    /// Number of credential records in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_matching_pairs() {
        let store = CredentialStore::parse("alice secret\nbob hunter2\n");

        assert!(store.verify("alice", "secret"));
        assert!(store.verify("bob", "hunter2"));
    }

    #[test]
    fn test_verify_rejects_mismatches() {
        let store = CredentialStore::parse("alice secret\n");

        assert!(!store.verify("alice", "wrong"));
        assert!(!store.verify("bob", "secret"));
        assert!(!store.verify("", ""));
    }

    #[test]
    fn test_password_may_contain_spaces() {
        let store = CredentialStore::parse("carol pass with spaces\n");

        assert!(store.verify("carol", "pass with spaces"));
        assert!(!store.verify("carol", "pass"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let store = CredentialStore::parse("justausername\n\nalice secret\n");

        assert_eq!(store.len(), 1);
        assert!(store.verify("alice", "secret"));
        assert!(!store.verify("justausername", ""));
    }

    #[test]
    fn test_empty_store_rejects_everything() {
        let store = CredentialStore::default();

        assert!(store.is_empty());
        assert!(!store.verify("anyone", "anything"));
    }

    #[test]
    fn test_load_missing_file_yields_empty_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CredentialStore::load(&dir.path().join("no_such_file")).expect("load");

        assert!(store.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("authorized_users");
        std::fs::write(&path, "alice secret\nbob hunter2\n").expect("write");

        let store = CredentialStore::load(&path).expect("load");
        assert_eq!(store.len(), 2);
        assert!(store.verify("bob", "hunter2"));
    }
}
