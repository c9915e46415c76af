//! Credential lookup for LOGIN.
//!
//! Sessions only see the [`CredentialStore`] trait; where the table comes from
//! and how passwords are compared stays behind it.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{DepotError, Result};

/// Read-only username/password check consulted by LOGIN.
pub trait CredentialStore: Send + Sync {
    /// True when `user` exists and `password` matches.
    fn verify(&self, user: &str, password: &str) -> bool;
}

/// In-memory plaintext table, immutable after construction.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new<I, U, P>(users: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            users: users.into_iter().map(|(u, p)| (u.into(), p.into())).collect(),
        }
    }

    /// Parses a table of the form:
    ///
    /// ```toml
    /// [users]
    /// alice = "secret"
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DepotError::Credentials(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DepotError::Credentials(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for StaticCredentials {
    /// The built-in table used when no credential file is configured.
    fn default() -> Self {
        Self::new([("user1", "pass1"), ("user2", "pass2")])
    }
}

impl CredentialStore for StaticCredentials {
    fn verify(&self, user: &str, password: &str) -> bool {
        self.users.get(user).is_some_and(|p| p == password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table() {
        let creds = StaticCredentials::default();
        assert!(creds.verify("user1", "pass1"));
        assert!(creds.verify("user2", "pass2"));
        assert!(!creds.verify("user1", "wrongpass"));
        assert!(!creds.verify("user1", "pass2"));
        assert!(!creds.verify("nobody", "pass1"));
    }

    #[test]
    fn parses_toml_table() {
        let creds = StaticCredentials::from_toml_str(
            r#"
            [users]
            alice = "wonderland"
            bob = "builder"
            "#,
        )
        .unwrap();
        assert_eq!(creds.len(), 2);
        assert!(creds.verify("alice", "wonderland"));
        assert!(!creds.verify("user1", "pass1"));
    }

    #[test]
    fn malformed_toml_is_credentials_error() {
        let err = StaticCredentials::from_toml_str("users = 3").unwrap_err();
        assert!(matches!(err, DepotError::Credentials(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.toml");
        std::fs::write(&path, "[users]\ncarol = \"c\"\n").unwrap();
        let creds = StaticCredentials::load(&path).unwrap();
        assert!(creds.verify("carol", "c"));

        assert!(StaticCredentials::load(&dir.path().join("absent.toml")).is_err());
    }
}
