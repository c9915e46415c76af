//! Remote file name validation.
//!
//! Stored files live flat in the storage root, so a name must be exactly one
//! normal path segment.

use std::path::{Component, Path, PathBuf};

use crate::error::{DepotError, Result};

/// Validates a remote file name (no traversal, separators, whitespace or NUL).
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DepotError::InvalidName("empty name".into()));
    }
    if name.contains('\0') {
        return Err(DepotError::InvalidName(format!("{name:?} contains NUL byte")));
    }
    // Commands are whitespace tokenised, so such a name could never be addressed
    if name.chars().any(char::is_whitespace) {
        return Err(DepotError::InvalidName(format!("{name:?} contains whitespace")));
    }
    // Reject both separators regardless of platform
    if name.contains('/') || name.contains('\\') {
        return Err(DepotError::InvalidName(format!("{name} contains a path separator")));
    }
    // Windows drive prefix / ADS
    if name.contains(':') {
        return Err(DepotError::InvalidName(format!("{name} contains ':'")));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(DepotError::InvalidName(format!("{name} is not a plain file name"))),
    }
}

/// Joins a validated name onto a storage root.
pub fn resolve(root: &Path, name: &str) -> Result<PathBuf> {
    validate_name(name)?;
    Ok(root.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        assert!(validate_name("report.txt").is_ok());
        assert!(validate_name("archive.tar.gz").is_ok());
        assert!(validate_name(".hidden").is_ok());
        assert!(validate_name("no_extension").is_ok());
    }

    #[test]
    fn rejects_empty_and_dots() {
        assert!(validate_name("").is_err());
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn rejects_traversal_and_separators() {
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("/etc/passwd").is_err());
        assert!(validate_name("sub/file.txt").is_err());
        assert!(validate_name("sub\\file.txt").is_err());
        assert!(validate_name("C:evil").is_err());
        assert!(validate_name("file\0.txt").is_err());
        assert!(validate_name("two words.txt").is_err());
    }

    #[test]
    fn resolve_stays_under_root() {
        let root = Path::new("/srv/depot");
        assert_eq!(resolve(root, "a.txt").unwrap(), root.join("a.txt"));
        assert!(resolve(root, "../a.txt").is_err());
    }
}
