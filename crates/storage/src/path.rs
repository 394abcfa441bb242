//! Path validation and security utilities.
//!
//! Page names arrive from readers and archive entry names arrive from
//! untrusted archives; both are validated here before being joined onto a
//! working directory.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a relative path for security and correctness.
/// Ensures that paths don't escape their root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use folio_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("001.jpg").is_ok());
/// assert!(validate_path("chapter/002.png").is_ok());
/// assert!(validate_path("a/../003.png").is_ok()); // (never leaves the root)
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("wrong/../still-wrong/.././pages//./004.webp/").unwrap(),
///     Path::new("pages/004.webp")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Join an untrusted relative path onto `root`, refusing anything that would
/// resolve outside of it.
pub fn join_within(root: impl AsRef<Path>, relative: impl AsRef<Path>) -> Result<PathBuf> {
    Ok(root.as_ref().join(validate(relative)?))
}

/// Library roots are configured as absolute paths and used verbatim; only
/// reject what can't be a root at all.
pub(crate) fn absolute(path: &Path) -> Result<&Path> {
    let parent_dir = path.components().any(|c| matches!(c, Component::ParentDir));
    if !path.is_absolute() || parent_dir || path.as_os_str().as_encoded_bytes().contains(&0) {
        exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
    }
    Ok(path)
}
