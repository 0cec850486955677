//! Remote path validation.
//!
//! Drive paths are always absolute and `/`-separated regardless of the host
//! platform, so they are handled as strings rather than [`std::path::Path`]s.

use crate::error::{ErrorKind, Result};

/// Characters OneDrive refuses in file and folder names.
const FORBIDDEN: &[char] = &['"', '*', ':', '<', '>', '?', '\\', '|', '\0'];

/// Validates and normalizes a remote folder path.
/// Ensures that paths don't escape the drive root (no `..` traversal).
///
/// # Returns
/// Returns the normalized absolute path (leading `/`, no trailing `/`, no
/// empty or `.` segments), or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid. The drive root itself (`/`) is not a valid target.
///
/// # Examples
///
/// ```
/// use drivesort_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("/Pictures/Camera Roll").is_ok());
/// assert!(validate_path("Camera - Video/2023/04/02").is_ok());
/// // Invalid paths
/// assert!(validate_path("../Documents").is_err());
/// assert!(validate_path("/Camera/what?").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("wrong/../Camera//./2023/").unwrap(),
///     "/Camera/2023"
/// );
/// ```
pub fn validate(path: impl AsRef<str>) -> Result<String> {
    let raw = path.as_ref();
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(raw.to_string()));
                }
            },
            s if s.contains(FORBIDDEN) => exn::bail!(ErrorKind::InvalidPath(raw.to_string())),
            // OneDrive silently strips these, which would make the returned
            // folder path differ from the one we asked for.
            s if s.trim() != s || s.ends_with('.') => exn::bail!(ErrorKind::InvalidPath(raw.to_string())),
            s => segments.push(s),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(raw.to_string())),
        false => Ok(format!("/{}", segments.join("/"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate("/Camera/2023/04/02").unwrap(), "/Camera/2023/04/02");
        assert_eq!(validate("/Camera - Video/2023/04/02").unwrap(), "/Camera - Video/2023/04/02");
        assert_eq!(validate("Pictures").unwrap(), "/Pictures");
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(validate("/a//b//c").unwrap(), "/a/b/c");
        assert_eq!(validate("a/./b/./c").unwrap(), "/a/b/c");
        assert_eq!(validate("/Camera/2023/").unwrap(), "/Camera/2023");
        assert_eq!(validate("a/b/..").unwrap(), "/a");
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate("../Documents").is_err());
        assert!(validate("/a/../../b").is_err());
        assert!(validate("..").is_err());
    }

    #[test]
    fn test_invalid_characters() {
        assert!(validate("/a\0b").is_err());
        assert!(validate("/Camera/what?").is_err());
        assert!(validate("/C:/Users").is_err());
        assert!(validate("/a\\b").is_err());
        assert!(validate("/trailing dot./x").is_err());
        assert!(validate("/ padded /x").is_err());
    }

    #[test]
    fn test_empty_paths() {
        assert!(validate("").is_err());
        assert!(validate("/").is_err());
        assert!(validate("./.").is_err());
        assert!(validate("//").is_err());
    }

    #[test]
    fn test_error_kind() {
        let err = validate("../x").unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidPath("../x".to_string()));
    }
}
