//! Access requests derived from raw `open(2)` arguments.

use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use libc::c_int;

/// How a file is being opened, from `flags & O_ACCMODE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    /// `O_RDONLY`
    ReadOnly,
    /// `O_WRONLY`
    WriteOnly,
    /// `O_RDWR`
    ReadWrite,
}

impl AccessMode {
    /// Classify open flags. Returns `None` for an access mode outside the
    /// three standard ones (on Linux, `O_ACCMODE` itself).
    pub fn from_flags(flags: c_int) -> Option<Self> {
        match flags & libc::O_ACCMODE {
            libc::O_RDONLY => Some(AccessMode::ReadOnly),
            libc::O_WRONLY => Some(AccessMode::WriteOnly),
            libc::O_RDWR => Some(AccessMode::ReadWrite),
            _ => None,
        }
    }

    /// Returns true if the mode includes writing.
    pub fn writes(&self) -> bool {
        !matches!(self, AccessMode::ReadOnly)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessMode::ReadOnly => "read",
            AccessMode::WriteOnly => "write",
            AccessMode::ReadWrite => "read and write",
        })
    }
}

/// A classified `open` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessRequest<'a> {
    /// The path exactly as the program passed it.
    pub path: &'a Path,
    /// The requested access.
    pub mode: AccessMode,
}

impl<'a> AccessRequest<'a> {
    /// Create a request.
    pub fn new(path: &'a Path, mode: AccessMode) -> Self {
        Self { path, mode }
    }

    /// Classify raw `open` arguments.
    ///
    /// Unrecognized flag combinations are returned as an error holding the
    /// raw values so the caller can report them verbatim.
    pub fn classify(path: &'a Path, flags: c_int) -> Result<Self, UnrecognizedRequest<'a>> {
        AccessMode::from_flags(flags)
            .map(|mode| Self::new(path, mode))
            .ok_or(UnrecognizedRequest { path, flags })
    }
}

/// An `open` whose access mode is none of read, write or read-write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnrecognizedRequest<'a> {
    /// The requested path.
    pub path: &'a Path,
    /// The raw flags, unmodified.
    pub flags: c_int,
}

impl fmt::Display for UnrecognizedRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trying to open {} with flags {}!",
            self.path.display(),
            self.flags
        )
    }
}

/// Returns the inner path if `path` has the `<...>` write-grant form.
///
/// Both delimiters must be present and the whole path must be at least two
/// bytes long; anything else is not bracketed.
pub fn strip_brackets(path: &Path) -> Option<&Path> {
    path.as_os_str()
        .as_bytes()
        .strip_prefix(b"<")
        .and_then(|rest| rest.strip_suffix(b">"))
        .map(|inner| Path::new(OsStr::from_bytes(inner)))
}

/// Returns true if `path` has the `<...>` write-grant form.
pub fn is_bracketed(path: &Path) -> bool {
    strip_brackets(path).is_some()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_from_flags() {
        assert_eq!(
            AccessMode::from_flags(libc::O_RDONLY),
            Some(AccessMode::ReadOnly)
        );
        assert_eq!(
            AccessMode::from_flags(libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC),
            Some(AccessMode::WriteOnly)
        );
        assert_eq!(
            AccessMode::from_flags(libc::O_RDWR | libc::O_APPEND),
            Some(AccessMode::ReadWrite)
        );
        assert_eq!(
            AccessMode::from_flags(libc::O_RDONLY | libc::O_CLOEXEC | libc::O_DIRECTORY),
            Some(AccessMode::ReadOnly)
        );
    }

    #[test]
    fn test_unrecognized_access_mode() {
        let path = Path::new("/dev/tty0");
        let err = AccessRequest::classify(path, libc::O_ACCMODE).unwrap_err();
        assert_eq!(err.flags, libc::O_ACCMODE);
        assert_eq!(
            err.to_string(),
            format!("Trying to open /dev/tty0 with flags {}!", libc::O_ACCMODE)
        );
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(AccessMode::ReadOnly.to_string(), "read");
        assert_eq!(AccessMode::WriteOnly.to_string(), "write");
        assert_eq!(AccessMode::ReadWrite.to_string(), "read and write");
        assert!(AccessMode::ReadWrite.writes());
        assert!(!AccessMode::ReadOnly.writes());
    }

    #[test]
    fn test_strip_brackets() {
        assert_eq!(
            strip_brackets(Path::new("<log.txt>")),
            Some(Path::new("log.txt"))
        );
        assert_eq!(
            strip_brackets(Path::new("</tmp/a b>")),
            Some(Path::new("/tmp/a b"))
        );
        assert_eq!(strip_brackets(Path::new("<>")), Some(Path::new("")));
    }

    #[test]
    fn test_malformed_brackets_pass_through() {
        assert!(strip_brackets(Path::new("<log.txt")).is_none());
        assert!(strip_brackets(Path::new("log.txt>")).is_none());
        assert!(strip_brackets(Path::new("log.txt")).is_none());
        assert!(strip_brackets(Path::new("")).is_none());
        // a lone delimiter is not a complete marker
        assert!(!is_bracketed(Path::new("<")));
        assert!(!is_bracketed(Path::new(">")));
    }
}
