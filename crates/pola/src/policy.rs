//! Path authorization.
//!
//! The evaluator is a pure function of the request, the configuration and a
//! snapshot of the session grants. It performs no I/O and mutates nothing;
//! prompting and auditing belong to the [`Gate`](crate::Gate).
//!
//! ## Matching
//!
//! Static mode authorizes a path when it occurs *anywhere* inside the command
//! line (reads) or the write allow-list (writes). There is no tokenizing and
//! no canonicalization, so `a` is readable under `cat abc`. This is the
//! long-standing behaviour launchers and users rely on and is kept as is.

use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::config::{Mode, PolicyConfig};
use crate::request::{AccessMode, AccessRequest, strip_brackets};
use crate::session::GrantState;

/// What the user is asked to approve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AskKind {
    /// Read a file
    Read,
    /// Write a file
    Write,
    /// Read and write a file
    ReadWrite,
    /// Open a directory for listing
    Directory,
}

impl AskKind {
    /// Whether an "always" answer may escalate session grants for this kind.
    pub fn escalates(&self) -> bool {
        !matches!(self, AskKind::Directory)
    }
}

impl From<AccessMode> for AskKind {
    fn from(mode: AccessMode) -> Self {
        match mode {
            AccessMode::ReadOnly => AskKind::Read,
            AccessMode::WriteOnly => AskKind::Write,
            AccessMode::ReadWrite => AskKind::ReadWrite,
        }
    }
}

impl fmt::Display for AskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AskKind::Read => "read",
            AskKind::Write => "write",
            AskKind::ReadWrite => "read and write",
            AskKind::Directory => "directory",
        })
    }
}

/// The evaluator's verdict for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Forward the call, operating on this path.
    Allow(PathBuf),
    /// Refuse the call.
    Deny,
    /// Ask the user. Only produced in interactive mode.
    AskUser(AskKind),
}

impl Decision {
    /// Returns true if the decision is `Allow`.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Byte-wise substring test with `strstr` semantics (the empty needle
/// matches everything).
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

fn in_command_line(path: &Path, config: &PolicyConfig) -> bool {
    config
        .command_line
        .as_ref()
        .is_some_and(|cmd| contains(cmd.as_bytes(), path.as_os_str().as_bytes()))
}

/// Decide an `open` request.
pub fn evaluate_open(
    request: &AccessRequest<'_>,
    config: &PolicyConfig,
    grants: GrantState,
) -> Decision {
    let path = request.path;
    match config.mode {
        Mode::Static => match request.mode {
            AccessMode::ReadOnly => {
                if in_command_line(path, config) {
                    Decision::Allow(path.to_path_buf())
                } else {
                    Decision::Deny
                }
            }
            AccessMode::WriteOnly | AccessMode::ReadWrite => {
                if let Some(inner) = strip_brackets(path) {
                    return Decision::Allow(inner.to_path_buf());
                }
                let listed = config
                    .allowed_writes
                    .as_bytes()
                    .is_some_and(|list| contains(list, path.as_os_str().as_bytes()));
                if listed {
                    Decision::Allow(path.to_path_buf())
                } else {
                    Decision::Deny
                }
            }
        },
        Mode::Interactive => {
            let granted = match request.mode {
                AccessMode::ReadOnly => grants.reads,
                AccessMode::WriteOnly => grants.writes,
                AccessMode::ReadWrite => grants.reads && grants.writes,
            };
            if granted {
                Decision::Allow(path.to_path_buf())
            } else {
                Decision::AskUser(request.mode.into())
            }
        }
    }
}

/// Decide an `opendir` request.
///
/// Directories have no write variant and no session grant: static mode
/// matches the command line, interactive mode always asks.
pub fn evaluate_opendir(path: &Path, config: &PolicyConfig) -> Decision {
    match config.mode {
        Mode::Static if in_command_line(path, config) => Decision::Allow(path.to_path_buf()),
        Mode::Static => Decision::Deny,
        Mode::Interactive => Decision::AskUser(AskKind::Directory),
    }
}
