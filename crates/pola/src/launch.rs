//! Building target-program commands that run under the preload library.
//!
//! Two launchers exist: an interactive one that runs a single program with
//! prompting enabled, and a static mini shell where every line is its own
//! invocation. A shell argument written as `+path` grants write access to
//! `path` for that invocation and is removed from the program's argv.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{ALLOWED_WRITES_VAR, CMD_LINE_VAR, INTERACTIVE_VAR, NO_WRITES_SENTINEL};
use crate::error::{Error, Result};

/// Environment variable the dynamic linker reads.
pub const PRELOAD_VAR: &str = "LD_PRELOAD";
/// Environment variable naming the preload library for the launchers.
pub const LIBRARY_VAR: &str = "POLA_LIBRARY";
/// File name of the preload library.
pub const LIBRARY_FILE: &str = "libpola_preload.so";

/// Locate the preload library: explicit path, then [`LIBRARY_VAR`], then
/// next to the running executable, then the working directory.
pub fn locate_library(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = std::env::var_os(LIBRARY_VAR) {
        return PathBuf::from(path);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(LIBRARY_FILE)))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| Path::new(".").join(LIBRARY_FILE))
}

/// One line typed into the static shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShellLine {
    /// The whole line as typed, used as the authorized command line.
    pub line: String,
    /// Program and arguments, with `+path` grants removed.
    pub argv: Vec<String>,
    /// Paths granted for writing through `+path` arguments.
    pub write_grants: Vec<String>,
}

impl ShellLine {
    /// Parse one line. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut tokens = line.split_whitespace();
        let program = tokens.next()?;

        let mut argv = vec![program.to_string()];
        let mut write_grants = Vec::new();
        for token in tokens {
            match token.strip_prefix('+') {
                Some(path) => write_grants.push(path.to_string()),
                None => argv.push(token.to_string()),
            }
        }

        Some(Self {
            line: line.to_string(),
            argv,
            write_grants,
        })
    }

    /// Returns true if the line asks the shell to quit.
    pub fn is_exit(&self) -> bool {
        self.line.trim_start().starts_with("exit")
    }

    /// The allow-list value: grants joined by spaces, or the `-1` sentinel.
    pub fn allowed_writes(&self) -> String {
        if self.write_grants.is_empty() {
            NO_WRITES_SENTINEL.to_string()
        } else {
            self.write_grants.join(" ")
        }
    }
}

/// Builds [`Command`]s with the policy environment in place.
#[derive(Clone, Debug)]
pub struct Launcher {
    library: PathBuf,
}

impl Launcher {
    /// Create a launcher preloading `library`.
    pub fn new(library: impl Into<PathBuf>) -> Self {
        Self {
            library: library.into(),
        }
    }

    /// The preload library path.
    pub fn library(&self) -> &Path {
        &self.library
    }

    fn base(&self, program: impl AsRef<OsStr>) -> Command {
        let mut command = Command::new(program);
        command.env(PRELOAD_VAR, &self.library);
        command
    }

    /// Command for the interactive launcher.
    pub fn interactive(&self, argv: &[OsString]) -> Result<Command> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Launch("no command given".to_string()))?;

        let command_line = argv
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        let mut command = self.base(program);
        command
            .args(args)
            .env(INTERACTIVE_VAR, "1")
            .env(CMD_LINE_VAR, command_line)
            .env(ALLOWED_WRITES_VAR, NO_WRITES_SENTINEL);
        Ok(command)
    }

    /// Command for one static-shell line.
    pub fn static_line(&self, line: &ShellLine) -> Result<Command> {
        let (program, args) = line
            .argv
            .split_first()
            .ok_or_else(|| Error::Launch("empty command line".to_string()))?;

        let mut command = self.base(program);
        command
            .args(args)
            .env(INTERACTIVE_VAR, "0")
            .env(CMD_LINE_VAR, &line.line)
            .env(ALLOWED_WRITES_VAR, line.allowed_writes());
        Ok(command)
    }
}
