//! pola-i: run one program with interactive consent prompts.
//!
//! Usage:
//!   pola-i [--library PATH] <command> [args...]
//!
//! Every open and opendir of the program is put to the user on the terminal.

use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::process::ExitCode;

use clap::Parser;
use pola_cli::{LibraryArgs, init_tracing};

#[derive(Debug, Parser)]
#[command(name = "pola-i", about = "Run a program, asking before each file access")]
struct Cli {
    #[command(flatten)]
    library: LibraryArgs,

    /// Program to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<OsString>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let mut command = match cli.library.launcher().interactive(&cli.command) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("pola-i: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(program = ?command.get_program(), "executing under pola");
    // Only returns on failure.
    let e = command.exec();
    eprintln!("Error executing file: {e}");
    ExitCode::FAILURE
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_command_keeps_hyphenated_arguments() {
        let cli = Cli::try_parse_from(["pola-i", "ls", "-la", "/tmp"]).unwrap();
        assert_eq!(cli.command, vec!["ls", "-la", "/tmp"]);
        assert!(cli.library.library.is_none());
    }

    #[test]
    fn test_library_flag_before_command() {
        let cli =
            Cli::try_parse_from(["pola-i", "--library", "/opt/libpola_preload.so", "cat", "a"])
                .unwrap();
        assert_eq!(
            cli.library.library.as_deref(),
            Some(std::path::Path::new("/opt/libpola_preload.so"))
        );
        assert_eq!(cli.command, vec!["cat", "a"]);
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["pola-i"]).is_err());
    }
}
