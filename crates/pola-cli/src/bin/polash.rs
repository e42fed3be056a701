//! polash: a minimal shell running each line under the static policy.
//!
//! Each line is one invocation. The program may read the paths that appear
//! on the line and write paths given as `<path>` or granted with `+path`
//! (the `+path` arguments are not passed on). `exit` or end of input quits.

use std::io::{self, BufRead, Write};

use anyhow::Context;
use clap::Parser;
use pola::launch::ShellLine;
use pola_cli::{LibraryArgs, init_tracing};

#[derive(Debug, Parser)]
#[command(name = "polash", about = "Minimal shell enforcing least-authority file access")]
struct Cli {
    #[command(flatten)]
    library: LibraryArgs,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let launcher = cli.library.launcher();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        print!("$ ");
        io::stdout().flush().context("failed to write prompt")?;

        line.clear();
        if input.read_line(&mut line).context("failed to read command")? == 0 {
            println!();
            break;
        }

        let Some(parsed) = ShellLine::parse(&line) else {
            continue;
        };
        if parsed.is_exit() {
            break;
        }

        let mut command = match launcher.static_line(&parsed) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("polash: {e}");
                continue;
            }
        };
        tracing::debug!(
            line = %parsed.line,
            allowed_writes = %parsed.allowed_writes(),
            "running"
        );
        match command.status() {
            Ok(status) => tracing::debug!(%status, "finished"),
            Err(e) => eprintln!("Error executing file: {e}"),
        }
    }

    Ok(())
}
