//! Shared plumbing for the pola launchers.

use std::path::PathBuf;

use clap::Args;
use pola::launch::{Launcher, locate_library};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Options common to both launchers.
#[derive(Debug, Args)]
pub struct LibraryArgs {
    /// Path to libpola_preload.so (defaults to $POLA_LIBRARY, then the
    /// launcher's own directory)
    #[arg(long, value_name = "PATH")]
    pub library: Option<PathBuf>,
}

impl LibraryArgs {
    /// Build a launcher for the selected library.
    pub fn launcher(&self) -> Launcher {
        let launcher = Launcher::new(locate_library(self.library.as_deref()));
        tracing::debug!(library = %launcher.library().display(), "using preload library");
        launcher
    }
}

/// Initialize tracing on stderr so it never mixes with the target's stdout.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_explicit_library_wins() {
        let args = LibraryArgs {
            library: Some(PathBuf::from("/opt/pola/libpola_preload.so")),
        };
        assert_eq!(
            args.launcher().library(),
            Path::new("/opt/pola/libpola_preload.so")
        );
    }
}
