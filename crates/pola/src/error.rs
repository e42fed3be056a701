//! Error types for the pola core.

use thiserror::Error;

/// Errors surfaced by the launchers.
///
/// Access denials are not errors: they are a [`Verdict`](crate::Verdict)
/// and reach the target program as `EACCES`. A bad policy configuration is a
/// [`ConfigError`](crate::ConfigError), which the gate turns into a denial.
#[derive(Debug, Error)]
pub enum Error {
    /// A launcher could not build the command to run
    #[error("launch error: {0}")]
    Launch(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
