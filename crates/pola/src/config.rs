//! Policy configuration.
//!
//! A [`PolicyConfig`] is the explicit, typed form of what the launchers hand
//! to the preloaded library through the environment. The gate asks its
//! [`ConfigSource`] for a fresh value on every request, so changes made to the
//! environment between two requests are observed.

use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;

use thiserror::Error;

/// Environment variable holding the launched program's full command line.
pub const CMD_LINE_VAR: &str = "POLA_CMD_LINE";
/// Environment variable holding the explicit write allow-list.
pub const ALLOWED_WRITES_VAR: &str = "POLA_ALLOWED_WRITES";
/// Environment variable selecting interactive (`1`) or static (`0`) mode.
pub const INTERACTIVE_VAR: &str = "POLA_INTERACTIVE";
/// Sentinel value of [`ALLOWED_WRITES_VAR`] meaning "no extra writes".
pub const NO_WRITES_SENTINEL: &str = "-1";

/// Why a configuration could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} is not set")]
    Missing(&'static str),
    /// The mode flag holds something other than `0` or `1`
    #[error("{var} has invalid value {value:?}, expected \"0\" or \"1\"")]
    InvalidMode {
        /// Name of the offending variable
        var: &'static str,
        /// The value found
        value: String,
    },
}

/// Paths that static mode allows to be opened for writing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AllowedWrites {
    /// The `-1` sentinel: only bracketed paths may be written.
    #[default]
    None,
    /// A free-form list; a path is allowed if it occurs anywhere inside it.
    List(OsString),
}

impl AllowedWrites {
    /// Parse the raw variable value, honouring the `-1` sentinel.
    pub fn parse(raw: impl Into<OsString>) -> Self {
        let raw = raw.into();
        if raw == NO_WRITES_SENTINEL {
            AllowedWrites::None
        } else {
            AllowedWrites::List(raw)
        }
    }

    /// Returns the allow-list bytes, if any.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AllowedWrites::None => None,
            AllowedWrites::List(list) => Some(list.as_bytes()),
        }
    }
}

/// Evaluation mode selected by the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Decide from configuration alone.
    Static,
    /// Ask on the terminal, with session-wide escalation.
    Interactive,
}

/// Configuration for one target-process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// The full original command line. Always present in static mode.
    pub command_line: Option<OsString>,
    /// Explicit write allow-list.
    pub allowed_writes: AllowedWrites,
    /// Static or interactive evaluation.
    pub mode: Mode,
}

impl PolicyConfig {
    /// Static-mode configuration.
    pub fn static_mode(command_line: impl Into<OsString>, allowed_writes: AllowedWrites) -> Self {
        Self {
            command_line: Some(command_line.into()),
            allowed_writes,
            mode: Mode::Static,
        }
    }

    /// Interactive-mode configuration.
    pub fn interactive() -> Self {
        Self {
            command_line: None,
            allowed_writes: AllowedWrites::None,
            mode: Mode::Interactive,
        }
    }

    /// Returns true in interactive mode.
    pub fn is_interactive(&self) -> bool {
        self.mode == Mode::Interactive
    }

    /// Build a configuration from a variable lookup function.
    ///
    /// `INTERACTIVE` must be `0` or `1`. Static mode additionally requires
    /// the command line; a missing allow-list reads as the `-1` sentinel.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<OsString>,
    {
        let raw_mode = lookup(INTERACTIVE_VAR).ok_or(ConfigError::Missing(INTERACTIVE_VAR))?;
        let mode = match raw_mode.as_bytes() {
            b"1" => Mode::Interactive,
            b"0" => Mode::Static,
            _ => {
                return Err(ConfigError::InvalidMode {
                    var: INTERACTIVE_VAR,
                    value: raw_mode.to_string_lossy().into_owned(),
                });
            }
        };

        let command_line = lookup(CMD_LINE_VAR);
        if mode == Mode::Static && command_line.is_none() {
            return Err(ConfigError::Missing(CMD_LINE_VAR));
        }

        let allowed_writes = lookup(ALLOWED_WRITES_VAR)
            .map(AllowedWrites::parse)
            .unwrap_or_default();

        Ok(Self {
            command_line,
            allowed_writes,
            mode,
        })
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(std::env::var_os)
    }
}

/// Supplies a [`PolicyConfig`] for each request.
pub trait ConfigSource: Send + Sync {
    /// Load the configuration that applies to the current request.
    fn load(&self) -> Result<PolicyConfig, ConfigError>;
}

/// Reads the process environment on every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn load(&self) -> Result<PolicyConfig, ConfigError> {
        PolicyConfig::from_env()
    }
}

/// A fixed configuration, for embedding and tests.
#[derive(Clone, Debug)]
pub struct FixedSource(Result<PolicyConfig, ConfigError>);

impl FixedSource {
    /// Always yield `config`.
    pub fn new(config: PolicyConfig) -> Self {
        Self(Ok(config))
    }

    /// Always fail with `error`, as a broken environment would.
    pub fn failing(error: ConfigError) -> Self {
        Self(Err(error))
    }
}

impl ConfigSource for FixedSource {
    fn load(&self) -> Result<PolicyConfig, ConfigError> {
        self.0.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<OsString> {
        let map: HashMap<&'static str, OsString> =
            vars.iter().map(|(k, v)| (*k, OsString::from(v))).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_static_config() {
        let config = PolicyConfig::from_lookup(lookup(&[
            (INTERACTIVE_VAR, "0"),
            (CMD_LINE_VAR, "cat notes.txt"),
            (ALLOWED_WRITES_VAR, "out.txt"),
        ]))
        .unwrap();

        assert_eq!(config.mode, Mode::Static);
        assert_eq!(config.command_line, Some(OsString::from("cat notes.txt")));
        assert_eq!(config.allowed_writes, AllowedWrites::List("out.txt".into()));
    }

    #[test]
    fn test_sentinel_means_none() {
        let config = PolicyConfig::from_lookup(lookup(&[
            (INTERACTIVE_VAR, "0"),
            (CMD_LINE_VAR, "ls"),
            (ALLOWED_WRITES_VAR, "-1"),
        ]))
        .unwrap();
        assert_eq!(config.allowed_writes, AllowedWrites::None);
        assert!(config.allowed_writes.as_bytes().is_none());
    }

    #[test]
    fn test_missing_allowed_writes_reads_as_none() {
        let config =
            PolicyConfig::from_lookup(lookup(&[(INTERACTIVE_VAR, "0"), (CMD_LINE_VAR, "ls")]))
                .unwrap();
        assert_eq!(config.allowed_writes, AllowedWrites::None);
    }

    #[test]
    fn test_interactive_needs_no_command_line() {
        let config = PolicyConfig::from_lookup(lookup(&[(INTERACTIVE_VAR, "1")])).unwrap();
        assert!(config.is_interactive());
        assert!(config.command_line.is_none());
    }

    #[test]
    fn test_missing_mode_is_an_error() {
        let err = PolicyConfig::from_lookup(lookup(&[(CMD_LINE_VAR, "ls")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(INTERACTIVE_VAR));
    }

    #[test]
    fn test_invalid_mode_is_an_error() {
        let err = PolicyConfig::from_lookup(lookup(&[(INTERACTIVE_VAR, "yes")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMode { ref value, .. } if value == "yes"));
        assert!(err.to_string().contains("POLA_INTERACTIVE"));
    }

    #[test]
    fn test_static_without_command_line_is_an_error() {
        let err = PolicyConfig::from_lookup(lookup(&[(INTERACTIVE_VAR, "0")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(CMD_LINE_VAR));
    }

    #[test]
    fn test_fixed_source() {
        let source = FixedSource::new(PolicyConfig::interactive());
        assert!(source.load().unwrap().is_interactive());

        let failing = FixedSource::failing(ConfigError::Missing(CMD_LINE_VAR));
        assert!(failing.load().is_err());
    }
}
