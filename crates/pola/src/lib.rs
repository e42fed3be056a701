//! Pola: least-authority mediation of filesystem opens
//!
//! Pola decides, for every `open` and `opendir` issued by an unmodified
//! program, whether the call may reach the real filesystem. A program may
//! read what its command line names and write what it was explicitly handed,
//! or, in interactive mode, whatever the user approves on the terminal.
//!
//! The crate holds the decision engine. The `pola-preload` crate wires it
//! into a process through `LD_PRELOAD`, and `pola-cli` provides launchers.
//!
//! ```rust
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use pola::{AllowedWrites, FixedSource, Gate, MemoryAudit, PolicyConfig};
//! use pola::{ScriptedPrompter, SessionGrants, Verdict};
//!
//! let gate = Gate::new(
//!     FixedSource::new(PolicyConfig::static_mode("cat notes.txt", AllowedWrites::None)),
//!     Arc::new(SessionGrants::new()),
//!     ScriptedPrompter::default(),
//!     MemoryAudit::new(),
//! );
//!
//! assert!(gate.authorize_open(Path::new("notes.txt"), libc::O_RDONLY).is_forward());
//! assert_eq!(gate.authorize_open(Path::new("/etc/passwd"), libc::O_RDONLY), Verdict::Denied);
//! ```

mod audit;
mod config;
mod consent;
mod error;
mod gate;
mod policy;
mod request;
mod session;

pub mod launch;

pub use audit::{AuditSink, MemoryAudit, SyslogAudit, denial_message, identity};
pub use config::{
    ALLOWED_WRITES_VAR, AllowedWrites, CMD_LINE_VAR, ConfigError, ConfigSource, EnvSource,
    FixedSource, INTERACTIVE_VAR, Mode, NO_WRITES_SENTINEL, PolicyConfig,
};
pub use consent::{
    Answer, Consent, Prompter, Question, ScriptedPrompter, TerminalPrompter, read_answer,
    request_consent,
};
pub use error::{Error, Result};
pub use gate::{Gate, Verdict};
pub use policy::{AskKind, Decision, contains, evaluate_open, evaluate_opendir};
pub use request::{AccessMode, AccessRequest, UnrecognizedRequest, is_bracketed, strip_brackets};
pub use session::{GrantState, SessionGrants};
