//! Request mediation.
//!
//! A [`Gate`] takes one intercepted request from arrival to verdict:
//!
//! ```text
//! Received -> Classified -> Allowed | Denied | AwaitingConsent -> Resolved
//! ```
//!
//! It owns no ambient state. The configuration source, the session grants,
//! the prompter and the audit sink are all injected, so a gate can be driven
//! from tests exactly as the preload shims drive it.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::c_int;

use crate::audit::AuditSink;
use crate::config::{ConfigSource, PolicyConfig};
use crate::consent::{Consent, Prompter, request_consent};
use crate::policy::{Decision, evaluate_open, evaluate_opendir};
use crate::request::AccessRequest;
use crate::session::SessionGrants;

/// The final outcome for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Call the real implementation on this path with the original flags.
    Forward(PathBuf),
    /// Fail with `EACCES`. The denial has already been audited.
    Denied,
}

impl Verdict {
    /// Returns true if the request may proceed.
    pub fn is_forward(&self) -> bool {
        matches!(self, Verdict::Forward(_))
    }
}

/// Mediates `open` and `opendir` requests.
pub struct Gate<S, P, A> {
    source: S,
    grants: Arc<SessionGrants>,
    prompter: P,
    audit: A,
}

impl<S, P, A> fmt::Debug for Gate<S, P, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("grants", &self.grants.snapshot())
            .finish_non_exhaustive()
    }
}

impl<S, P, A> Gate<S, P, A>
where
    S: ConfigSource,
    P: Prompter,
    A: AuditSink,
{
    /// Create a gate over the given collaborators.
    pub fn new(source: S, grants: Arc<SessionGrants>, prompter: P, audit: A) -> Self {
        Self {
            source,
            grants,
            prompter,
            audit,
        }
    }

    /// The session grants this gate consults and escalates.
    pub fn grants(&self) -> &Arc<SessionGrants> {
        &self.grants
    }

    /// The audit sink.
    pub fn audit(&self) -> &A {
        &self.audit
    }

    /// The prompter.
    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Decide an `open(path, flags)` call.
    pub fn authorize_open(&self, path: &Path, flags: c_int) -> Verdict {
        let Some(config) = self.load_config(path) else {
            return self.deny(path);
        };

        let request = match AccessRequest::classify(path, flags) {
            Ok(request) => request,
            Err(unrecognized) => {
                let _ = writeln!(io::stderr(), "{unrecognized}");
                tracing::warn!(
                    path = %path.display(),
                    flags,
                    "unrecognized access mode"
                );
                return self.deny(path);
            }
        };

        let decision = evaluate_open(&request, &config, self.grants.snapshot());
        self.settle(path, decision)
    }

    /// Decide an `opendir(path)` call.
    pub fn authorize_opendir(&self, path: &Path) -> Verdict {
        let Some(config) = self.load_config(path) else {
            return self.deny(path);
        };
        let decision = evaluate_opendir(path, &config);
        self.settle(path, decision)
    }

    fn load_config(&self, path: &Path) -> Option<PolicyConfig> {
        match self.source.load() {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "policy configuration unavailable, refusing"
                );
                None
            }
        }
    }

    fn settle(&self, path: &Path, decision: Decision) -> Verdict {
        match decision {
            Decision::Allow(target) => {
                tracing::debug!(path = %path.display(), target = %target.display(), "allowed");
                Verdict::Forward(target)
            }
            Decision::Deny => self.deny(path),
            Decision::AskUser(kind) => {
                match request_consent(kind, path, &self.grants, &self.prompter) {
                    Consent::Granted => {
                        tracing::debug!(path = %path.display(), %kind, "allowed by user");
                        Verdict::Forward(path.to_path_buf())
                    }
                    Consent::Refused => self.deny(path),
                }
            }
        }
    }

    fn deny(&self, path: &Path) -> Verdict {
        self.audit.record_denial(path);
        Verdict::Denied
    }
}
