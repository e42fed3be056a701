//! Audit trail of refused requests.

use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Records denied requests.
///
/// Recording must never fail the caller: implementations swallow their own
/// errors.
pub trait AuditSink: Send + Sync {
    /// Record that access to `path` was refused.
    fn record_denial(&self, path: &Path);
}

/// Name of the acting user: `USERNAME`, then `USER`, then the numeric uid.
pub fn identity() -> String {
    ["USERNAME", "USER"]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| {
            // SAFETY: getuid has no preconditions and cannot fail.
            let uid = unsafe { libc::getuid() };
            format!("uid {uid}")
        })
}

/// The human-readable audit line for a denial.
pub fn denial_message(user: &str, path: &Path) -> String {
    format!(
        "User {} requested non-authorized access to {}",
        user,
        path.display()
    )
}

/// Writes denials to the system log at `LOG_AUTHPRIV | LOG_NOTICE`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyslogAudit;

impl AuditSink for SyslogAudit {
    fn record_denial(&self, path: &Path) {
        let user = identity();
        let message = denial_message(&user, path);
        tracing::warn!(
            target: "pola::audit",
            user = %user,
            path = %path.display(),
            "non-authorized access refused"
        );

        // Environment values and paths taken from C strings hold no NUL, but
        // a `Path` built in Rust can; such a line is only traced.
        let Ok(message) = CString::new(message) else {
            return;
        };
        // SAFETY: both pointers are valid NUL-terminated strings for the
        // duration of the call, and the format consumes exactly one `%s`.
        unsafe {
            libc::syslog(
                libc::LOG_AUTHPRIV | libc::LOG_NOTICE,
                c"%s".as_ptr(),
                message.as_ptr(),
            );
        }
    }
}

/// Keeps denials in memory.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    entries: Mutex<Vec<PathBuf>>,
}

impl MemoryAudit {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// The denied paths, oldest first.
    pub fn entries(&self) -> Vec<PathBuf> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAudit {
    fn record_denial(&self, path: &Path) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(path.to_path_buf());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_message() {
        assert_eq!(
            denial_message("alice", Path::new("/etc/passwd")),
            "User alice requested non-authorized access to /etc/passwd"
        );
    }

    #[test]
    fn test_identity_is_never_empty() {
        assert!(!identity().is_empty());
    }

    #[test]
    fn test_syslog_audit_does_not_fail() {
        SyslogAudit.record_denial(Path::new("/etc/shadow"));
    }

    #[test]
    fn test_syslog_audit_skips_interior_nul() {
        SyslogAudit.record_denial(Path::new("bad\0path"));
    }

    #[test]
    fn test_memory_audit() {
        let audit = MemoryAudit::new();
        audit.record_denial(Path::new("a"));
        audit.record_denial(Path::new("b"));
        assert_eq!(
            audit.entries(),
            vec![PathBuf::from("a"), PathBuf::from("b")]
        );
    }
}
