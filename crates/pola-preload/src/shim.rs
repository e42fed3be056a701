//! The interposed `open`, `open64` and `opendir`.
//!
//! Each entry point takes a per-thread reentrancy mark, asks the process gate
//! for a verdict and either calls the real libc function or fails with
//! `EACCES`. Calls that arrive while the same thread is already inside the
//! shim come from the mediation layer itself (printing a prompt, resolving a
//! path) and go straight to libc.

use std::cell::Cell;
use std::ffi::{CStr, CString, OsStr, c_char, c_int};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Arc, OnceLock};

use pola::{
    AuditSink, ConfigSource, EnvSource, Gate, Prompter, SessionGrants, SyslogAudit,
    TerminalPrompter, Verdict,
};

use crate::real::{self, OpenFn, OpendirFn};
use crate::telemetry;

type ProcessGate = Gate<EnvSource, TerminalPrompter, SyslogAudit>;

static GATE: OnceLock<ProcessGate> = OnceLock::new();

fn process_gate() -> &'static ProcessGate {
    GATE.get_or_init(|| {
        telemetry::init();
        tracing::debug!(pid = std::process::id(), "pola gate installed");
        Gate::new(
            EnvSource,
            Arc::new(SessionGrants::new()),
            TerminalPrompter,
            SyslogAudit,
        )
    })
}

thread_local! {
    static IN_SHIM: Cell<bool> = const { Cell::new(false) };
}

/// How a call entered the shim.
enum Entry {
    /// First entry on this thread; the mark is cleared when the guard drops.
    Outer(ShimGuard),
    /// Nested call from inside the shim.
    Nested,
    /// Thread-local storage is gone (thread teardown).
    Unavailable,
}

struct ShimGuard;

impl Drop for ShimGuard {
    fn drop(&mut self) {
        let _ = IN_SHIM.try_with(|mark| mark.set(false));
    }
}

fn enter() -> Entry {
    match IN_SHIM.try_with(|mark| mark.replace(true)) {
        Ok(false) => Entry::Outer(ShimGuard),
        Ok(true) => Entry::Nested,
        Err(_) => Entry::Unavailable,
    }
}

fn set_errno(code: c_int) {
    // SAFETY: __errno_location always returns a valid thread-local pointer.
    unsafe { *libc::__errno_location() = code };
}

fn needs_mode(flags: c_int) -> bool {
    flags & libc::O_CREAT != 0 || flags & libc::O_TMPFILE == libc::O_TMPFILE
}

fn path_of(raw: &CStr) -> &Path {
    Path::new(OsStr::from_bytes(raw.to_bytes()))
}

fn c_path(path: PathBuf) -> Option<CString> {
    CString::new(path.into_os_string().into_vec()).ok()
}

/// Call the real `open`, passing `mode` only when the flags consume it.
unsafe fn call_open(
    real: OpenFn,
    path: *const c_char,
    flags: c_int,
    mode: libc::mode_t,
) -> c_int {
    // SAFETY: caller guarantees `path` is what the program handed us.
    unsafe {
        if needs_mode(flags) {
            real(path, flags, mode)
        } else {
            real(path, flags)
        }
    }
}

/// Mediate one `open` through `gate`.
///
/// # Safety
/// `path` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn intercept_open<S, P, A>(
    gate: &Gate<S, P, A>,
    real: Option<OpenFn>,
    path: *const c_char,
    flags: c_int,
    mode: libc::mode_t,
) -> c_int
where
    S: ConfigSource,
    P: Prompter,
    A: AuditSink,
{
    let Some(real) = real else {
        set_errno(libc::ENOSYS);
        return -1;
    };
    if path.is_null() {
        // Nothing to authorize; libc reports EFAULT.
        // SAFETY: forwarding the caller's arguments unchanged.
        return unsafe { call_open(real, path, flags, mode) };
    }

    // SAFETY: checked non-null above, caller guarantees NUL termination.
    let requested = unsafe { CStr::from_ptr(path) };
    match gate.authorize_open(path_of(requested), flags) {
        Verdict::Forward(target) => match c_path(target) {
            // SAFETY: `target` outlives the call.
            Some(target) => unsafe { call_open(real, target.as_ptr(), flags, mode) },
            None => {
                set_errno(libc::EINVAL);
                -1
            }
        },
        Verdict::Denied => {
            set_errno(libc::EACCES);
            -1
        }
    }
}

/// Mediate one `opendir` through `gate`.
///
/// # Safety
/// `name` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn intercept_opendir<S, P, A>(
    gate: &Gate<S, P, A>,
    real: Option<OpendirFn>,
    name: *const c_char,
) -> *mut libc::DIR
where
    S: ConfigSource,
    P: Prompter,
    A: AuditSink,
{
    let Some(real) = real else {
        set_errno(libc::ENOSYS);
        return ptr::null_mut();
    };
    if name.is_null() {
        // SAFETY: forwarding the caller's argument unchanged.
        return unsafe { real(name) };
    }

    // SAFETY: checked non-null above, caller guarantees NUL termination.
    let requested = unsafe { CStr::from_ptr(name) };
    match gate.authorize_opendir(path_of(requested)) {
        Verdict::Forward(target) => match c_path(target) {
            // SAFETY: `target` outlives the call.
            Some(target) => unsafe { real(target.as_ptr()) },
            None => {
                set_errno(libc::EINVAL);
                ptr::null_mut()
            }
        },
        Verdict::Denied => {
            set_errno(libc::EACCES);
            ptr::null_mut()
        }
    }
}

/// Deny a call that arrives after this thread's storage is torn down.
///
/// The gate cannot run here, but the refusal is still audited.
///
/// # Safety
/// `path` must be null or a valid NUL-terminated string.
unsafe fn refuse_unmarked<A: AuditSink>(audit: &A, path: *const c_char) {
    if !path.is_null() {
        // SAFETY: checked non-null above, caller guarantees NUL termination.
        let requested = unsafe { CStr::from_ptr(path) };
        audit.record_denial(path_of(requested));
    }
    set_errno(libc::EACCES);
}

/// Shared body of the `open` family; `real` is the matching libc symbol.
unsafe fn dispatch_open(
    real: Option<OpenFn>,
    path: *const c_char,
    flags: c_int,
    mode: libc::mode_t,
) -> c_int {
    match enter() {
        // SAFETY: arguments come straight from the caller.
        Entry::Outer(_guard) => unsafe { intercept_open(process_gate(), real, path, flags, mode) },
        Entry::Nested => match real {
            // SAFETY: arguments come straight from the caller.
            Some(real) => unsafe { call_open(real, path, flags, mode) },
            None => {
                set_errno(libc::ENOSYS);
                -1
            }
        },
        Entry::Unavailable => {
            // SAFETY: argument comes straight from the caller.
            unsafe { refuse_unmarked(&SyslogAudit, path) };
            -1
        }
    }
}

/// Interposed `open(2)`.
///
/// The third argument is only meaningful when `flags` contains `O_CREAT` or
/// `O_TMPFILE`, exactly as for the variadic libc declaration.
///
/// # Safety
/// Same contract as libc `open`.
#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: libc::mode_t) -> c_int {
    // SAFETY: same contract as ours.
    unsafe { dispatch_open(real::open(), path, flags, mode) }
}

/// Interposed `open64`, the entry point of large-file builds.
///
/// # Safety
/// Same contract as libc `open64`.
#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn open64(path: *const c_char, flags: c_int, mode: libc::mode_t) -> c_int {
    // SAFETY: same contract as ours.
    unsafe { dispatch_open(real::open64(), path, flags, mode) }
}

/// Interposed `opendir(3)`.
///
/// # Safety
/// Same contract as libc `opendir`.
#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn opendir(name: *const c_char) -> *mut libc::DIR {
    match enter() {
        // SAFETY: argument comes straight from the caller.
        Entry::Outer(_guard) => unsafe {
            intercept_opendir(process_gate(), real::opendir(), name)
        },
        Entry::Nested => match real::opendir() {
            // SAFETY: argument comes straight from the caller.
            Some(real) => unsafe { real(name) },
            None => {
                set_errno(libc::ENOSYS);
                ptr::null_mut()
            }
        },
        Entry::Unavailable => {
            // SAFETY: argument comes straight from the caller.
            unsafe { refuse_unmarked(&SyslogAudit, name) };
            ptr::null_mut()
        }
    }
}
