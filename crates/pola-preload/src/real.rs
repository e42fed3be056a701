//! Lazily bound pointers to the next `open` / `open64` / `opendir` in link
//! order.

use std::ffi::{CStr, c_char, c_int, c_void};
use std::sync::OnceLock;

/// Signature of libc `open`.
pub(crate) type OpenFn = unsafe extern "C" fn(*const c_char, c_int, ...) -> c_int;
/// Signature of libc `opendir`.
pub(crate) type OpendirFn = unsafe extern "C" fn(*const c_char) -> *mut libc::DIR;

static REAL_OPEN: OnceLock<Option<OpenFn>> = OnceLock::new();
static REAL_OPEN64: OnceLock<Option<OpenFn>> = OnceLock::new();
static REAL_OPENDIR: OnceLock<Option<OpendirFn>> = OnceLock::new();

fn next_symbol(name: &CStr) -> Option<*mut c_void> {
    // SAFETY: `name` is NUL-terminated and RTLD_NEXT is a valid pseudo-handle.
    let symbol = unsafe { libc::dlsym(libc::RTLD_NEXT, name.as_ptr()) };
    if symbol.is_null() {
        tracing::error!(symbol = ?name, "dlsym(RTLD_NEXT) found no definition");
        None
    } else {
        Some(symbol)
    }
}

/// The real `open`, resolved on first use.
pub(crate) fn open() -> Option<OpenFn> {
    *REAL_OPEN.get_or_init(|| {
        next_symbol(c"open").map(|symbol| {
            // SAFETY: the next definition of `open` has the libc signature.
            unsafe { std::mem::transmute::<*mut c_void, OpenFn>(symbol) }
        })
    })
}

/// The real `open64`, resolved on first use.
///
/// Programs built with `_FILE_OFFSET_BITS=64` reach it in place of `open`.
pub(crate) fn open64() -> Option<OpenFn> {
    *REAL_OPEN64.get_or_init(|| {
        next_symbol(c"open64").map(|symbol| {
            // SAFETY: `open64` shares the libc `open` signature.
            unsafe { std::mem::transmute::<*mut c_void, OpenFn>(symbol) }
        })
    })
}

/// The real `opendir`, resolved on first use.
pub(crate) fn opendir() -> Option<OpendirFn> {
    *REAL_OPENDIR.get_or_init(|| {
        next_symbol(c"opendir").map(|symbol| {
            // SAFETY: the next definition of `opendir` has the libc signature.
            unsafe { std::mem::transmute::<*mut c_void, OpendirFn>(symbol) }
        })
    })
}
