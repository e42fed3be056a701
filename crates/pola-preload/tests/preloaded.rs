//! Tests that load the built `libpola_preload.so` through the dynamic linker.
//!
//! They run real programs under `LD_PRELOAD` the way `polash` does, so the
//! exported symbol table and the `open` calling convention are exercised as
//! a target program sees them.

#![cfg(target_os = "linux")]
#![allow(clippy::unwrap_used)]

use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pola::launch::{LIBRARY_FILE, Launcher, ShellLine};

/// The library built alongside this test binary.
fn find_library() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    // target/<profile>/deps/<test> -> target/<profile>
    let deps = exe.parent()?;
    let candidates = [deps.parent().map(|p| p.join(LIBRARY_FILE)), Some(deps.join(LIBRARY_FILE))];
    candidates.into_iter().flatten().find(|path| path.exists())
}

macro_rules! require_library {
    () => {
        match find_library() {
            Some(path) => path,
            None => {
                eprintln!("skipping: {LIBRARY_FILE} has not been built");
                return;
            }
        }
    };
}

fn run(library: &Path, line: &str) -> Output {
    let line = ShellLine::parse(line).unwrap();
    Launcher::new(library)
        .static_line(&line)
        .unwrap()
        .env_remove("POLA_LOG")
        .env("LC_ALL", "C")
        .output()
        .unwrap()
}

#[test]
fn test_library_exports_the_open_family() {
    let library = require_library!();
    let name = CString::new(library.as_os_str().as_bytes()).unwrap();

    // SAFETY: loading a library with no initializers; symbols are only
    // compared, never called.
    unsafe {
        let handle = libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL);
        assert!(!handle.is_null(), "dlopen failed");

        let symbols: [&CStr; 3] = [c"open", c"open64", c"opendir"];
        for symbol in symbols {
            let ours = libc::dlsym(handle, symbol.as_ptr());
            let libc_own = libc::dlsym(libc::RTLD_DEFAULT, symbol.as_ptr());
            assert!(!ours.is_null(), "{symbol:?} not exported");
            assert_ne!(ours, libc_own, "{symbol:?} resolves to libc, not the shim");
        }
        libc::dlclose(handle);
    }
}

#[test]
fn test_cat_reads_only_what_the_line_names() {
    let library = require_library!();
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    let secret = dir.path().join("secret.txt");
    std::fs::write(&notes, b"visible\n").unwrap();
    std::fs::write(&secret, b"hidden\n").unwrap();

    let allowed = run(&library, &format!("cat {}", notes.display()));
    assert!(allowed.status.success(), "{allowed:?}");
    assert_eq!(allowed.stdout, b"visible\n");

    let denied = run(&library, &format!("cat {}", secret.display()));
    assert!(!denied.status.success());
    assert!(denied.stdout.is_empty());
    assert!(
        String::from_utf8_lossy(&denied.stderr).contains("Permission denied"),
        "{denied:?}"
    );
}

#[test]
fn test_dd_creates_bracketed_output_with_mode() {
    use std::os::unix::fs::PermissionsExt;

    let library = require_library!();
    if Command::new("dd").arg("--version").output().is_err() {
        eprintln!("skipping: dd not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.bin");

    let output = run(
        &library,
        &format!("dd if=/dev/null of=<{}> status=none", out.display()),
    );
    assert!(output.status.success(), "{output:?}");

    let meta = std::fs::metadata(&out).unwrap();
    // dd creates with 0666 masked by the umask; garbage in the mode
    // argument would show up as set-id or sticky bits.
    assert_eq!(meta.permissions().mode() & 0o7000, 0);
}
