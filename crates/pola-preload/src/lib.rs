//! Pola preload library
//!
//! Built as `libpola_preload.so` and injected with `LD_PRELOAD`, this crate
//! interposes `open`, `open64` and `opendir` and routes every call through a
//! [`pola::Gate`] configured from the environment the launchers set up.
//!
//! Set `POLA_LOG` (e.g. `POLA_LOG=pola=debug`) to get diagnostics on stderr.

#![cfg(target_os = "linux")]

mod real;
mod shim;
mod telemetry;

pub use shim::{open, open64, opendir};
