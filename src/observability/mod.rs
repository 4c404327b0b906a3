//! Logging.
//!
//! `tracing` events and spans from every module end up in a rotating debug
//! log file, with warnings mirrored to stderr.
//!
//! Filter precedence:
//! 1. `RUST_LOG`
//! 2. `trace_level` from the configuration file (`-v` raises it to `debug`)
//! 3. `"info"`
//!
//! - [`init`]: subscriber setup
//! - [`file_writer`]: size-based rotation with three backups

mod file_writer;
mod init;

pub use file_writer::FileWriter;
pub use init::init_tracing;
