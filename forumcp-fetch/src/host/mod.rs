//! Host APIs.
//!
//! - [`process`] - Subprocess execution for bypass helpers and probes

pub mod process;

pub use process::{ProcessOutput, ProcessRunner};
