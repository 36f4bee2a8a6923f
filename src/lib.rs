//! Core of a GCC-compatible compiler driver.
//!
//! This crate re-exports the pieces implemented across the `ccc-*`
//! workspace members: option parsing, phase/action modeling, pipeline
//! construction, job binding, introspection formatting, and sequential
//! execution. The binary entry point lives in `src/main.rs` and simply
//! delegates to [`ccc_cli::run`].

pub use ccc_bind as bind;
pub use ccc_cli::{run, DriverError, ExitCode};
pub use ccc_config as config;
pub use ccc_diag as diag;
pub use ccc_exec as exec;
pub use ccc_opts as opts;
pub use ccc_phases as phases;
pub use ccc_pipeline as pipeline;
pub use ccc_toolchain as toolchain;
pub use ccc_types as types;
