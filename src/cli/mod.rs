//! Command Line Interface (CLI) layer for satcomp.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for single-scene and batch
//! compositing. It wires user-provided options to the library functionality
//! exposed via `satcomp::api`.
//!
//! If you are embedding satcomp into another application, prefer using
//! the high-level `satcomp::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
