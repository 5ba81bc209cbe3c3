//! Command Line Interface (CLI) layer for etlocal.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for the localization subcommands
//! and the climate-grid utilities. It wires user-provided options to the
//! library functionality exposed via `etlocal::api`.
//!
//! If you are embedding etlocal into another application, prefer using
//! the high-level `etlocal::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
