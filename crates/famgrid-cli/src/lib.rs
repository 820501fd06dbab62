#![forbid(unsafe_code)]

//! Command-line front end for the famgrid layout engine.

pub mod cli;
pub mod error;
pub mod summary;

pub use cli::{Args, OutputFormat, execute, run};
pub use error::{CliError, Result};
