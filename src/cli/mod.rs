//! CLI module for schemastore
//!
//! Provides command-line interface for:
//! - check: Load and summarize the service configuration
//! - validate: Check a payload against a service schema
//! - put / list / get / delete: One-shot entity operations

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, StorageArgs};
pub use commands::{check, delete, get, init_logging, list, put, run, run_command, validate};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_payload, write_error, write_response};
