//! CLI argument definitions using clap
//!
//! Commands:
//! - schemastore check --config <path>
//! - schemastore validate --config <path> --service <name> [--payload <path>]
//! - schemastore put --config <path> --service <name> [--payload <path>]
//! - schemastore list --config <path> --service <name>
//! - schemastore get --config <path> --service <name> --id <id>
//! - schemastore delete --config <path> --service <name> --id <id>

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::storage::{StorageKind, StorageSettings};

/// schemastore - schema-validated entity storage
#[derive(Parser, Debug)]
#[command(name = "schemastore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Storage backend selection
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// Backend: mem, local, s3 or firestore
    #[arg(long, default_value = "local")]
    pub storage: StorageKind,

    /// Root directory of the local backend
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Bound on each remote call, in seconds
    #[arg(long, default_value_t = 5)]
    pub remote_timeout_secs: u64,
}

impl StorageArgs {
    pub fn settings(&self) -> StorageSettings {
        StorageSettings {
            kind: self.storage,
            data_dir: self.data_dir.clone(),
            remote_timeout: Duration::from_secs(self.remote_timeout_secs),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and check the service configuration
    Check {
        /// Path to service configuration file
        #[arg(long, default_value = "./services.json")]
        config: PathBuf,
    },

    /// Validate a payload without storing it
    Validate {
        /// Path to service configuration file
        #[arg(long, default_value = "./services.json")]
        config: PathBuf,

        /// Service name
        #[arg(long)]
        service: String,

        /// Payload file; read from stdin when omitted
        #[arg(long)]
        payload: Option<PathBuf>,
    },

    /// Validate and store a payload
    Put {
        /// Path to service configuration file
        #[arg(long, default_value = "./services.json")]
        config: PathBuf,

        /// Service name
        #[arg(long)]
        service: String,

        /// Payload file; read from stdin when omitted
        #[arg(long)]
        payload: Option<PathBuf>,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// List all entities of a service
    List {
        /// Path to service configuration file
        #[arg(long, default_value = "./services.json")]
        config: PathBuf,

        /// Service name
        #[arg(long)]
        service: String,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Fetch one entity
    Get {
        /// Path to service configuration file
        #[arg(long, default_value = "./services.json")]
        config: PathBuf,

        /// Service name
        #[arg(long)]
        service: String,

        /// Entity id
        #[arg(long)]
        id: String,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Delete one entity
    Delete {
        /// Path to service configuration file
        #[arg(long, default_value = "./services.json")]
        config: PathBuf,

        /// Service name
        #[arg(long)]
        service: String,

        /// Entity id
        #[arg(long)]
        id: String,

        #[command(flatten)]
        storage: StorageArgs,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
