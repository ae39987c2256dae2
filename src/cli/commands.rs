//! CLI command implementations
//!
//! Every command loads the service configuration first; commands that touch
//! entities then connect the selected storage backend (hydrating it, for the
//! cached backends) before doing their one operation.

use std::path::Path;

use serde_json::{json, Value};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::service::ServiceRegistry;
use crate::storage::StorageError;

use super::args::{Cli, Command, StorageArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_payload, write_error, write_response};

/// Parse arguments, run the command and report failures on stdout
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    let result = run_command(cli.command);
    if let Err(ref e) = result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Install the stderr log subscriber. `RUST_LOG` applies unless `verbose`.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // a subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let data = match cmd {
        Command::Check { config } => check(&config)?,
        Command::Validate {
            config,
            service,
            payload,
        } => validate(&config, &service, payload.as_deref())?,
        Command::Put {
            config,
            service,
            payload,
            storage,
        } => {
            let payload = read_payload(payload.as_deref())?;
            put(&config, &service, payload, &storage)?
        }
        Command::List {
            config,
            service,
            storage,
        } => list(&config, &service, &storage)?,
        Command::Get {
            config,
            service,
            id,
            storage,
        } => get(&config, &service, &id, &storage)?,
        Command::Delete {
            config,
            service,
            id,
            storage,
        } => delete(&config, &service, &id, &storage)?,
    };

    write_response(data)
}

fn runtime() -> CliResult<Runtime> {
    Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

/// Summarize the configured services
pub fn check(config_path: &Path) -> CliResult<Value> {
    let config = AppConfig::load(config_path)?;

    let services: Vec<Value> = config
        .services()
        .iter()
        .map(|service| {
            json!({
                "name": service.name(),
                "fields": service.config.fields.keys().collect::<Vec<_>>(),
                "bearer": service.bearer().is_some(),
                "limits": service.limits,
            })
        })
        .collect();

    Ok(json!({ "services": services }))
}

/// Validate a payload against a service's schema
pub fn validate(config_path: &Path, service: &str, payload: Option<&Path>) -> CliResult<Value> {
    let config = AppConfig::load(config_path)?;
    let definition = config
        .service(service)
        .ok_or_else(|| StorageError::UnknownService(service.to_string()))?;

    let payload = read_payload(payload)?;
    crate::schema::validate_payload(&definition.schema, &payload)?;

    Ok(json!({ "service": service, "valid": true }))
}

async fn connect(config_path: &Path, storage: &StorageArgs) -> CliResult<ServiceRegistry> {
    let config = AppConfig::load(config_path)?;
    Ok(ServiceRegistry::connect(&config, &storage.settings()).await?)
}

/// Validate and store a payload; returns the new entity
pub fn put(config_path: &Path, service: &str, payload: Value, storage: &StorageArgs) -> CliResult<Value> {
    runtime()?.block_on(put_entity(config_path, service, payload, storage))
}

async fn put_entity(
    config_path: &Path,
    service: &str,
    payload: Value,
    storage: &StorageArgs,
) -> CliResult<Value> {
    let registry = connect(config_path, storage).await?;
    let entity = registry.service(service)?.put(payload).await?;
    Ok(serde_json::to_value(entity)?)
}

/// List all entities of a service
pub fn list(config_path: &Path, service: &str, storage: &StorageArgs) -> CliResult<Value> {
    runtime()?.block_on(list_entities(config_path, service, storage))
}

async fn list_entities(config_path: &Path, service: &str, storage: &StorageArgs) -> CliResult<Value> {
    let registry = connect(config_path, storage).await?;
    let entities = registry.service(service)?.list().await?;
    Ok(serde_json::to_value(entities)?)
}

/// Fetch one entity
pub fn get(config_path: &Path, service: &str, id: &str, storage: &StorageArgs) -> CliResult<Value> {
    runtime()?.block_on(get_entity(config_path, service, id, storage))
}

async fn get_entity(config_path: &Path, service: &str, id: &str, storage: &StorageArgs) -> CliResult<Value> {
    let registry = connect(config_path, storage).await?;
    let entity = registry.service(service)?.get(id).await?;
    Ok(serde_json::to_value(entity)?)
}

/// Delete one entity
pub fn delete(config_path: &Path, service: &str, id: &str, storage: &StorageArgs) -> CliResult<Value> {
    runtime()?.block_on(delete_entity(config_path, service, id, storage))
}

async fn delete_entity(config_path: &Path, service: &str, id: &str, storage: &StorageArgs) -> CliResult<Value> {
    let registry = connect(config_path, storage).await?;
    registry.service(service)?.delete(id).await?;
    Ok(json!({ "service": service, "id": id, "deleted": true }))
}
