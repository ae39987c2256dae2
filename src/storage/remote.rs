//! Deadline for remote calls

use std::future::Future;
use std::time::Duration;

use super::errors::{RemoteError, RemoteResult};

/// Default bound on a single remote call
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs one remote call, failing with [`RemoteError::Timeout`] when it does
/// not finish within `timeout`. The call is dropped (and so cancelled) on
/// timeout; no retry is attempted.
pub(crate) async fn with_timeout<T, F>(timeout: Duration, call: F) -> RemoteResult<T>
where
    F: Future<Output = RemoteResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(timeout)),
    }
}

/// Reads a required setting through `lookup`; empty values count as absent.
pub(crate) fn required_var(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &str,
) -> Result<String, super::StorageError> {
    lookup(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| super::StorageError::MissingConfiguration(name.to_string()))
}

/// Reads an optional setting through `lookup`; empty values count as absent.
pub(crate) fn optional_var(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|value| !value.is_empty())
}
