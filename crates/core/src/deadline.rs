//! Caller-supplied deadlines for remote calls.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Run `call` and fail with [`Error::Rpc`] if it does not finish in `timeout`.
///
/// A timeout is a transport outcome, never an authorization denial.
pub async fn with_deadline<T, F>(timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(res) => res,
        Err(_) => Err(Error::rpc(format!(
            "deadline of {}ms exceeded",
            timeout.as_millis()
        ))),
    }
}
