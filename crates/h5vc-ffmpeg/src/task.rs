//! Async adapter: run a transform on the blocking pool with a deadline.
//!
//! A codec call cannot be interrupted, so on timeout the worker keeps running
//! in the background and its result is discarded.

use std::time::{Duration, Instant};

use h5vc_core::config::FilterConfig;
use h5vc_core::error::{FilterError, Result};
use h5vc_core::params::{CompressionParameters, Direction};

use crate::filter::transform;

/// [`transform`] on `spawn_blocking`, bounded by `timeout`.
pub async fn transform_with_timeout(
    direction: Direction,
    params: CompressionParameters,
    input: Vec<u8>,
    config: FilterConfig,
    timeout: Duration,
) -> Result<Vec<u8>> {
    run_blocking_with_timeout(timeout, move || {
        transform(direction, &params, &input, &config)
    })
    .await
}

/// Run `job` on the blocking pool and give up waiting after `timeout`.
pub async fn run_blocking_with_timeout<T, F>(timeout: Duration, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let started = Instant::now();
    let handle = tokio::task::spawn_blocking(job);
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(FilterError::Worker(join.to_string())),
        Err(_) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::warn!(elapsed_ms, "Transform timed out, abandoning worker");
            Err(FilterError::Timeout { elapsed_ms })
        }
    }
}
