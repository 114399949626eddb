use crate::error::{GenError, GenResult};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// A refreshable snapshot of a long-running remote operation.
pub trait OperationSnapshot {
    /// Whether the operation reached a terminal state.
    fn is_done(&self) -> bool;
}

/// How often to re-check a pending operation, and for how long.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    /// Status checks allowed before giving up; `None` keeps polling
    /// until the operation reports done.
    pub max_polls: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            max_polls: None,
        }
    }
}

/// Re-fetch `operation` at a fixed interval until it reports done. Each
/// refresh replaces the snapshot whole; nothing is mutated in place.
/// Decoding the terminal snapshot (result locator, error record, or
/// neither) is the caller's job.
pub async fn poll_until_done<O, F, Fut>(
    mut operation: O,
    refresh: F,
    config: &PollConfig,
) -> GenResult<O>
where
    O: OperationSnapshot,
    F: Fn(O) -> Fut,
    Fut: Future<Output = GenResult<O>>,
{
    let mut polls = 0u32;

    while !operation.is_done() {
        if let Some(max) = config.max_polls {
            if polls >= max {
                return Err(GenError::PollTimeout(polls));
            }
        }
        tokio::time::sleep(config.interval).await;
        polls += 1;
        debug!("operation still pending, poll {}", polls);
        operation = refresh(operation).await?;
    }

    Ok(operation)
}
