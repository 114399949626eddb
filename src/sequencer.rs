use crate::error::{GenError, GenResult};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Run an ordered batch of independent jobs strictly one at a time,
/// waiting `pacing` after each completed job before submitting the next.
/// No wait follows the last job. The first failure aborts the remaining
/// queue and is returned wrapped with the 1-based index of the failing
/// job; results collected so far are dropped.
pub async fn run_sequential<T, F, Fut>(jobs: Vec<F>, pacing: Duration) -> GenResult<Vec<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = GenResult<T>>,
{
    let total = jobs.len();
    let mut results = Vec::with_capacity(total);

    for (i, job) in jobs.into_iter().enumerate() {
        match job().await {
            Ok(value) => results.push(value),
            Err(e) => return Err(GenError::scene_failed(i + 1, e)),
        }

        if i + 1 < total {
            debug!("job {}/{} done, pacing {:?} before next", i + 1, total, pacing);
            tokio::time::sleep(pacing).await;
        }
    }

    Ok(results)
}
