use std::future::Future;
use std::time::Duration;

use crate::errors::AppError;

/// Fixed-cap exponential backoff. The wait after failed attempt `n`
/// (1-based) is `base_delay * 2^n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Errors that retrying cannot fix.
fn is_permanent(err: &AppError) -> bool {
    err.is_local() || matches!(err, AppError::Unauthorized)
}

pub async fn retry_with_backoff<T, F, Fut>(policy: Backoff, label: &str, mut op: F) -> Result<T, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(value);
            }
            Err(err) if is_permanent(&err) || attempt >= max_attempts => {
                log::error!("{} failed after {} attempt(s): {}", label, attempt, err);
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                log::warn!(
                    "{} attempt {}/{} failed: {}. Retrying in {:?}",
                    label,
                    attempt,
                    max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
