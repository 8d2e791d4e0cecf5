use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use super::{ExecuteOptions, RequestOrchestrator};
use crate::error::AppError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Double the delay after every failed attempt.
    pub exponential_backoff: bool,
    pub execute: ExecuteOptions,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            exponential_backoff: true,
            execute: ExecuteOptions::default(),
        }
    }
}

/// Delay before the retry that follows failed attempt `attempt` (0-based).
pub fn backoff_delay(base: Duration, attempt: u32, exponential: bool) -> Duration {
    if exponential {
        base.saturating_mul(2_u32.saturating_pow(attempt))
    } else {
        base
    }
}

impl RequestOrchestrator {
    /// Run `call` through [`execute`](Self::execute) up to `max_retries + 1`
    /// times, waiting between attempts. The last failure is returned.
    pub async fn retry<T, F, Fut>(
        &self,
        call: F,
        max_retries: u32,
        base_delay: Duration,
        options: &RetryOptions,
    ) -> Result<T, AppError>
    where
        T: Serialize,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 0_u32;
        loop {
            match self.execute(&call, &options.execute).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= max_retries => return Err(err),
                Err(_) => {
                    let delay = backoff_delay(base_delay, attempt, options.exponential_backoff);
                    self.notifier.warning(&format!(
                        "Request failed, retrying in {}s ({}/{})",
                        delay.as_secs_f64(),
                        attempt + 1,
                        max_retries
                    ));
                    if let Some(metrics) = &self.metrics {
                        metrics.retries_total.inc();
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
