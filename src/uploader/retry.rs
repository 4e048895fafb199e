use std::future::Future;
use tokio::time::{sleep, Duration};

use crate::errors::{DeliveryError, TransportError};

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// `max_retries` is clamped to at least one attempt.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

/// Result of a single try, as seen by the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Retryable(TransportError),
    Fatal(TransportError),
}

impl From<Result<(), TransportError>> for AttemptOutcome {
    fn from(result: Result<(), TransportError>) -> Self {
        match result {
            Ok(()) => AttemptOutcome::Success,
            Err(e) if e.is_permanent() => AttemptOutcome::Fatal(e),
            Err(e) => AttemptOutcome::Retryable(e),
        }
    }
}

/// Record of one delivery try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub index: u32,
    pub outcome: AttemptOutcome,
}

/// Run `operation` until it succeeds, fails fatally, or the policy's attempt
/// budget is spent. Returns the number of attempts used.
///
/// Retries and terminal failures are logged here; success is left to the
/// caller.
pub async fn deliver<F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<u32, DeliveryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), TransportError>>,
{
    let max_retries = policy.max_retries.max(1);
    let mut index = 0;

    loop {
        index += 1;
        let attempt = Attempt {
            index,
            outcome: operation().await.into(),
        };

        match attempt.outcome {
            AttemptOutcome::Success => return Ok(attempt.index),
            AttemptOutcome::Fatal(e) => {
                log::error!("Telegram API error while sending {}: {}", label, e);
                return Err(DeliveryError::Rejected {
                    attempt: attempt.index,
                    source: e,
                });
            }
            AttemptOutcome::Retryable(e) => {
                log::warn!(
                    "Retry {}/{} for {} due to network error: {}",
                    attempt.index,
                    max_retries,
                    label,
                    e
                );

                if attempt.index >= max_retries {
                    log::error!("Max retries reached for {}. Giving up.", label);
                    return Err(DeliveryError::ExhaustedRetries {
                        attempts: attempt.index,
                        last: e,
                    });
                }

                sleep(policy.delay).await;
            }
        }
    }
}
