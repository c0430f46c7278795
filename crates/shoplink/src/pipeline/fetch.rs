//! Concurrent supplier order fetching with per-reference retry.
//!
//! Fan-out is bounded by a semaphore so large backfills stay under the
//! supplier's rate limits. Results come back in input order.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use shoplink_core::SupplierOrderRef;

use crate::config::FetchConfig;
use crate::models::FetchedSupplierOrder;
use crate::sources::{SourceError, SupplierOrders};

/// Terminal result of fetching one supplier reference.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The supplier returned the order.
    Fetched(FetchedSupplierOrder),
    /// The supplier has no such order, or returned an unusable payload.
    /// The reference stays a candidate; nothing is stored for it.
    Absent,
    /// Transient failures persisted through every attempt.
    Failed(SourceError),
}

/// A fetch outcome paired with the reference that produced it.
#[derive(Debug)]
pub struct RefOutcome {
    pub reference: SupplierOrderRef,
    pub outcome: FetchOutcome,
}

/// Fetches supplier orders concurrently, retrying transient failures with
/// exponential backoff.
pub struct Fetcher<S> {
    supplier: Arc<S>,
    config: FetchConfig,
}

impl<S: SupplierOrders> Fetcher<S> {
    pub fn new(supplier: Arc<S>, config: FetchConfig) -> Self {
        Self { supplier, config }
    }

    /// Fetch every reference, preserving input order in the results.
    ///
    /// Duplicate references are fetched again rather than deduplicated; the
    /// downstream upsert absorbs the repeat.
    pub async fn fetch_all(&self, references: &[SupplierOrderRef]) -> Vec<RefOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));

        let tasks = references.iter().cloned().map(|reference| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let outcome = self.fetch_one(&reference, &semaphore).await;
                RefOutcome { reference, outcome }
            }
        });

        join_all(tasks).await
    }

    /// Fetch one reference, retrying transient errors per the policy.
    ///
    /// Delay before retry `n` (1-based) is `base_delay * multiplier^(n-1)`.
    /// The concurrency permit is held only for the request itself, so a
    /// reference backing off does not occupy a fan-out slot.
    #[instrument(skip(self, semaphore), fields(reference = %reference))]
    async fn fetch_one(&self, reference: &SupplierOrderRef, semaphore: &Semaphore) -> FetchOutcome {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result = {
                // Closed only on drop, which cannot happen while we hold it.
                let Ok(_permit) = semaphore.acquire().await else {
                    unreachable!("fetch semaphore closed");
                };
                self.supplier.get_order(reference).await
            };
            match result {
                Ok(Some(fetched)) => return FetchOutcome::Fetched(fetched),
                Ok(None) => {
                    debug!("supplier has no order for reference");
                    return FetchOutcome::Absent;
                }
                Err(err @ SourceError::NotFound(_)) => {
                    debug!(error = %err, "supplier has no order for reference");
                    return FetchOutcome::Absent;
                }
                Err(err @ SourceError::Malformed(_)) => {
                    warn!(error = %err, "unusable supplier response; treating as absent");
                    return FetchOutcome::Absent;
                }
                Err(err @ SourceError::Transient(_)) => {
                    if attempt >= self.config.max_attempts {
                        warn!(error = %err, attempts = attempt, "giving up on reference");
                        return FetchOutcome::Failed(err);
                    }
                    let delay = self.backoff_delay(attempt);
                    debug!(error = %err, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                    sleep(delay).await;
                }
            }
        }
    }

    /// Delay before the retry following failed attempt `attempt` (1-based).
    ///
    /// The exponent saturates instead of overflowing, so an extreme
    /// `max_attempts` setting degrades into very long waits rather than a
    /// panic.
    fn backoff_delay(&self, attempt: u32) -> std::time::Duration {
        let factor = self
            .config
            .multiplier
            .checked_pow(attempt - 1)
            .unwrap_or(u32::MAX);
        self.config
            .base_delay
            .checked_mul(factor)
            .unwrap_or(std::time::Duration::MAX)
    }
}
