//! Bounded, retrying dispatch of blocking oracle calls
//!
//! Oracle traits are synchronous, so every call runs on the blocking pool.
//! A semaphore caps calls in flight, each attempt is wrapped in a timeout, and
//! the caller gets one outcome per request in request order once all calls
//! have settled.
//!
//! A permit travels into the blocking closure and is released only when the
//! call returns, so an attempt that timed out still counts against the limit
//! until its thread finishes.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::debug;

/// Timeout, retry and concurrency limits for oracle calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallPolicy {
    /// Limit on a single attempt
    pub timeout: Duration,
    /// Attempts after the first
    pub max_retries: u32,
    /// Calls in flight at once
    pub concurrency: usize,
}

impl CallPolicy {
    /// Build the policy from pipeline configuration
    pub fn from_config(config: &crate::PipelineConfig) -> Self {
        Self {
            timeout: config.oracle_timeout(),
            max_retries: config.oracle_max_retries,
            concurrency: config.oracle_concurrency.max(1),
        }
    }
}

/// Result of one request after all attempts
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome<R> {
    /// Value of the first successful attempt, or the last error
    pub result: Result<R, String>,
    /// Attempts made
    pub attempts: u32,
}

async fn attempt_all<T, R, F>(
    item: Arc<T>,
    call: Arc<F>,
    semaphore: Arc<Semaphore>,
    policy: CallPolicy,
) -> CallOutcome<R>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(&T) -> Result<R, String> + Send + Sync + 'static,
{
    let mut attempts = 0;
    let mut last_error = String::from("no attempt made");

    while attempts <= policy.max_retries {
        attempts += 1;
        let item = Arc::clone(&item);
        let call = Arc::clone(&call);
        let permit: OwnedSemaphorePermit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                last_error = format!("oracle pool closed: {}", e);
                break;
            }
        };

        // Call in a blocking context since oracles are not async
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            call(&item)
        });
        match timeout(policy.timeout, task).await {
            Ok(Ok(Ok(value))) => {
                return CallOutcome {
                    result: Ok(value),
                    attempts,
                }
            }
            Ok(Ok(Err(e))) => last_error = e,
            Ok(Err(e)) => last_error = format!("Task join error: {}", e),
            Err(_) => last_error = format!("timed out after {:?}", policy.timeout),
        }
        debug!("Oracle attempt {} failed: {}", attempts, last_error);
    }

    CallOutcome {
        result: Err(last_error),
        attempts,
    }
}

/// Run `call` over every item and return outcomes in item order
pub async fn call_all<T, R, F>(items: Vec<T>, policy: CallPolicy, call: F) -> Vec<CallOutcome<R>>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(&T) -> Result<R, String> + Send + Sync + 'static,
{
    let count = items.len();
    let call = Arc::new(call);
    let permits = u32::try_from(policy.concurrency.max(1)).unwrap_or(u32::MAX);
    let semaphore = Arc::new(Semaphore::new(permits as usize));
    let mut tasks = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let call = Arc::clone(&call);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            (index, attempt_all(Arc::new(item), call, semaphore, policy).await)
        });
    }

    let mut slots: Vec<Option<CallOutcome<R>>> = (0..count).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(e) => debug!("Oracle task aborted: {}", e),
        }
    }

    // Timed-out calls still hold permits; wait for their threads to return
    if let Ok(drained) = semaphore.acquire_many(permits).await {
        drop(drained);
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| CallOutcome {
                result: Err("oracle task aborted".to_string()),
                attempts: 0,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(max_retries: u32) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(5),
            max_retries,
            concurrency: 2,
        }
    }

    #[tokio::test]
    async fn test_results_keep_request_order() {
        let outcomes = call_all(vec![30u64, 0, 10], policy(0), |delay: &u64| {
            std::thread::sleep(Duration::from_millis(*delay));
            Ok(*delay * 2)
        })
        .await;
        let values: Vec<u64> = outcomes.into_iter().map(|o| o.result.unwrap()).collect();
        assert_eq!(values, vec![60, 0, 20]);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let outcomes = call_all(vec![()], policy(2), move |_: &()| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("flaky".to_string())
            } else {
                Ok("done")
            }
        })
        .await;
        assert_eq!(outcomes[0].result, Ok("done"));
        assert_eq!(outcomes[0].attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let outcomes = call_all(vec![1, 2], policy(1), |_: &i32| -> Result<(), String> {
            Err("down".to_string())
        })
        .await;
        assert!(outcomes.iter().all(|o| o.attempts == 2));
        assert_eq!(outcomes[1].result, Err("down".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let policy = CallPolicy {
            timeout: Duration::from_millis(20),
            max_retries: 0,
            concurrency: 1,
        };
        let outcomes = call_all(vec![()], policy, |_: &()| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .await;
        let error = outcomes[0].result.clone().unwrap_err();
        assert!(error.contains("timed out"));
    }

    #[tokio::test]
    async fn test_timed_out_calls_stay_within_limit() {
        let policy = CallPolicy {
            timeout: Duration::from_millis(20),
            max_retries: 2,
            concurrency: 1,
        };
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (live_in, peak_in) = (Arc::clone(&live), Arc::clone(&peak));

        let outcomes = call_all(vec![1, 2], policy, move |_: &i32| -> Result<(), String> {
            let now = live_in.fetch_add(1, Ordering::SeqCst) + 1;
            peak_in.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(100));
            live_in.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(outcomes.iter().all(|o| o.attempts == 3 && o.result.is_err()));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcomes = call_all(Vec::<()>::new(), policy(0), |_: &()| Ok(())).await;
        assert!(outcomes.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_outcomes_align_with_items(items in proptest::collection::vec(any::<i32>(), 0..20)) {
            let policy = CallPolicy {
                timeout: Duration::from_secs(5),
                max_retries: 0,
                concurrency: 3,
            };
            let outcomes = tokio_test::block_on(call_all(items.clone(), policy, |n: &i32| {
                if n % 2 == 0 { Ok(*n) } else { Err(format!("odd {}", n)) }
            }));

            prop_assert_eq!(outcomes.len(), items.len());
            for (item, outcome) in items.iter().zip(&outcomes) {
                prop_assert_eq!(outcome.attempts, 1);
                match &outcome.result {
                    Ok(value) => prop_assert_eq!(value, item),
                    Err(message) => prop_assert_eq!(message, &format!("odd {}", item)),
                }
            }
        }
    }
}
