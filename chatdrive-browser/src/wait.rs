//! Bounded, cancellable polling.
//!
//! Every wait in the engine goes through [`poll_until`]: a check is run on a
//! fixed interval against a monotonic deadline. A zero timeout waits forever.
//! The check answers `Ok(None)` for "not ready yet"; any `Err` aborts the wait
//! and propagates unchanged. A check still in flight when the deadline passes
//! or `cancel` fires is dropped.

use crate::error::{Result, SessionError};
use crate::handle::AutomationHandle;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How a bounded wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    Ready(T),
    TimedOut,
    Cancelled,
}

/// Run `check` until it yields a value, the deadline passes, or `cancel` fires.
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<WaitOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    // A timeout too large to represent is treated as no deadline.
    let deadline = if timeout.is_zero() {
        None
    } else {
        Instant::now().checked_add(timeout)
    };

    loop {
        if cancel.is_cancelled() {
            return Ok(WaitOutcome::Cancelled);
        }

        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(WaitOutcome::Cancelled),
            attempt = check() => attempt?,
            _ = expiry(deadline) => return Ok(WaitOutcome::TimedOut),
        };
        if let Some(value) = attempt {
            return Ok(WaitOutcome::Ready(value));
        }

        let nap = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(WaitOutcome::TimedOut);
                }
                interval.min(deadline - now)
            }
            None => interval,
        };

        tokio::select! {
            _ = cancel.cancelled() => return Ok(WaitOutcome::Cancelled),
            _ = tokio::time::sleep(nap) => {}
        }
    }
}

/// Resolves at `deadline`, or never without one.
async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Wait for the first element matching `selector`.
pub async fn wait_for_element<H: AutomationHandle>(
    handle: &H,
    selector: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<H::Element> {
    let never = CancellationToken::new();
    match poll_until(timeout, interval, &never, move || handle.find_element(selector)).await? {
        WaitOutcome::Ready(element) => Ok(element),
        WaitOutcome::TimedOut | WaitOutcome::Cancelled => Err(SessionError::ElementNotFound {
            locator: selector.to_string(),
        }),
    }
}

/// Wait for at least one element matching `selector`; empty on timeout.
pub async fn wait_for_elements<H: AutomationHandle>(
    handle: &H,
    selector: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<Vec<H::Element>> {
    let never = CancellationToken::new();
    let outcome = poll_until(timeout, interval, &never, move || async move {
        let elements = handle.find_elements(selector).await?;
        Ok((!elements.is_empty()).then_some(elements))
    })
    .await?;

    match outcome {
        WaitOutcome::Ready(elements) => Ok(elements),
        WaitOutcome::TimedOut | WaitOutcome::Cancelled => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TICK: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn test_ready_after_a_few_polls() {
        let calls = AtomicUsize::new(0);
        let outcome = poll_until(Duration::from_secs(5), TICK, &CancellationToken::new(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok((n >= 2).then_some(n)) }
        })
        .await
        .unwrap();

        assert_eq!(outcome, WaitOutcome::Ready(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_within_budget() {
        let timeout = Duration::from_millis(120);
        let started = std::time::Instant::now();

        let outcome: WaitOutcome<()> =
            poll_until(timeout, TICK, &CancellationToken::new(), || async { Ok(None) })
                .await
                .unwrap();

        assert_eq!(outcome, WaitOutcome::TimedOut);
        let elapsed = started.elapsed();
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let outcome: WaitOutcome<()> = poll_until(
            Duration::ZERO,
            Duration::from_secs(60),
            &cancel,
            || async { Ok(None) },
        )
        .await
        .unwrap();

        assert_eq!(outcome, WaitOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_check() {
        let timeout = Duration::from_millis(100);
        let started = std::time::Instant::now();

        let outcome: WaitOutcome<()> =
            poll_until(timeout, TICK, &CancellationToken::new(), || async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Ok(Some(()))
            })
            .await
            .unwrap();

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_slow_check() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let outcome: WaitOutcome<()> = poll_until(Duration::ZERO, TICK, &cancel, || async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(Some(()))
        })
        .await
        .unwrap();

        assert_eq!(outcome, WaitOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_check_errors_propagate() {
        let result: Result<WaitOutcome<()>> =
            poll_until(Duration::ZERO, TICK, &CancellationToken::new(), || async {
                Err(SessionError::handle("target closed"))
            })
            .await;

        assert!(matches!(
            result,
            Err(SessionError::AutomationHandleFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_check() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicUsize::new(0);

        let outcome: WaitOutcome<()> = poll_until(Duration::ZERO, TICK, &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
        .await
        .unwrap();

        assert_eq!(outcome, WaitOutcome::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
