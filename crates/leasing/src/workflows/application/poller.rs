use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::service::VerificationReport;

/// Client polling policy after redirect-back from checkout: a fixed
/// interval for a bounded number of attempts (~60 seconds total). The
/// attempt count is the only bounding mechanism; individual probes carry no
/// extra deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { interval: Duration::from_secs(5), max_attempts: 12 }
    }
}

/// Cooperative cancellation handle for component teardown. A probe already
/// in flight is not aborted; the flag is honored between attempts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    canceled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A probe returned proof of payment; polling stopped immediately.
    Verified(VerificationReport),
    /// Every attempt ran without verification; the caller degrades to a
    /// generic acknowledgment instead of blocking further.
    Exhausted,
    Canceled,
}

/// Drive the verification probe under the policy.
///
/// Probe errors are logged and consume an attempt rather than aborting the
/// loop; a still-propagating webhook frequently makes a later attempt
/// succeed where an earlier one hit a transient failure.
pub async fn poll_verification<F, Fut, E>(
    policy: PollPolicy,
    cancel: &CancelToken,
    mut probe: F,
) -> PollOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<VerificationReport, E>>,
    E: Display,
{
    for attempt in 1..=policy.max_attempts {
        if cancel.is_canceled() {
            return PollOutcome::Canceled;
        }

        match probe(attempt).await {
            Ok(report) if report.verified => return PollOutcome::Verified(report),
            Ok(_) => {}
            Err(err) => {
                warn!(attempt, %err, "payment verification probe failed");
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    PollOutcome::Exhausted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::AtomicU32;

    fn unverified() -> VerificationReport {
        VerificationReport {
            verified: false,
            message: "payment not completed".to_string(),
            confirmation_code: None,
            applicant_name: None,
            total_fee_cents: None,
        }
    }

    fn verified() -> VerificationReport {
        VerificationReport {
            verified: true,
            message: "payment verified".to_string(),
            confirmation_code: None,
            applicant_name: None,
            total_fee_cents: None,
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy { interval: Duration::from_millis(1), max_attempts: 12 }
    }

    #[tokio::test]
    async fn stops_on_first_verified_attempt() {
        let calls = AtomicU32::new(0);
        let outcome = poll_verification(fast_policy(), &CancelToken::new(), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, Infallible>(if attempt >= 3 { verified() } else { unverified() })
            }
        })
        .await;

        assert!(matches!(outcome, PollOutcome::Verified(report) if report.verified));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_bounded_attempts() {
        let calls = AtomicU32::new(0);
        let outcome = poll_verification(fast_policy(), &CancelToken::new(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Infallible>(unverified()) }
        })
        .await;

        assert_eq!(outcome, PollOutcome::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn cancellation_is_honored_between_attempts() {
        let cancel = CancelToken::new();
        let calls = AtomicU32::new(0);
        let outcome = poll_verification(fast_policy(), &cancel, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            if attempt == 2 {
                cancel.cancel();
            }
            async { Ok::<_, Infallible>(unverified()) }
        })
        .await;

        assert_eq!(outcome, PollOutcome::Canceled);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn probe_errors_consume_attempts_without_aborting() {
        let outcome = poll_verification(fast_policy(), &CancelToken::new(), |attempt| async move {
            if attempt < 4 {
                Err("connection reset")
            } else {
                Ok(verified())
            }
        })
        .await;

        assert!(matches!(outcome, PollOutcome::Verified(_)));
    }

    #[tokio::test]
    async fn default_policy_covers_about_one_minute() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 12);
    }
}
