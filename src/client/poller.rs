//! Waits for a ZaloPay payment to settle.
//!
//! The poller asks a [`PaymentStatusSource`] for the status every `interval`
//! while a one-second countdown publishes the seconds left on a watch
//! channel. Both timers live inside [`PaymentPoller::poll`] and stop when it
//! returns. A status query in flight is raced against cancellation and the
//! countdown, so a slow gateway never extends the poll.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{ClientError, StorefrontClient};
use crate::config::ZaloPayConfig;
use crate::zalopay::PaymentState;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Anything that can report the state of a payment by `app_trans_id`.
#[async_trait]
pub trait PaymentStatusSource: Send + Sync {
    async fn payment_status(&self, app_trans_id: &str) -> Result<PaymentState, ClientError>;
}

#[async_trait]
impl PaymentStatusSource for StorefrontClient {
    async fn payment_status(&self, app_trans_id: &str) -> Result<PaymentState, ClientError> {
        Ok(self.query_zalopay_payment(app_trans_id).await?.status)
    }
}

type StatusQuery<'a> = Pin<Box<dyn Future<Output = Result<PaymentState, ClientError>> + Send + 'a>>;

/// How a poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Paid,
    Failed,
    /// The countdown reached zero first.
    Expired,
    Cancelled,
    /// The session token was rejected; log in again before retrying.
    Unauthorized,
}

pub struct PaymentPoller<S> {
    source: S,
    interval: Duration,
    timeout: Duration,
    remaining: watch::Sender<u64>,
}

impl<S: PaymentStatusSource> PaymentPoller<S> {
    pub fn new(source: S, interval: Duration, timeout: Duration) -> Self {
        let (remaining, _) = watch::channel(timeout.as_secs());
        Self {
            source,
            interval: interval.max(Duration::from_millis(1)),
            timeout,
            remaining,
        }
    }

    pub fn with_defaults(source: S) -> Self {
        Self::new(source, DEFAULT_POLL_INTERVAL, DEFAULT_PAYMENT_TIMEOUT)
    }

    pub fn from_config(source: S, config: &ZaloPayConfig) -> Self {
        Self::new(source, config.poll_interval(), config.payment_timeout())
    }

    /// Seconds left before the current poll gives up.
    pub fn remaining(&self) -> watch::Receiver<u64> {
        self.remaining.subscribe()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Polls until the payment settles, the countdown ends or `cancel` resolves.
    pub async fn poll<F>(&self, app_trans_id: &str, cancel: F) -> PollOutcome
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let deadline = started + self.timeout;
        self.remaining.send_replace(self.timeout.as_secs());

        let mut queries = time::interval_at(started + self.interval, self.interval);
        queries.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut countdown = time::interval_at(started + Duration::from_secs(1), Duration::from_secs(1));
        let expiry = time::sleep_until(deadline);
        tokio::pin!(expiry);
        tokio::pin!(cancel);

        let mut in_flight: Option<StatusQuery<'_>> = None;

        let outcome = loop {
            tokio::select! {
                biased;
                _ = &mut cancel => break PollOutcome::Cancelled,
                _ = &mut expiry => break PollOutcome::Expired,
                _ = countdown.tick() => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    self.remaining.send_replace(left.as_secs());
                }
                result = settle(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    // Next query one full interval after this reply.
                    queries.reset();
                    match result {
                        Ok(PaymentState::Paid) => break PollOutcome::Paid,
                        Ok(PaymentState::Failed) => break PollOutcome::Failed,
                        Ok(PaymentState::Pending) => {
                            debug!(app_trans_id, "Payment still pending");
                        }
                        Err(ClientError::Unauthorized(message)) => {
                            warn!(app_trans_id, reason = %message, "Payment status query rejected the session");
                            break PollOutcome::Unauthorized;
                        }
                        Err(err) => {
                            warn!(app_trans_id, error = %err, "Payment status query failed; will retry");
                        }
                    }
                }
                _ = queries.tick(), if in_flight.is_none() => {
                    in_flight = Some(self.source.payment_status(app_trans_id));
                }
            }
        };

        if outcome == PollOutcome::Expired {
            self.remaining.send_replace(0);
        }
        info!(app_trans_id, ?outcome, elapsed_secs = started.elapsed().as_secs(), "Payment polling finished");
        outcome
    }
}

async fn settle(query: &mut Option<StatusQuery<'_>>) -> Result<PaymentState, ClientError> {
    match query.as_mut() {
        Some(query) => query.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Scripted {
        replies: Arc<Mutex<VecDeque<Result<PaymentState, ClientError>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<PaymentState, ClientError>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentStatusSource for Scripted {
        async fn payment_status(&self, _app_trans_id: &str) -> Result<PaymentState, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(PaymentState::Pending))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_paid_after_pending_replies() {
        let source = Scripted::new(vec![
            Ok(PaymentState::Pending),
            Ok(PaymentState::Pending),
            Ok(PaymentState::Paid),
        ]);
        let poller = PaymentPoller::with_defaults(source.clone());

        let started = Instant::now();
        let outcome = poller.poll("240101_ORD1_000001", std::future::pending()).await;

        assert_eq!(outcome, PollOutcome::Paid);
        assert_eq!(source.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_ends_polling() {
        let source = Scripted::new(vec![Ok(PaymentState::Failed)]);
        let poller = PaymentPoller::with_defaults(source.clone());

        let outcome = poller.poll("id", std::future::pending()).await;
        assert_eq!(outcome, PollOutcome::Failed);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_keep_polling() {
        let source = Scripted::new(vec![
            Err(ClientError::Decode("boom".into())),
            Err(ClientError::Api {
                status: reqwest::StatusCode::BAD_GATEWAY,
                message: "gateway".into(),
            }),
            Ok(PaymentState::Paid),
        ]);
        let poller = PaymentPoller::new(source.clone(), Duration::from_secs(1), Duration::from_secs(60));

        assert_eq!(poller.poll("id", std::future::pending()).await, PollOutcome::Paid);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_when_countdown_runs_out() {
        let source = Scripted::default();
        let poller = PaymentPoller::new(source.clone(), Duration::from_secs(5), Duration::from_secs(20));
        let remaining = poller.remaining();

        let outcome = poller.poll("id", std::future::pending()).await;

        assert_eq!(outcome, PollOutcome::Expired);
        assert_eq!(*remaining.borrow(), 0);
        // Queries at 5, 10 and 15 seconds; the 20 second tick loses to expiry.
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_every_second() {
        let source = Scripted::default();
        let poller = Arc::new(PaymentPoller::new(
            source,
            Duration::from_secs(5),
            Duration::from_secs(900),
        ));
        let mut remaining = poller.remaining();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let task = {
            let poller = poller.clone();
            tokio::spawn(async move {
                poller
                    .poll("id", async move {
                        let _ = stop_rx.await;
                    })
                    .await
            })
        };

        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(*remaining.borrow_and_update(), 897);

        let _ = stop_tx.send(());
        assert_eq!(task.await.unwrap(), PollOutcome::Cancelled);
    }

    /// Answers pending after `delay`.
    struct Slow {
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PaymentStatusSource for Slow {
        async fn payment_status(&self, _app_trans_id: &str) -> Result<PaymentState, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            time::sleep(self.delay).await;
            Ok(PaymentState::Pending)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_query_does_not_delay_cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Slow {
            delay: Duration::from_secs(120),
            calls: calls.clone(),
        };
        let poller = PaymentPoller::new(source, Duration::from_secs(5), Duration::from_secs(30));
        let remaining = poller.remaining();

        let started = Instant::now();
        let outcome = poller.poll("id", time::sleep(Duration::from_secs(6))).await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The countdown kept ticking while the query hung.
        assert_eq!(*remaining.borrow(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_query_does_not_outlive_the_countdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Slow {
            delay: Duration::from_secs(120),
            calls: calls.clone(),
        };
        let poller = PaymentPoller::new(source, Duration::from_secs(5), Duration::from_secs(30));

        let started = Instant::now();
        let outcome = poller.poll("id", std::future::pending()).await;

        assert_eq!(outcome, PollOutcome::Expired);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_session_stops_polling() {
        let source = Scripted::new(vec![
            Ok(PaymentState::Pending),
            Err(ClientError::Unauthorized("Token expired".into())),
        ]);
        let poller = PaymentPoller::with_defaults(source.clone());

        let started = Instant::now();
        let outcome = poller.poll("id", std::future::pending()).await;

        assert_eq!(outcome, PollOutcome::Unauthorized);
        assert_eq!(source.calls(), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_before_next_query() {
        let source = Scripted::default();
        let poller = PaymentPoller::with_defaults(source.clone());

        let cancel = time::sleep(Duration::from_secs(7));
        let outcome = poller.poll("id", cancel).await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(source.calls(), 1);
    }
}
