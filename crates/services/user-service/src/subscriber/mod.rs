//! Long-running queue subscriber.
//!
//! Drives `UserService::process_message` in a loop until the shutdown signal
//! fires. The signal is a `watch` channel: `true` or a dropped sender both mean
//! stop. Both the in-flight call and the retry delay after a failure are raced
//! against the signal, so a hung queue call or a long delay never holds up
//! shutdown. A call cut short this way is dropped, which cancels its I/O.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use common::AppResult;
use domain::DEFAULT_SUBSCRIBER_RETRY_DELAY_SECONDS;

use crate::service::{ProcessMessageInput, UserService};

/// Delay between iterations after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
}

impl RetryPolicy {
    /// Wait the same `delay` after every failure.
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay before the next attempt, given the failures seen in a row so far.
    pub fn delay(&self, _consecutive_failures: u32) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(DEFAULT_SUBSCRIBER_RETRY_DELAY_SECONDS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Running,
    Stopped,
}

pub struct Subscriber {
    service: Arc<dyn UserService>,
    input: ProcessMessageInput,
    policy: RetryPolicy,
    state: SubscriberState,
    consecutive_failures: u32,
}

impl Subscriber {
    pub fn new(service: Arc<dyn UserService>, input: ProcessMessageInput) -> Self {
        Self {
            service,
            input,
            policy: RetryPolicy::default(),
            state: SubscriberState::Running,
            consecutive_failures: 0,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> SubscriberState {
        self.state
    }

    /// Run until `shutdown` fires. Processing errors never end the loop.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> AppResult<()> {
        info!("Subscriber started");

        while self.state == SubscriberState::Running {
            if is_cancelled(&shutdown) {
                self.state = SubscriberState::Stopped;
                break;
            }

            let service = self.service.clone();
            let outcome = tokio::select! {
                outcome = service.process_message(self.input) => Some(outcome),
                _ = shutdown.wait_for(|cancelled| *cancelled) => None,
            };

            let Some(outcome) = outcome else {
                info!("Shutdown requested while processing, abandoning iteration");
                self.state = SubscriberState::Stopped;
                break;
            };

            match outcome {
                Ok(output) => {
                    self.consecutive_failures = 0;
                    match output {
                        Some(output) => debug!(user_id = %output.id, "Iteration processed a message"),
                        None => debug!("Iteration found no message"),
                    }
                    tokio::task::yield_now().await;
                }
                Err(e) => {
                    self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                    let delay = self.policy.delay(self.consecutive_failures);
                    error!(
                        error = %e,
                        code = e.code(),
                        consecutive_failures = self.consecutive_failures,
                        retry_in_ms = delay.as_millis() as u64,
                        "Failed to process message"
                    );

                    if wait_or_cancelled(&mut shutdown, delay).await {
                        self.state = SubscriberState::Stopped;
                    }
                }
            }
        }

        info!("Subscriber stopped");
        Ok(())
    }
}

fn is_cancelled(shutdown: &watch::Receiver<bool>) -> bool {
    // has_changed only errors once the sender is gone
    shutdown.has_changed().is_err() || *shutdown.borrow()
}

/// Sleep for `delay`; returns `true` if shutdown fired first.
async fn wait_or_cancelled(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown.wait_for(|cancelled| *cancelled) => true,
    }
}
