//! # Job Worker
//!
//! Polls the ingest subscription and runs the handler for each delivery,
//! bounded by `max_concurrent_messages`. The handler's outcome decides
//! between ack and nack; the worker itself never retries.

use super::{Acknowledgement, HandlerOutcome, JobMessageHandler};
use crate::config::BillflowConfig;
use crate::logging::log_error;
use crate::messaging::{MessagingError, MessagingService, QueuedMessage};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

pub struct JobWorker {
    messaging: Arc<dyn MessagingService>,
    handler: Arc<JobMessageHandler>,
    subscription: String,
    semaphore: Arc<Semaphore>,
    receive_batch_size: usize,
    visibility_timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for JobWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobWorker")
            .field("provider", &self.messaging.provider_name())
            .field("subscription", &self.subscription)
            .field("available_permits", &self.semaphore.available_permits())
            .finish()
    }
}

impl JobWorker {
    pub fn new(
        messaging: Arc<dyn MessagingService>,
        handler: Arc<JobMessageHandler>,
        config: &BillflowConfig,
    ) -> Self {
        Self {
            messaging,
            handler,
            subscription: config.subscription.clone(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_messages)),
            receive_batch_size: config.receive_batch_size,
            visibility_timeout: config.visibility_timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// Receive one batch, handle every message and settle it.
    ///
    /// Returns the number of messages received.
    #[instrument(skip(self), fields(subscription = %self.subscription))]
    pub async fn run_once(&self) -> Result<usize, MessagingError> {
        let messages = self
            .messaging
            .receive_messages(
                &self.subscription,
                self.receive_batch_size,
                self.visibility_timeout,
            )
            .await?;

        if messages.is_empty() {
            return Ok(0);
        }
        let message_count = messages.len();
        debug!(message_count, "Processing batch of job messages");

        let mut tasks = Vec::with_capacity(message_count);
        for message in messages {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| MessagingError::internal(format!("worker pool closed: {e}")))?;
            let messaging = self.messaging.clone();
            let handler = self.handler.clone();
            let subscription = self.subscription.clone();

            tasks.push(tokio::spawn(async move {
                let outcome = handler.handle_payload(&message.payload).await;
                settle(messaging.as_ref(), &subscription, &message, &outcome).await;
                drop(permit);
            }));
        }

        for result in join_all(tasks).await {
            if let Err(e) = result {
                error!(error = %e, "Job handler task panicked");
            }
        }

        Ok(message_count)
    }

    /// Poll until `shutdown` flips to true.
    ///
    /// Empty polls and receive errors back off for `poll_interval`; a
    /// non-empty batch is followed immediately by the next poll.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), MessagingError> {
        self.messaging.ensure_queue(&self.subscription).await?;
        info!(
            subscription = %self.subscription,
            provider = self.messaging.provider_name(),
            max_job_attempts = self.handler.max_job_attempts(),
            "Starting job worker"
        );

        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }

            let idle = match self.run_once().await {
                Ok(count) => count == 0,
                Err(e) => {
                    log_error(
                        "job_worker",
                        "receive_messages",
                        &e.to_string(),
                        Some(&self.subscription),
                    );
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = sleep(self.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        info!(subscription = %self.subscription, "Job worker stopped");
        Ok(())
    }
}

async fn settle(
    messaging: &dyn MessagingService,
    subscription: &str,
    message: &QueuedMessage,
    outcome: &HandlerOutcome,
) {
    let result = match outcome.acknowledgement() {
        Acknowledgement::Ack => messaging.ack_message(subscription, &message.receipt_handle).await,
        Acknowledgement::Nack => {
            messaging
                .nack_message(subscription, &message.receipt_handle, true)
                .await
        }
    };

    if let Err(e) = result {
        // The visibility timeout redelivers the message
        warn!(
            receipt_handle = %message.receipt_handle,
            receive_count = message.receive_count,
            outcome = outcome.as_str(),
            error = %e,
            "Failed to settle job message"
        );
    }
}
