//! # Messaging Service
//!
//! Provider-agnostic queue operations the worker consumes. Delivery is
//! at-least-once: a message that is neither acked nor nacked becomes visible
//! again once its visibility timeout lapses.

use super::MessagingResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Unique identifier for a queued message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Handle for acknowledging a received message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(pub String);

impl ReceiptHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReceiptHandle {
    fn from(handle: &str) -> Self {
        Self(handle.to_string())
    }
}

/// A message received from a queue with delivery metadata
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    /// Handle for acknowledging this delivery
    pub receipt_handle: ReceiptHandle,

    /// Raw payload as published
    pub payload: Vec<u8>,

    /// Number of times this message has been delivered, this delivery included
    pub receive_count: u32,

    /// When the message was originally enqueued
    pub enqueued_at: DateTime<Utc>,
}

/// Queue statistics for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub queue_name: String,
    /// Total number of messages in the queue (visible + invisible)
    pub message_count: u64,
    /// Messages received but not yet acked or nacked
    pub in_flight_count: u64,
}

#[async_trait]
pub trait MessagingService: Send + Sync + 'static {
    /// Create a queue if it doesn't exist (idempotent)
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()>;

    /// Publish a payload, returning the provider's message id
    async fn send_message(
        &self,
        queue_name: &str,
        payload: Vec<u8>,
    ) -> MessagingResult<MessageId>;

    /// Receive up to `max_messages` visible messages.
    ///
    /// Received messages stay invisible to other consumers for
    /// `visibility_timeout`, then are redelivered unless acked.
    async fn receive_messages(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<QueuedMessage>>;

    /// Acknowledge processing; the message is removed and never redelivered
    async fn ack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> MessagingResult<()>;

    /// Negative acknowledge. `requeue=true` makes the message visible again
    /// for redelivery; `requeue=false` removes it (dead-letter).
    async fn nack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
        requeue: bool,
    ) -> MessagingResult<()>;

    async fn queue_stats(&self, queue_name: &str) -> MessagingResult<QueueStats>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
