//! # In-Memory Messaging Service
//!
//! Thread-safe in-memory queues for development and testing. Supports
//! visibility timeouts, redelivery and receive counts.
//!
//! Receipt handles are `{message_id}:{receive_count}`, so a handle is only
//! valid for the delivery that issued it. Once a message is redelivered, the
//! earlier consumer's ack or nack is rejected.

use super::{
    MessageId, MessagingError, MessagingResult, MessagingService, QueueStats, QueuedMessage,
    ReceiptHandle,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredMessage {
    id: u64,
    payload: Vec<u8>,
    enqueued_at: DateTime<Utc>,
    /// `None` means visible now
    visible_at: Option<Instant>,
    receive_count: u32,
}

impl StoredMessage {
    fn is_visible(&self, now: Instant) -> bool {
        match self.visible_at {
            None => true,
            Some(at) => now >= at,
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryQueue {
    messages: VecDeque<StoredMessage>,
}

#[derive(Debug)]
pub struct InMemoryMessagingService {
    queues: RwLock<HashMap<String, InMemoryQueue>>,
    next_id: AtomicU64,
}

impl Default for InMemoryMessagingService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessagingService {
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn receipt_for(message: &StoredMessage) -> ReceiptHandle {
        ReceiptHandle(format!("{}:{}", message.id, message.receive_count))
    }

    fn parse_handle(receipt_handle: &ReceiptHandle) -> MessagingResult<(u64, u32)> {
        let invalid = || MessagingError::invalid_receipt_handle(receipt_handle.as_str());
        let (id, receive_count) = receipt_handle.as_str().split_once(':').ok_or_else(invalid)?;
        Ok((
            id.parse().map_err(|_| invalid())?,
            receive_count.parse().map_err(|_| invalid())?,
        ))
    }

    /// Position of the message the handle was issued for, rejecting handles
    /// from an earlier delivery
    fn locate(
        queue: &InMemoryQueue,
        queue_name: &str,
        operation: &str,
        receipt_handle: &ReceiptHandle,
    ) -> MessagingResult<usize> {
        let (id, receive_count) = Self::parse_handle(receipt_handle)?;
        let position = queue
            .messages
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| MessagingError::message_not_found(receipt_handle.as_str()))?;

        let current = queue.messages[position].receive_count;
        if current != receive_count {
            return Err(MessagingError::queue_operation(
                queue_name,
                operation,
                format!(
                    "stale receipt handle {receipt_handle}: message redelivered (receive {current})"
                ),
            ));
        }
        Ok(position)
    }
}

#[async_trait]
impl MessagingService for InMemoryMessagingService {
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        self.queues
            .write()
            .await
            .entry(queue_name.to_string())
            .or_default();
        Ok(())
    }

    async fn send_message(
        &self,
        queue_name: &str,
        payload: Vec<u8>,
    ) -> MessagingResult<MessageId> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        queue.messages.push_back(StoredMessage {
            id,
            payload,
            enqueued_at: Utc::now(),
            visible_at: None,
            receive_count: 0,
        });
        Ok(MessageId::from(id))
    }

    async fn receive_messages(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<QueuedMessage>> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let now = Instant::now();
        let mut received = Vec::new();
        for message in queue.messages.iter_mut() {
            if received.len() >= max_messages {
                break;
            }
            if !message.is_visible(now) {
                continue;
            }
            message.visible_at = Some(now + visibility_timeout);
            message.receive_count += 1;
            received.push(QueuedMessage {
                receipt_handle: Self::receipt_for(message),
                payload: message.payload.clone(),
                receive_count: message.receive_count,
                enqueued_at: message.enqueued_at,
            });
        }
        Ok(received)
    }

    async fn ack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> MessagingResult<()> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let position = Self::locate(queue, queue_name, "ack", receipt_handle)?;
        queue.messages.remove(position);
        Ok(())
    }

    async fn nack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
        requeue: bool,
    ) -> MessagingResult<()> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let position = Self::locate(queue, queue_name, "nack", receipt_handle)?;

        if requeue {
            if let Some(message) = queue.messages.get_mut(position) {
                message.visible_at = None;
            }
        } else {
            queue.messages.remove(position);
        }
        Ok(())
    }

    async fn queue_stats(&self, queue_name: &str) -> MessagingResult<QueueStats> {
        let queues = self.queues.read().await;
        let queue = queues
            .get(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let now = Instant::now();
        let in_flight = queue
            .messages
            .iter()
            .filter(|m| !m.is_visible(now))
            .count();
        Ok(QueueStats {
            queue_name: queue_name.to_string(),
            message_count: queue.messages.len() as u64,
            in_flight_count: in_flight as u64,
        })
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUEUE: &str = "bill-ingest-jobs";

    async fn service() -> InMemoryMessagingService {
        let service = InMemoryMessagingService::new();
        service.ensure_queue(QUEUE).await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let service = service().await;
        service.send_message(QUEUE, b"one".to_vec()).await.unwrap();

        let messages = service
            .receive_messages(QUEUE, 10, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].payload, b"one");
        assert_eq!(messages[0].receive_count, 1);

        // Invisible while in flight
        let again = service
            .receive_messages(QUEUE, 10, Duration::from_secs(30))
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_ack_removes_message() {
        let service = service().await;
        service.send_message(QUEUE, b"one".to_vec()).await.unwrap();
        let messages = service
            .receive_messages(QUEUE, 1, Duration::from_secs(30))
            .await
            .unwrap();

        service
            .ack_message(QUEUE, &messages[0].receipt_handle)
            .await
            .unwrap();

        let stats = service.queue_stats(QUEUE).await.unwrap();
        assert_eq!(stats.message_count, 0);
    }

    #[tokio::test]
    async fn test_nack_requeue_redelivers() {
        let service = service().await;
        service.send_message(QUEUE, b"one".to_vec()).await.unwrap();
        let first = service
            .receive_messages(QUEUE, 1, Duration::from_secs(30))
            .await
            .unwrap();

        service
            .nack_message(QUEUE, &first[0].receipt_handle, true)
            .await
            .unwrap();

        let second = service
            .receive_messages(QUEUE, 1, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].receive_count, 2);
    }

    #[tokio::test]
    async fn test_nack_without_requeue_drops() {
        let service = service().await;
        service.send_message(QUEUE, b"one".to_vec()).await.unwrap();
        let first = service
            .receive_messages(QUEUE, 1, Duration::from_secs(30))
            .await
            .unwrap();

        service
            .nack_message(QUEUE, &first[0].receipt_handle, false)
            .await
            .unwrap();

        assert_eq!(service.queue_stats(QUEUE).await.unwrap().message_count, 0);
    }

    #[tokio::test]
    async fn test_visibility_timeout_expiry_redelivers() {
        let service = service().await;
        service.send_message(QUEUE, b"one".to_vec()).await.unwrap();
        service
            .receive_messages(QUEUE, 1, Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        let redelivered = service
            .receive_messages(QUEUE, 1, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].receive_count, 2);
    }

    #[tokio::test]
    async fn test_stale_receipt_cannot_settle_redelivery() {
        let service = service().await;
        service.send_message(QUEUE, b"one".to_vec()).await.unwrap();
        let first = service
            .receive_messages(QUEUE, 1, Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = service
            .receive_messages(QUEUE, 1, Duration::from_secs(30))
            .await
            .unwrap();
        assert_ne!(first[0].receipt_handle, second[0].receipt_handle);

        // The first consumer's visibility lapsed; its ack must not remove the
        // message the second consumer is still working on
        let stale_ack = service.ack_message(QUEUE, &first[0].receipt_handle).await;
        assert!(matches!(
            stale_ack,
            Err(MessagingError::QueueOperation { ref operation, .. }) if operation == "ack"
        ));
        let stale_nack = service
            .nack_message(QUEUE, &first[0].receipt_handle, true)
            .await;
        assert!(matches!(stale_nack, Err(MessagingError::QueueOperation { .. })));

        let stats = service.queue_stats(QUEUE).await.unwrap();
        assert_eq!(stats.message_count, 1);
        assert_eq!(stats.in_flight_count, 1);

        service
            .ack_message(QUEUE, &second[0].receipt_handle)
            .await
            .unwrap();
        assert_eq!(service.queue_stats(QUEUE).await.unwrap().message_count, 0);
    }

    #[tokio::test]
    async fn test_malformed_receipt_handle() {
        let service = service().await;
        for handle in ["7", "x:1", "7:y"] {
            assert!(matches!(
                service.ack_message(QUEUE, &ReceiptHandle::from(handle)).await,
                Err(MessagingError::InvalidReceiptHandle { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_queue() {
        let service = InMemoryMessagingService::new();
        assert!(matches!(
            service.send_message("missing", Vec::new()).await,
            Err(MessagingError::QueueNotFound { .. })
        ));
    }
}
