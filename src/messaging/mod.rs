//! # Messaging Module
//!
//! Queue abstraction the worker consumes jobs from, the job message wire
//! format, and an in-memory provider.

pub mod errors;
pub mod in_memory;
pub mod message;
pub mod service;

pub use errors::{MessagingError, MessagingResult};
pub use in_memory::InMemoryMessagingService;
pub use message::JobMessage;
pub use service::{MessageId, MessagingService, QueueStats, QueuedMessage, ReceiptHandle};
