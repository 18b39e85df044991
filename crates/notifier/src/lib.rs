//! Extended queue client.
//!
//! Wraps a FIFO message queue so that oversized bodies are written to blob
//! storage and replaced by a small pointer message. Every send carries a
//! creation timestamp attribute and a fresh deduplication id.

pub mod attributes;
pub mod aws;
pub mod client;
pub mod error;
pub mod memory;
pub mod pointer;
pub mod transport;

pub use attributes::MessageAttribute;
pub use client::{ExtendedQueueClient, OffloadConfig};
pub use error::QueueError;
pub use pointer::OffloadPointer;
pub use transport::{BlobStore, QueueTransport, SendMessageRequest};
