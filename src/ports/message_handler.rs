use thiserror::Error;

use crate::core::envelope::{DispatchPriority, Envelope};

/// Error type for handing an accepted envelope to the downstream component
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispatchError {
    /// The downstream queue is at capacity
    #[error("dispatch queue is full")]
    QueueFull,

    /// The downstream consumer has gone away
    #[error("dispatch queue is closed")]
    QueueClosed,
}

impl DispatchError {
    pub const QUEUE_FULL: &'static str = "queue-full";
    pub const QUEUE_CLOSED: &'static str = "queue-closed";

    /// Metric label for this failure.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::QueueFull => Self::QUEUE_FULL,
            DispatchError::QueueClosed => Self::QUEUE_CLOSED,
        }
    }
}

/// MessageHandler defines the port to the downstream delivery component
///
/// Implementations must not block: the ingress path calls this while the
/// request is still counted as outstanding, and the call is fire-and-forget.
/// Ownership of the envelope moves to the implementation.
pub trait MessageHandler: Send + Sync + 'static {
    /// Hand over one normalized envelope
    ///
    /// # Arguments
    /// * `priority` - Delivery priority; the ingress edge always passes the default
    /// * `message` - The normalized envelope
    fn handle_message(&self, priority: DispatchPriority, message: Envelope);
}
