//! Bounded-queue handoff to the downstream delivery component.
//!
//! The ingress path must never wait on delivery, so `handle_message` uses
//! `try_send`. A full or closed queue drops the envelope; the drop is logged
//! and counted, and the client still sees the request as accepted.
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    core::envelope::{DispatchPriority, Envelope},
    metrics::IngressMetrics,
    ports::message_handler::{DispatchError, MessageHandler},
};

/// One unit of work handed to the downstream consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedMessage {
    pub priority: DispatchPriority,
    pub envelope: Envelope,
}

/// `MessageHandler` backed by a bounded `tokio` mpsc channel.
#[derive(Clone)]
pub struct QueueDispatcher {
    tx: mpsc::Sender<DispatchedMessage>,
    metrics: IngressMetrics,
}

impl QueueDispatcher {
    /// Create the dispatcher and the receiving end for the downstream consumer.
    ///
    /// `capacity` must be non-zero.
    pub fn channel(
        capacity: usize,
        metrics: IngressMetrics,
    ) -> (Self, mpsc::Receiver<DispatchedMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, metrics }, rx)
    }

    /// Enqueue without waiting.
    pub fn try_dispatch(
        &self,
        priority: DispatchPriority,
        envelope: Envelope,
    ) -> Result<(), DispatchError> {
        self.tx
            .try_send(DispatchedMessage { priority, envelope })
            .map_err(|e| match e {
                TrySendError::Full(_) => DispatchError::QueueFull,
                TrySendError::Closed(_) => DispatchError::QueueClosed,
            })
    }

    /// Free slots left in the queue.
    pub fn remaining_capacity(&self) -> usize {
        self.tx.capacity()
    }
}

impl MessageHandler for QueueDispatcher {
    fn handle_message(&self, priority: DispatchPriority, message: Envelope) {
        let transaction_uuid = message.transaction_uuid.clone();
        if let Err(e) = self.try_dispatch(priority, message) {
            self.metrics.record_dropped(&e);
            tracing::warn!(
                error = %e,
                reason = e.as_label(),
                transaction_uuid = %transaction_uuid,
                "Dropping accepted envelope"
            );
        }
    }
}

/// Drain the queue into the log until every sender is gone.
///
/// Stands in for the delivery fan-out when the service runs on its own.
/// Returns the number of envelopes consumed.
pub async fn log_dispatched(mut rx: mpsc::Receiver<DispatchedMessage>) -> u64 {
    let mut consumed = 0;
    while let Some(DispatchedMessage { priority, envelope }) = rx.recv().await {
        consumed += 1;
        tracing::info!(
            priority = %priority,
            msg_type = envelope.message_type,
            source = %envelope.source,
            destination = %envelope.destination,
            transaction_uuid = %envelope.transaction_uuid,
            content_type = %envelope.content_type,
            payload_bytes = envelope.payload.len(),
            "Dispatched envelope"
        );
    }
    tracing::info!(consumed, "Dispatch queue closed");
    consumed
}
