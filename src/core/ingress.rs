//! Request admission and envelope intake.
//!
//! `IngressService` runs one request through the fixed sequence
//!
//! ```text
//! Entered → [Shed | ReadBody] → [ReadError | EmptyPayload | Decode]
//!         → [DecodeError | Normalize] → Dispatch → Accepted
//! ```
//!
//! and reports the terminal outcome. It knows nothing about HTTP responses
//! beyond the status each outcome maps to; building the response is the
//! adapter's job. The admission guard is taken first and held until the
//! function returns, so the outstanding count is released after dispatch on
//! the happy path and on every early return, panic or cancellation.
use std::sync::Arc;

use axum::{body::Body, http::StatusCode};
use thiserror::Error;

use crate::{
    core::{
        admission::AdmissionController,
        envelope::{self, DecodeError, DispatchPriority},
        normalizer::{EnvelopeNormalizer, ModificationReason},
        payload::{PayloadError, read_payload},
    },
    metrics::IngressMetrics,
    ports::message_handler::MessageHandler,
};

pub const SHED_MESSAGE: &str = "Server overloaded, try again later.\n";
pub const READ_ERROR_MESSAGE: &str = "Unable to read request body.\n";
pub const EMPTY_PAYLOAD_MESSAGE: &str = "Empty payload.\n";
pub const INVALID_PAYLOAD_MESSAGE: &str = "Invalid payload format.\n";
pub const ACCEPTED_MESSAGE: &str = "Request placed on to queue.\n";

/// Terminal outcomes other than acceptance
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IngressError {
    /// Admission threshold exceeded; nothing was read
    #[error("admission threshold exceeded: {outstanding} outstanding, threshold {threshold}")]
    Shed { outstanding: i64, threshold: i64 },

    /// The body stream failed or was too large
    #[error("unable to read request body: {0}")]
    ReadError(#[source] axum::Error),

    /// Zero-length body
    #[error("empty payload")]
    EmptyPayload,

    /// The body is not a well-formed envelope
    #[error(transparent)]
    DecodeError(#[from] DecodeError),
}

impl IngressError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngressError::Shed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            IngressError::ReadError(_)
            | IngressError::EmptyPayload
            | IngressError::DecodeError(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Plain-text body returned to the client.
    pub fn message(&self) -> &'static str {
        match self {
            IngressError::Shed { .. } => SHED_MESSAGE,
            IngressError::ReadError(_) => READ_ERROR_MESSAGE,
            IngressError::EmptyPayload => EMPTY_PAYLOAD_MESSAGE,
            IngressError::DecodeError(_) => INVALID_PAYLOAD_MESSAGE,
        }
    }
}

/// An envelope that was normalized and handed downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub transaction_uuid: String,
    pub modification: Option<ModificationReason>,
}

impl Accepted {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::ACCEPTED
    }

    pub fn message(&self) -> &'static str {
        ACCEPTED_MESSAGE
    }
}

/// Orchestrates admission, body reading, decoding, normalization and dispatch.
pub struct IngressService {
    admission: Arc<AdmissionController>,
    normalizer: EnvelopeNormalizer,
    metrics: IngressMetrics,
    downstream: Arc<dyn MessageHandler>,
    max_body_bytes: usize,
}

impl IngressService {
    pub fn new(
        admission: Arc<AdmissionController>,
        metrics: IngressMetrics,
        downstream: Arc<dyn MessageHandler>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            admission,
            normalizer: EnvelopeNormalizer::new(metrics.clone()),
            metrics,
            downstream,
            max_body_bytes,
        }
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    /// Run one request body through the intake sequence.
    pub async fn handle(&self, body: Body) -> Result<Accepted, IngressError> {
        let guard = self.admission.admit();
        if guard.is_shed() {
            tracing::debug!(
                outstanding = guard.outstanding_on_entry(),
                threshold = self.admission.threshold(),
                "Shedding request"
            );
            return Err(IngressError::Shed {
                outstanding: guard.outstanding_on_entry(),
                threshold: self.admission.threshold(),
            });
        }

        let raw = match read_payload(body, self.max_body_bytes).await {
            Ok(raw) => raw,
            Err(PayloadError::Read(e)) => {
                self.metrics.record_read_error();
                tracing::error!(error = %e, "Unable to retrieve the request body");
                return Err(IngressError::ReadError(e));
            }
            Err(PayloadError::Empty) => {
                self.metrics.record_empty_payload();
                tracing::error!("Empty payload");
                return Err(IngressError::EmptyPayload);
            }
        };

        let envelope = envelope::decode(&raw).inspect_err(|e| {
            self.metrics.record_invalid_payload();
            tracing::warn!(error = %e, bytes = raw.len(), "Invalid payload format");
        })?;

        let (envelope, modification) = self.normalizer.normalize(envelope);
        let accepted = Accepted {
            transaction_uuid: envelope.transaction_uuid.clone(),
            modification,
        };

        tracing::debug!(
            transaction_uuid = %accepted.transaction_uuid,
            source = %envelope.source,
            destination = %envelope.destination,
            "Request placed on to queue"
        );
        self.downstream
            .handle_message(DispatchPriority::DEFAULT, envelope);

        drop(guard);
        Ok(accepted)
    }
}
