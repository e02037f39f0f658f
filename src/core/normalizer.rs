//! Envelope normalization.
//!
//! Two WRP fields are required downstream but optional on the wire. The
//! normalizer fills them in and reports which ones it had to touch:
//!
//! | `content_type` | `transaction_uuid` | action                         | reason                 |
//! |----------------|--------------------|--------------------------------|------------------------|
//! | empty          | set                | `application/json`             | `content-type-empty`   |
//! | set            | empty              | fresh UUID v4                  | `transaction-id-empty` |
//! | empty          | empty              | both of the above              | `both-empty`           |
//! | set            | set                | none                           | none                   |
use std::fmt;

use uuid::Uuid;

use crate::{core::envelope::Envelope, metrics::IngressMetrics};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Which required fields had to be defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModificationReason {
    ContentTypeEmpty,
    TransactionIdEmpty,
    BothEmpty,
}

impl ModificationReason {
    /// Derive the reason from the fields' emptiness before any repair.
    pub fn from_missing(content_type: bool, transaction_id: bool) -> Option<Self> {
        match (content_type, transaction_id) {
            (true, true) => Some(Self::BothEmpty),
            (true, false) => Some(Self::ContentTypeEmpty),
            (false, true) => Some(Self::TransactionIdEmpty),
            (false, false) => None,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Self::ContentTypeEmpty => "content-type-empty",
            Self::TransactionIdEmpty => "transaction-id-empty",
            Self::BothEmpty => "both-empty",
        }
    }
}

impl fmt::Display for ModificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Fill `content_type` and `transaction_uuid` when empty. No other field is touched.
pub fn fill_required_fields(envelope: &mut Envelope) -> Option<ModificationReason> {
    let reason = ModificationReason::from_missing(
        envelope.content_type.is_empty(),
        envelope.transaction_uuid.is_empty(),
    );

    if envelope.content_type.is_empty() {
        envelope.content_type = DEFAULT_CONTENT_TYPE.to_string();
    }
    if envelope.transaction_uuid.is_empty() {
        envelope.transaction_uuid = Uuid::new_v4().to_string();
    }

    reason
}

/// Applies [`fill_required_fields`] and records one metric event per repaired envelope.
#[derive(Clone, Default)]
pub struct EnvelopeNormalizer {
    metrics: IngressMetrics,
}

impl EnvelopeNormalizer {
    pub fn new(metrics: IngressMetrics) -> Self {
        Self { metrics }
    }

    pub fn normalize(&self, mut envelope: Envelope) -> (Envelope, Option<ModificationReason>) {
        let reason = fill_required_fields(&mut envelope);
        if let Some(reason) = reason {
            self.metrics.record_modified(reason);
            tracing::debug!(
                reason = %reason,
                transaction_uuid = %envelope.transaction_uuid,
                "Defaulted required envelope fields"
            );
        }
        (envelope, reason)
    }
}
