//! Metric definitions for the ingress edge.
//!
//! Everything is emitted through the `metrics` crate facade. The facade is
//! infallible and silently discards events when no recorder is installed, so
//! nothing in this module can fail a request. The binary installs a
//! Prometheus recorder (see [`init_metrics`]); tests install a local
//! debugging recorder while registering handles.
//!
//! Provided metrics:
//! * `errorRequests` (counter) - request bodies that could not be read
//! * `emptyRequests` (counter) - zero-length request bodies
//! * `invalidRequests` (counter) - bodies that failed envelope decoding
//! * `modifiedEnvelopeCount` (counter, label `reason`) - normalization repairs
//! * `droppedMessages` (counter, label `reason`) - accepted envelopes the
//!   downstream queue could not take
//! * `incomingQueueDepth` (gauge) - requests currently in flight
//!
//! Handles are resolved once in [`IngressMetrics::register`] so the hot path
//! only touches atomics.
use eyre::{Result, WrapErr};
use metrics::{Counter, Gauge, Unit, counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::{
    config::MetricsConfig, core::normalizer::ModificationReason,
    ports::message_handler::DispatchError,
};

pub const ERROR_REQUESTS: &str = "errorRequests";
pub const EMPTY_REQUESTS: &str = "emptyRequests";
pub const INVALID_REQUESTS: &str = "invalidRequests";
pub const MODIFIED_ENVELOPE_COUNT: &str = "modifiedEnvelopeCount"; // labels: reason
pub const DROPPED_MESSAGES: &str = "droppedMessages"; // labels: reason
pub const INCOMING_QUEUE_DEPTH: &str = "incomingQueueDepth";

pub const REASON_LABEL: &str = "reason";

/// Register metric descriptions with the currently installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        ERROR_REQUESTS,
        Unit::Count,
        "Requests whose body could not be read."
    );
    describe_counter!(
        EMPTY_REQUESTS,
        Unit::Count,
        "Requests that arrived with an empty body."
    );
    describe_counter!(
        INVALID_REQUESTS,
        Unit::Count,
        "Requests whose body was not a well-formed WRP envelope."
    );
    describe_counter!(
        MODIFIED_ENVELOPE_COUNT,
        Unit::Count,
        "Envelopes that needed required fields defaulted, by reason."
    );
    describe_counter!(
        DROPPED_MESSAGES,
        Unit::Count,
        "Accepted envelopes the dispatch queue could not take, by reason."
    );
    describe_gauge!(
        INCOMING_QUEUE_DEPTH,
        Unit::Count,
        "Number of ingress requests currently in flight."
    );
}

/// Install the Prometheus recorder when metrics are enabled.
///
/// Returns the handle used to render the scrape endpoint, or `None` when
/// metrics are disabled (all emission then becomes a no-op).
pub fn init_metrics(config: &MetricsConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        tracing::info!("Metrics disabled; metric events will be discarded");
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .wrap_err("Failed to install Prometheus metrics recorder")?;
    describe_metrics();

    tracing::info!(path = %config.path, "Prometheus metrics recorder installed");
    Ok(Some(handle))
}

/// Pre-resolved metric handles shared by every request.
#[derive(Clone)]
pub struct IngressMetrics {
    error_requests: Counter,
    empty_requests: Counter,
    invalid_requests: Counter,
    content_type_empty: Counter,
    transaction_id_empty: Counter,
    both_empty: Counter,
    dropped_queue_full: Counter,
    dropped_queue_closed: Counter,
    incoming_queue_depth: Gauge,
}

impl IngressMetrics {
    /// Resolve handles against the recorder active at call time.
    pub fn register() -> Self {
        let modified = |reason: ModificationReason| {
            counter!(MODIFIED_ENVELOPE_COUNT, REASON_LABEL => reason.as_label())
        };
        let dropped = |reason: &'static str| counter!(DROPPED_MESSAGES, REASON_LABEL => reason);

        Self {
            error_requests: counter!(ERROR_REQUESTS),
            empty_requests: counter!(EMPTY_REQUESTS),
            invalid_requests: counter!(INVALID_REQUESTS),
            content_type_empty: modified(ModificationReason::ContentTypeEmpty),
            transaction_id_empty: modified(ModificationReason::TransactionIdEmpty),
            both_empty: modified(ModificationReason::BothEmpty),
            dropped_queue_full: dropped(DispatchError::QUEUE_FULL),
            dropped_queue_closed: dropped(DispatchError::QUEUE_CLOSED),
            incoming_queue_depth: gauge!(INCOMING_QUEUE_DEPTH),
        }
    }

    /// Handles that discard every event.
    pub fn noop() -> Self {
        Self {
            error_requests: Counter::noop(),
            empty_requests: Counter::noop(),
            invalid_requests: Counter::noop(),
            content_type_empty: Counter::noop(),
            transaction_id_empty: Counter::noop(),
            both_empty: Counter::noop(),
            dropped_queue_full: Counter::noop(),
            dropped_queue_closed: Counter::noop(),
            incoming_queue_depth: Gauge::noop(),
        }
    }

    pub fn record_read_error(&self) {
        self.error_requests.increment(1);
    }

    pub fn record_empty_payload(&self) {
        self.empty_requests.increment(1);
    }

    pub fn record_invalid_payload(&self) {
        self.invalid_requests.increment(1);
    }

    pub fn record_modified(&self, reason: ModificationReason) {
        match reason {
            ModificationReason::ContentTypeEmpty => self.content_type_empty.increment(1),
            ModificationReason::TransactionIdEmpty => self.transaction_id_empty.increment(1),
            ModificationReason::BothEmpty => self.both_empty.increment(1),
        }
    }

    pub fn record_dropped(&self, error: &DispatchError) {
        match error {
            DispatchError::QueueFull => self.dropped_queue_full.increment(1),
            DispatchError::QueueClosed => self.dropped_queue_closed.increment(1),
        }
    }

    /// Gauge mirrored by the admission guard. Observability only.
    pub fn incoming_queue_depth(&self) -> &Gauge {
        &self.incoming_queue_depth
    }
}

impl Default for IngressMetrics {
    fn default() -> Self {
        Self::noop()
    }
}
