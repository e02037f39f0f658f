//! wrp-ingress - the HTTP ingress edge of a WRP message-routing service.
//!
//! Producers POST a msgpack-encoded WRP envelope to the notify path. Each
//! request is admitted or shed (503), its body is read (400 on read failure or
//! an empty body), decoded (400 on malformed input), normalized, and handed to
//! a downstream [`MessageHandler`](ports::MessageHandler) at priority 0. The
//! client receives 202 as soon as the handoff is done; delivery is never
//! awaited.
//!
//! # Normalization
//! Envelopes without a content type get `application/json`. Envelopes without
//! a transaction id get a fresh UUID v4. Each repair increments
//! `modifiedEnvelopeCount{reason}` with one of `content-type-empty`,
//! `transaction-id-empty` or `both-empty`.
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use wrp_ingress::{
//!     AdmissionController, IngressService, QueueDispatcher, metrics::IngressMetrics,
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let metrics = IngressMetrics::register();
//! let (dispatcher, rx) = QueueDispatcher::channel(1024, metrics.clone());
//! tokio::spawn(wrp_ingress::adapters::log_dispatched(rx));
//!
//! let service = IngressService::new(
//!     Arc::new(AdmissionController::new(100)),
//!     metrics,
//!     Arc::new(dispatcher),
//!     1024 * 1024,
//! );
//! // Wire `service` into `HttpHandler` and `build_router` (see the binary crate)
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! `ports` holds the downstream trait, `adapters` the HTTP surface and the
//! queue-backed handler, and `core` the request sequence itself.
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

pub use crate::{
    adapters::{HttpHandler, QueueDispatcher, build_router},
    core::{AdmissionController, Envelope, IngressService},
    ports::MessageHandler,
    utils::GracefulShutdown,
};
