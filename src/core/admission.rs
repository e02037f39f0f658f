//! Advisory admission control.
//!
//! The controller owns the outstanding-request counter. Every request enters
//! before doing any work and leaves exactly once, whatever the outcome. When a
//! positive threshold is configured, a request whose entry pushes the count
//! above it is shed. Requests already admitted keep running, so the real
//! concurrency can briefly sit above the threshold.
//!
//! The scoped form ([`AdmissionController::admit`]) returns a guard that
//! leaves on `Drop`. That covers early returns, panics, and the transport
//! dropping the request future on client disconnect.
use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use metrics::Gauge;

/// Tracks in-flight requests and decides whether new ones are admitted.
pub struct AdmissionController {
    outstanding: AtomicI64,
    threshold: i64,
    in_flight: Gauge,
}

impl AdmissionController {
    /// `threshold <= 0` disables shedding.
    pub fn new(threshold: i64) -> Self {
        Self::with_gauge(threshold, Gauge::noop())
    }

    /// Like [`AdmissionController::new`], mirroring the count onto `in_flight`.
    pub fn with_gauge(threshold: i64, in_flight: Gauge) -> Self {
        Self {
            outstanding: AtomicI64::new(0),
            threshold,
            in_flight,
        }
    }

    /// Increment the outstanding count and return the post-increment value.
    pub fn enter(&self) -> i64 {
        self.in_flight.increment(1.0);
        self.outstanding.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the outstanding count. Pairs with exactly one [`enter`](Self::enter).
    pub fn exit(&self) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        self.in_flight.decrement(1.0);
    }

    /// Whether a request that observed `outstanding` on entry must be shed.
    pub fn should_shed(&self, outstanding: i64) -> bool {
        self.threshold > 0 && outstanding > self.threshold
    }

    /// Enter and return a guard that exits on drop.
    pub fn admit(self: &Arc<Self>) -> AdmissionGuard {
        let outstanding = self.enter();
        AdmissionGuard {
            controller: Arc::clone(self),
            outstanding,
        }
    }

    pub fn outstanding(&self) -> i64 {
        self.outstanding.load(Ordering::Acquire)
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn is_unbounded(&self) -> bool {
        self.threshold <= 0
    }
}

/// Scoped admission. Leaves the controller when dropped.
#[must_use = "dropping the guard immediately releases the admission slot"]
pub struct AdmissionGuard {
    controller: Arc<AdmissionController>,
    outstanding: i64,
}

impl AdmissionGuard {
    /// Outstanding count observed on entry, this request included.
    pub fn outstanding_on_entry(&self) -> i64 {
        self.outstanding
    }

    pub fn is_shed(&self) -> bool {
        self.controller.should_shed(self.outstanding)
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        self.controller.exit();
    }
}
