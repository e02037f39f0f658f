pub mod admission;
pub mod envelope;
pub mod ingress;
pub mod normalizer;
pub mod payload;

pub use admission::{AdmissionController, AdmissionGuard};
pub use envelope::{DispatchPriority, Envelope};
pub use ingress::{Accepted, IngressError, IngressService};
pub use normalizer::{EnvelopeNormalizer, ModificationReason};
