pub mod http_handler;
pub mod queue_dispatcher;

/// Re-export commonly used types from adapters
pub use http_handler::{HttpHandler, build_router};
pub use queue_dispatcher::{DispatchedMessage, QueueDispatcher, log_dispatched};
