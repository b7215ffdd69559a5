//! Request/reply plumbing for the cweather responder and requestor.

pub mod requestor;
pub mod responder;
pub mod server;
pub mod shutdown;
pub mod transport;

pub use requestor::{RequestError, Requestor};
pub use responder::{error_reply, Responder};
pub use server::{ServeStats, Server};
pub use shutdown::ShutdownHandle;
pub use transport::{
    ConnectionObserver, InboundRequest, LoggingObserver, NatsReplySink, NatsRequestSource,
    ReplySink, RequestSource, TransportEvent,
};
