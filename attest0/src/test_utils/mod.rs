//! In-memory collaborators for testing.
//!
//! Available behind the `test-utils` feature flag. These are minimal
//! implementations that prove the trait APIs are usable end to end.

mod echo_handler;
mod local_transport;
mod static_registry;

pub use echo_handler::{EchoHandler, FailingHandler};
pub use local_transport::LocalTransport;
pub use static_registry::StaticRegistry;
