//! The application-layer transport: the calling side's send operation and
//! the receiving side's request handler.
//!
//! The provenance protocol decorates both without knowing how bytes move.

use crate::error::{HandlerError, TransportError};
use crate::id::AgentId;
use crate::message::{Reply, SendParams, StreamEvent};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Calling side: send a request and await the reply.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `message/send` to the remote agent.
    async fn send_message(&self, params: SendParams) -> Result<Reply, TransportError>;
}

/// What the server knows about the call, outside the message itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    /// Authenticated caller, if the server authenticated one.
    pub caller: Option<AgentId>,
}

impl CallContext {
    /// Context for an authenticated caller.
    pub fn authenticated(caller: impl Into<AgentId>) -> Self {
        Self {
            caller: Some(caller.into()),
        }
    }
}

/// A stream of response events.
pub type EventStream = BoxStream<'static, Result<StreamEvent, HandlerError>>;

/// Receiving side: produce a response to an incoming request.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle `message/send`.
    async fn send_message(
        &self,
        params: SendParams,
        ctx: &CallContext,
    ) -> Result<Reply, HandlerError>;

    /// Handle `message/stream`.
    async fn send_message_stream(
        &self,
        params: SendParams,
        ctx: &CallContext,
    ) -> Result<EventStream, HandlerError>;
}
