//! LocalTransport — in-process transport straight into a RequestHandler.

use crate::error::{HandlerError, TransportError};
use crate::message::{Reply, SendParams};
use crate::transport::{CallContext, RequestHandler, Transport};
use async_trait::async_trait;
use std::sync::Arc;

/// Delivers requests to a [`RequestHandler`] in the same process.
///
/// Params and replies take a JSON round-trip on the way through so the
/// handler sees exactly what a wire transport would deliver.
pub struct LocalTransport {
    handler: Arc<dyn RequestHandler>,
    ctx: CallContext,
}

impl LocalTransport {
    /// Create a transport that calls `handler` with an unauthenticated context.
    pub fn new(handler: Arc<dyn RequestHandler>) -> Self {
        Self {
            handler,
            ctx: CallContext::default(),
        }
    }

    /// Use the given server call context for every request.
    #[must_use]
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.ctx = ctx;
        self
    }
}

fn over_the_wire<T: serde::Serialize + serde::de::DeserializeOwned>(
    value: &T,
) -> Result<T, TransportError> {
    let bytes = serde_json::to_vec(value).map_err(|e| TransportError::Other(Box::new(e)))?;
    serde_json::from_slice(&bytes).map_err(|e| TransportError::Other(Box::new(e)))
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send_message(&self, params: SendParams) -> Result<Reply, TransportError> {
        let delivered = over_the_wire(&params)?;
        match self.handler.send_message(delivered, &self.ctx).await {
            Ok(reply) => over_the_wire(&reply),
            Err(HandlerError::InvalidRequest(msg)) => Err(TransportError::Remote {
                code: -32602,
                message: msg,
            }),
            Err(e) => Err(TransportError::Remote {
                code: -32603,
                message: e.to_string(),
            }),
        }
    }
}
