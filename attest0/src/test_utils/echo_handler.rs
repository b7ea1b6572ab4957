//! EchoHandler — answers every request with its own text.

use crate::error::HandlerError;
use crate::message::{Message, Reply, SendParams, StreamEvent, TaskState};
use crate::transport::{CallContext, EventStream, RequestHandler};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replies with `"echo: <first text part>"` and counts calls.
///
/// Reply ids are derived from the request's message id so both sides of an
/// exchange hash the same bytes.
#[derive(Default)]
pub struct EchoHandler {
    calls: AtomicUsize,
}

impl EchoHandler {
    /// Create a new EchoHandler.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many requests were handled.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reply_to(params: &SendParams) -> Message {
        let text = params.message.first_text().unwrap_or_default();
        let mut reply = Message::agent_text(
            format!("{}-reply", params.message.message_id),
            format!("echo: {text}"),
        );
        reply.context_id = params.message.context_id.clone();
        reply
    }
}

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn send_message(
        &self,
        params: SendParams,
        _ctx: &CallContext,
    ) -> Result<Reply, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Reply::Message(Self::reply_to(&params)))
    }

    async fn send_message_stream(
        &self,
        params: SendParams,
        _ctx: &CallContext,
    ) -> Result<EventStream, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let task_id = format!("{}-task", params.message.message_id);
        let events = vec![
            Ok(StreamEvent::StatusUpdate {
                task_id: task_id.clone(),
                state: TaskState::Working,
                is_final: false,
            }),
            Ok(StreamEvent::Message(Self::reply_to(&params))),
            Ok(StreamEvent::StatusUpdate {
                task_id,
                state: TaskState::Completed,
                is_final: true,
            }),
        ];
        Ok(futures::stream::iter(events).boxed())
    }
}

/// Fails every request with [`HandlerError::Failed`].
pub struct FailingHandler {
    reason: String,
}

impl FailingHandler {
    /// Create a handler that fails with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl RequestHandler for FailingHandler {
    async fn send_message(
        &self,
        _params: SendParams,
        _ctx: &CallContext,
    ) -> Result<Reply, HandlerError> {
        Err(HandlerError::Failed(self.reason.clone()))
    }

    async fn send_message_stream(
        &self,
        _params: SendParams,
        _ctx: &CallContext,
    ) -> Result<EventStream, HandlerError> {
        let events = vec![
            Ok(StreamEvent::StatusUpdate {
                task_id: "failing".into(),
                state: TaskState::Working,
                is_final: false,
            }),
            Err(HandlerError::Failed(self.reason.clone())),
        ];
        Ok(futures::stream::iter(events).boxed())
    }
}
