//! The agent-to-agent message model that the trace envelope rides on.
//!
//! Shapes follow the common JSON-RPC agent messaging convention
//! (camelCase fields, `kind`-tagged parts). The provenance protocol only
//! reads `parts`, the three correlation ids, `metadata`, and `extensions`;
//! everything else passes through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who authored a message.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The calling side.
    User,
    /// The responding agent.
    Agent,
}

/// One piece of message content.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// Structured data.
    Data {
        /// Arbitrary JSON payload.
        data: Value,
    },
    /// A file reference or inline file.
    File {
        /// File descriptor as sent on the wire.
        file: Value,
    },
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }
}

/// A protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique id of this message.
    pub message_id: String,
    /// Author role.
    pub role: Role,
    /// Content parts, in order.
    pub parts: Vec<Part>,
    /// Conversation-level correlation id from the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    /// Task-level correlation id from the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Extension metadata keyed by extension URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Extension URIs this message declares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
}

impl Message {
    /// Create a user message with a single text part.
    pub fn user_text(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            role: Role::User,
            parts: vec![Part::text(text)],
            context_id: None,
            task_id: None,
            metadata: None,
            extensions: None,
        }
    }

    /// Create an agent message with a single text part.
    pub fn agent_text(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            ..Self::user_text(message_id, text)
        }
    }

    /// Set the context id.
    #[must_use]
    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    /// Set the task id.
    #[must_use]
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// The first text part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Parameters of a `message/send` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    /// The message being sent.
    pub message: Message,
    /// Transport-specific send configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
    /// Request-level metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl SendParams {
    /// Wrap a message with no extra configuration.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            configuration: None,
            metadata: None,
        }
    }
}

/// Lifecycle state of a task.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Accepted, not started.
    Submitted,
    /// In progress.
    Working,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled by a client.
    Canceled,
}

/// A long-running unit of work returned instead of a direct message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task id.
    pub id: String,
    /// Conversation id the task belongs to.
    pub context_id: String,
    /// Current state.
    pub state: TaskState,
    /// Artifacts produced so far.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Value>,
}

/// What a `message/send` call returns.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Reply {
    /// A direct message reply.
    Message(Message),
    /// A task handle.
    Task(Task),
}

/// One event of a streamed response.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StreamEvent {
    /// A message.
    Message(Message),
    /// A full task snapshot.
    Task(Task),
    /// A task state change.
    StatusUpdate {
        /// Task the update belongs to.
        #[serde(rename = "taskId")]
        task_id: String,
        /// New state.
        state: TaskState,
        /// True on the last event of the stream.
        #[serde(rename = "final")]
        is_final: bool,
    },
    /// A new or updated artifact.
    ArtifactUpdate {
        /// Task the artifact belongs to.
        #[serde(rename = "taskId")]
        task_id: String,
        /// The artifact.
        artifact: Value,
    },
}

impl StreamEvent {
    /// True for the status update that closes the stream.
    pub fn is_final(&self) -> bool {
        matches!(self, StreamEvent::StatusUpdate { is_final: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_a_final_status_update_is_final() {
        let update = |is_final| StreamEvent::StatusUpdate {
            task_id: "t1".into(),
            state: TaskState::Completed,
            is_final,
        };
        assert!(update(true).is_final());
        assert!(!update(false).is_final());
        assert!(!StreamEvent::Message(Message::agent_text("m1", "hi")).is_final());
    }

    #[test]
    fn message_uses_camel_case_wire_names() {
        let msg = Message::user_text("m1", "ping").with_context_id("ctx");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            v,
            json!({
                "messageId": "m1",
                "role": "user",
                "parts": [{"kind": "text", "text": "ping"}],
                "contextId": "ctx"
            })
        );
    }

    #[test]
    fn reply_is_kind_tagged() {
        let reply = Reply::Message(Message::agent_text("m2", "pong"));
        let v = serde_json::to_value(&reply).unwrap();
        assert_eq!(v["kind"], "message");
        assert_eq!(v["role"], "agent");
        let back: Reply = serde_json::from_value(v).unwrap();
        assert_eq!(back, reply);
    }

    #[test]
    fn first_text_skips_non_text_parts() {
        let mut msg = Message::user_text("m1", "hello");
        msg.parts.insert(0, Part::Data { data: json!({"a": 1}) });
        assert_eq!(msg.first_text(), Some("hello"));
    }
}
