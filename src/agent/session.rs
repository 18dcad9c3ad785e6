//! Conversation sessions and streamed query events.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Stream of events produced by a single query.
pub type EventStream = BoxStream<'static, Result<QueryEvent>>;

/// A session created on an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Anything that can hold a conversation: a deployed engine or a local agent.
#[async_trait]
pub trait SessionEndpoint: Send + Sync {
    /// Open a new session for `user_id`.
    async fn create_session(&self, user_id: &str) -> Result<SessionInfo>;

    /// Send `message` within a session and stream back the agent's events.
    async fn stream_query(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream>;
}

/// One event emitted while an agent answers a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<EventContent>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<EventPart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl QueryEvent {
    /// Event carrying a single text part.
    pub fn text(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            content: Some(EventContent {
                role: Some("model".to_string()),
                parts: vec![EventPart {
                    text: Some(text.into()),
                    extra: Default::default(),
                }],
            }),
            extra: Default::default(),
        }
    }

    /// Non-empty text parts, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn texts_skip_empty_and_non_text_parts() {
        let event: QueryEvent = serde_json::from_value(json!({
            "author": "root_agent",
            "content": {
                "role": "model",
                "parts": [
                    {"text": "Hello"},
                    {"function_call": {"name": "lookup", "args": {}}},
                    {"text": ""},
                    {"text": "World"}
                ]
            },
            "invocation_id": "e-123"
        }))
        .unwrap();

        assert_eq!(event.texts().collect::<Vec<_>>(), vec!["Hello", "World"]);
        assert_eq!(event.extra["invocation_id"], json!("e-123"));
    }

    #[test]
    fn event_without_content_has_no_text() {
        let event: QueryEvent = serde_json::from_value(json!({"actions": {}})).unwrap();
        assert_eq!(event.texts().count(), 0);
    }

    #[test]
    fn session_info_accepts_camel_case_user_id() {
        let info: SessionInfo =
            serde_json::from_value(json!({"id": "s-1", "userId": "alice"})).unwrap();
        assert_eq!(info.user_id.as_deref(), Some("alice"));
    }
}
