//! Notification sink: how the chat session talks to the UI.
//!
//! Posting is fire-and-forget: a UI that has gone away must not fail the
//! session, so send errors are logged and dropped.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::response::{Recommendation, RequestId};

/// Receives user-visible chat output.
pub trait NotificationSink: Send + Sync {
    fn post_user(&self, text: &str);

    /// `streaming` is true for live token updates and false for the final text.
    fn post_assistant(&self, text: &str, streaming: bool);

    fn post_error(&self, text: &str);

    /// Ask the user to apply or reject the recommendations of `request_id`.
    fn post_recommendation_prompt(
        &self,
        request_id: &RequestId,
        recommendations: &[Recommendation],
        summary: &str,
    );
}

// ─── ChatEvent ──────────────────────────────────────────────────────────────

/// A serializable notification, one per sink call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatEvent {
    UserMessage {
        text: String,
    },
    AssistantMessage {
        text: String,
        streaming: bool,
    },
    Error {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    RecommendationPrompt {
        request_id: RequestId,
        recommendations: Vec<Recommendation>,
        summary: String,
    },
}

// ─── ChannelSink ────────────────────────────────────────────────────────────

/// Forwards every notification as a [`ChatEvent`] over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ChatEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("chat event dropped, receiver closed");
        }
    }
}

impl NotificationSink for ChannelSink {
    fn post_user(&self, text: &str) {
        self.send(ChatEvent::UserMessage { text: text.into() });
    }

    fn post_assistant(&self, text: &str, streaming: bool) {
        self.send(ChatEvent::AssistantMessage {
            text: text.into(),
            streaming,
        });
    }

    fn post_error(&self, text: &str) {
        self.send(ChatEvent::Error { text: text.into() });
    }

    fn post_recommendation_prompt(
        &self,
        request_id: &RequestId,
        recommendations: &[Recommendation],
        summary: &str,
    ) {
        self.send(ChatEvent::RecommendationPrompt {
            request_id: request_id.clone(),
            recommendations: recommendations.to_vec(),
            summary: summary.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards_events() {
        let (sink, mut rx) = ChannelSink::new();
        sink.post_user("hi");
        sink.post_assistant("tok", true);
        sink.post_error("boom");

        assert_eq!(rx.try_recv().unwrap(), ChatEvent::UserMessage { text: "hi".into() });
        assert_eq!(
            rx.try_recv().unwrap(),
            ChatEvent::AssistantMessage {
                text: "tok".into(),
                streaming: true
            }
        );
        assert_eq!(rx.try_recv().unwrap(), ChatEvent::Error { text: "boom".into() });
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.post_error("nobody listening");
    }

    #[test]
    fn test_event_json_shape() {
        let id = RequestId::parse("req_7_cafe").unwrap();
        let event = ChatEvent::RecommendationPrompt {
            request_id: id,
            recommendations: vec![Recommendation {
                file_path: "main.go".into(),
                code: "package main".into(),
                language: Some("go".into()),
                line_numbers: None,
            }],
            summary: "1 file recommended: main.go".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "recommendationPrompt");
        assert_eq!(json["requestId"], "req_7_cafe");
        assert_eq!(json["recommendations"][0]["filePath"], "main.go");
    }
}
