//! Completion service interface
//!
//! A service takes an ordered message list and returns a lazy sequence of text
//! fragments. Transport failures surface as an `Err` item at the point of
//! iteration, after which the sequence ends.

use eyre::Result;
use serde::{Deserialize, Serialize};

pub mod openai;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters for one request
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub stream: bool,
}

/// Text fragments as they arrive from the service
pub type Fragments = Box<dyn Iterator<Item = Result<String>>>;

pub trait CompletionService {
    /// Start a completion; the returned iterator blocks on each fragment
    fn complete(&self, messages: &[Message], generation: &Generation) -> Result<Fragments>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_lowercase_role() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
