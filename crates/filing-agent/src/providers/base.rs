use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::{Message, ToolRequest};
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Base trait for AI providers (Gemini, OpenAI, etc)
///
/// A single provider instance is shared by every concurrent request, so
/// implementations must be safe to call from many loops at once.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message using the configured model and other parameters
    ///
    /// # Arguments
    /// * `system` - The system prompt that guides the model's behavior
    /// * `messages` - The conversation history as a sequence of messages
    /// * `tools` - Optional list of tools the model can use
    ///
    /// # Returns
    /// A tuple containing the model's response message and usage statistics
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)>;
}

/// What the model decided to do with its turn
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Run these tools, in order, then ask again
    ToolRequests(Vec<ToolRequest>),
    /// No tools requested; the text is the candidate answer
    FinalAnswer(String),
}

impl Decision {
    pub fn from_message(message: &Message) -> Self {
        let requests: Vec<ToolRequest> = message.tool_requests().into_iter().cloned().collect();
        if requests.is_empty() {
            Decision::FinalAnswer(message.text())
        } else {
            Decision::ToolRequests(requests)
        }
    }
}
