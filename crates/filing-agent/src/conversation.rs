//! Append-only transcript for a single request.
//!
//! The transcript alternates user, assistant and tool-result turns. Every tool result
//! must answer a request from the assistant turn right before it, and a new assistant
//! turn can only be added once all of the previous turn's requests are answered.
use std::collections::HashSet;

use thiserror::Error;

use crate::models::message::{Message, ToolRequest};
use crate::models::role::Role;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversationError {
    #[error("Assistant turn added while {0} tool request(s) are unresolved")]
    UnresolvedRequests(usize),

    #[error("Duplicate correlation id in assistant turn: {0}")]
    DuplicateId(String),

    #[error("Tool results do not match pending requests: expected {expected:?}, got {actual:?}")]
    MismatchedResults {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Message with role {0:?} cannot be added as a {1}")]
    WrongRole(Role, &'static str),
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation from a single user query
    pub fn from_query<S: Into<String>>(query: S) -> Self {
        let mut conversation = Self::new();
        conversation.push_user(query);
        conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push_user<S: Into<String>>(&mut self, text: S) {
        self.messages.push(Message::user().with_text(text));
    }

    /// Requests of the latest assistant turn that have no tool result yet
    pub fn pending_requests(&self) -> Vec<&ToolRequest> {
        match self.messages.last() {
            Some(last) if last.role == Role::Assistant => last.tool_requests(),
            _ => Vec::new(),
        }
    }

    pub fn push_assistant(&mut self, message: Message) -> Result<(), ConversationError> {
        if message.role != Role::Assistant {
            return Err(ConversationError::WrongRole(message.role, "assistant turn"));
        }
        let pending = self.pending_requests().len();
        if pending > 0 {
            return Err(ConversationError::UnresolvedRequests(pending));
        }

        let mut seen = HashSet::new();
        for request in message.tool_requests() {
            if !seen.insert(request.id.as_str()) {
                return Err(ConversationError::DuplicateId(request.id.clone()));
            }
        }

        self.messages.push(message);
        Ok(())
    }

    /// Append the results for the latest assistant turn. The batch must answer every
    /// pending request, in the order the requests were issued.
    pub fn push_tool_results(&mut self, message: Message) -> Result<(), ConversationError> {
        if message.role != Role::User {
            return Err(ConversationError::WrongRole(message.role, "tool result turn"));
        }

        let expected: Vec<String> = self
            .pending_requests()
            .iter()
            .map(|request| request.id.clone())
            .collect();
        let actual: Vec<String> = message
            .tool_responses()
            .iter()
            .map(|response| response.id.clone())
            .collect();

        if expected.is_empty() || expected != actual {
            return Err(ConversationError::MismatchedResults { expected, actual });
        }

        self.messages.push(message);
        Ok(())
    }
}
