use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};

pub mod document;
pub mod fallback;
pub mod filings;
pub mod registry;
pub mod search;

pub use filings::{FilingSystem, SystemConfig};

/// Core trait that defines a system that can be operated by an AI agent
///
/// Failures inside a capability (network errors, missing credentials, unsupported
/// content) are returned as `Ok` text starting with `"Error:"` so the model can read
/// them and pick another tool. `Err` is reserved for malformed requests.
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Get system instructions
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool with the given parameters
    async fn call(&self, tool_call: ToolCall) -> AgentResult<String>;
}

/// Pull the single string input out of a tool call's arguments.
///
/// Models send either a bare string, an object keyed by the declared parameter, or an
/// object with one string value under some other key.
pub fn input_from_args(arguments: &Value, key: &str) -> AgentResult<String> {
    let input = match arguments {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => match map.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => None,
            None if map.len() == 1 => map.values().next().and_then(|v| v.as_str()).map(String::from),
            None => None,
        },
        _ => None,
    };

    input
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AgentError::InvalidParameters(format!("'{}' must be a non-empty string", key)))
}
