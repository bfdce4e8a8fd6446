use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

/// Name sent to the model in place of a tool call that could not be decoded
const INVALID_TOOL_CALL: &str = "invalid_tool_call";

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Convert internal Message format to Gemini `contents`
///
/// Gemini identifies function responses by function name rather than call id, so the
/// names of earlier requests are remembered while walking the conversation.
pub fn messages_to_google_spec(messages: &[Message]) -> Vec<Value> {
    let mut names_by_id: HashMap<&str, String> = HashMap::new();
    let mut contents = Vec::new();

    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        let mut parts = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.text.is_empty() {
                        parts.push(json!({ "text": text.text }));
                    }
                }
                MessageContent::ToolRequest(request) => {
                    let (name, args) = match &request.tool_call {
                        Ok(tool_call) => (
                            sanitize_function_name(&tool_call.name),
                            as_args_object(&tool_call.arguments),
                        ),
                        Err(_) => (INVALID_TOOL_CALL.to_string(), json!({})),
                    };
                    names_by_id.insert(&request.id, name.clone());
                    parts.push(json!({
                        "functionCall": { "name": name, "args": args }
                    }));
                }
                MessageContent::ToolResponse(response) => {
                    let name = names_by_id
                        .get(response.id.as_str())
                        .cloned()
                        .unwrap_or_else(|| INVALID_TOOL_CALL.to_string());
                    parts.push(json!({
                        "functionResponse": {
                            "name": name,
                            "response": { "content": response.output }
                        }
                    }));
                }
            }
        }

        if !parts.is_empty() {
            contents.push(json!({ "role": role, "parts": parts }));
        }
    }

    contents
}

/// Convert internal Tool format to Gemini function declarations
pub fn tools_to_google_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    check_unique_names(tools)?;

    let declarations: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            })
        })
        .collect();

    Ok(vec![json!({ "functionDeclarations": declarations })])
}

/// Convert a Gemini `generateContent` response to internal Message format
pub fn google_response_to_message(response: &Value) -> Result<Message> {
    let candidate = response
        .get("candidates")
        .and_then(|c| c.get(0))
        .ok_or_else(|| match response["promptFeedback"]["blockReason"].as_str() {
            Some(reason) => anyhow!("Gemini blocked the prompt: {}", reason),
            None => anyhow!("No candidates in Gemini response"),
        })?;

    let mut content = Vec::new();
    let parts = candidate["content"]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            content.push(MessageContent::text(text));
        } else if let Some(call) = part.get("functionCall") {
            let id = call
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
            let name = call["name"].as_str().unwrap_or_default();
            let request = if is_valid_function_name(name) {
                Ok(ToolCall::new(name, call.get("args").cloned().unwrap_or(json!({}))))
            } else {
                Err(invalid_name_error(name))
            };
            content.push(MessageContent::tool_request(id, request));
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}

fn as_args_object(arguments: &Value) -> Value {
    match arguments {
        Value::Object(_) => arguments.clone(),
        Value::Null => json!({}),
        other => {
            let mut map = Map::new();
            map.insert("input".to_string(), other.clone());
            Value::Object(map)
        }
    }
}

fn check_unique_names(tools: &[Tool]) -> Result<()> {
    let mut tool_names = std::collections::HashSet::new();
    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }
    }
    Ok(())
}

fn invalid_name_error(name: &str) -> AgentError {
    AgentError::ToolNotFound(format!(
        "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
        name
    ))
}

fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_tool(name: &str) -> Tool {
        Tool::new(
            name,
            "Search for filings",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query"}
                },
                "required": ["query"]
            }),
        )
    }

    fn exchange() -> Vec<Message> {
        vec![
            Message::user().with_text("Find Microsoft's 10-K"),
            Message::assistant().with_tool_request(
                "call_1",
                Ok(ToolCall::new("fallback_search", json!({"query": "Microsoft"}))),
            ),
            Message::user().with_tool_response("call_1", "Found filing for Microsoft Corporation"),
        ]
    }

    #[test]
    fn test_failed_request_keeps_its_id() {
        let messages = vec![
            Message::assistant().with_tool_request(
                "bad",
                Err(AgentError::InvalidParameters("not json".into())),
            ),
            Message::user().with_tool_response("bad", "Error: Invalid parameters: not json"),
        ];

        let contents = messages_to_google_spec(&messages);
        assert_eq!(
            contents[0]["parts"][0]["functionCall"]["name"],
            INVALID_TOOL_CALL
        );
        assert_eq!(
            contents[1]["parts"][0]["functionResponse"]["name"],
            INVALID_TOOL_CALL
        );
    }

    #[test]
    fn test_tools_duplicate_names() {
        let tools = [search_tool("dup"), search_tool("dup")];

        let result = tools_to_google_spec(&tools);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_sanitize_function_name() {
        assert_eq!(sanitize_function_name("hello-world"), "hello-world");
        assert_eq!(sanitize_function_name("hello world"), "hello_world");
        assert_eq!(sanitize_function_name("hello@world"), "hello_world");
    }

    #[test]
    fn test_is_valid_function_name() {
        assert!(is_valid_function_name("hello-world"));
        assert!(is_valid_function_name("hello_world"));
        assert!(!is_valid_function_name("hello world"));
        assert!(!is_valid_function_name("hello@world"));
        assert!(!is_valid_function_name(""));
    }

    #[test]
    fn test_messages_to_google_spec() {
        let contents = messages_to_google_spec(&exchange());

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Find Microsoft's 10-K");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(
            contents[1]["parts"][0]["functionCall"]["name"],
            "fallback_search"
        );
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["name"],
            "fallback_search"
        );
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"]["content"],
            "Found filing for Microsoft Corporation"
        );
    }

    #[test]
    fn test_google_spec_wraps_string_arguments() {
        let messages = vec![Message::assistant()
            .with_tool_request("1", Ok(ToolCall::new("fallback_search", json!("apple"))))];

        let contents = messages_to_google_spec(&messages);
        assert_eq!(
            contents[0]["parts"][0]["functionCall"]["args"],
            json!({"input": "apple"})
        );
    }

    #[test]
    fn test_tools_to_google_spec() -> Result<()> {
        let spec = tools_to_google_spec(&[search_tool("search_sedar_plus")])?;
        assert_eq!(
            spec[0]["functionDeclarations"][0]["name"],
            "search_sedar_plus"
        );
        Ok(())
    }

    #[test]
    fn test_google_response_to_message() -> Result<()> {
        let response = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Searching EDGAR first."},
                        {"functionCall": {"name": "search_sec_edgar", "args": {"query": "Apple 10-K"}}},
                        {"functionCall": {"id": "given", "name": "real_sec_search", "args": {"company_name": "apple"}}}
                    ]
                }
            }]
        });

        let message = google_response_to_message(&response)?;
        let requests = message.tool_requests();
        assert_eq!(message.text(), "Searching EDGAR first.");
        assert_eq!(requests.len(), 2);
        assert!(requests[0].id.starts_with("call_"));
        assert_ne!(requests[0].id, requests[1].id);
        assert_eq!(requests[1].id, "given");
        assert_eq!(requests[1].tool_name(), Some("real_sec_search"));
        Ok(())
    }

    #[test]
    fn test_google_blocked_prompt() {
        let response = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = google_response_to_message(&response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
