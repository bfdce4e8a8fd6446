use anyhow::Result;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use serde::Serialize;
use std::sync::Arc;

use crate::conversation::Conversation;
use crate::errors::{AgentError, AgentResult};
use crate::models::message::{Message, ToolRequest};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::prompt_template::load_bundled_prompt;
use crate::providers::base::{Decision, Provider};
use crate::systems::System;

/// Decision steps allowed per request unless configured otherwise
pub const DEFAULT_MAX_ROUNDS: usize = 20;

#[derive(Clone, Debug, Serialize)]
struct SystemInfo {
    name: String,
    description: String,
    instructions: String,
}

#[derive(Serialize)]
struct PromptContext {
    tools: Vec<Tool>,
    systems: Vec<SystemInfo>,
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    /// The model stopped requesting tools; `text` is its final answer
    Answer {
        text: String,
        conversation: Conversation,
    },
    /// The round limit was reached while the model still wanted tools
    Exhausted {
        rounds: usize,
        last_text: String,
        conversation: Conversation,
    },
}

impl AgentOutcome {
    pub fn conversation(&self) -> &Conversation {
        match self {
            AgentOutcome::Answer { conversation, .. } => conversation,
            AgentOutcome::Exhausted { conversation, .. } => conversation,
        }
    }
}

/// Agent integrates a foundational LLM with the systems it needs to pilot
pub struct Agent {
    systems: Vec<Arc<dyn System>>,
    provider: Arc<dyn Provider>,
    max_rounds: usize,
}

impl Agent {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            systems: Vec::new(),
            provider,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn add_system(&mut self, system: Arc<dyn System>) {
        self.systems.push(system);
    }

    /// Limit the number of decision steps per run (at least one)
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Every tool offered by every system
    pub fn tools(&self) -> Vec<Tool> {
        self.systems
            .iter()
            .flat_map(|system| system.tools().iter().cloned())
            .collect()
    }

    fn get_system_for_tool(&self, tool_name: &str) -> Option<&dyn System> {
        self.systems
            .iter()
            .find(|system| system.tools().iter().any(|tool| tool.name == tool_name))
            .map(|system| &**system)
    }

    async fn call_tool(&self, tool_call: AgentResult<ToolCall>) -> AgentResult<String> {
        let call = tool_call?;
        let system = self
            .get_system_for_tool(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;
        system.call(call).await
    }

    /// Run one request. Failures of any kind come back as text for the model.
    async fn dispatch_tool_call(&self, request: &ToolRequest) -> String {
        tracing::info!(
            id = %request.id,
            tool = request.tool_name().unwrap_or("<invalid>"),
            "dispatching tool call"
        );
        match self.call_tool(request.tool_call.clone()).await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(id = %request.id, error = %e, "tool call failed");
                format!("Error: {}", e)
            }
        }
    }

    fn get_system_prompt(&self) -> AgentResult<String> {
        let context = PromptContext {
            tools: self.tools(),
            systems: self
                .systems
                .iter()
                .map(|system| SystemInfo {
                    name: system.name().to_string(),
                    description: system.description().to_string(),
                    instructions: system.instructions().to_string(),
                })
                .collect(),
        };
        load_bundled_prompt("system.md", &context)
            .map_err(|e| AgentError::Internal(e.to_string()))
    }

    /// Stream every turn the loop produces for `query`: each assistant turn, followed by
    /// the tool-result turn answering it when the assistant requested tools.
    ///
    /// The stream ends after a final answer, or after the tool results of the last
    /// allowed round.
    pub async fn reply(&self, query: &str) -> Result<BoxStream<'_, Result<Message>>> {
        let tools = self.tools();
        let system_prompt = self.get_system_prompt()?;
        let mut conversation = Conversation::from_query(query);

        Ok(Box::pin(async_stream::try_stream! {
            for round in 1..=self.max_rounds {
                let (response, usage) = self.provider.complete(
                    &system_prompt,
                    conversation.messages(),
                    &tools,
                ).await?;
                tracing::debug!(round, ?usage, "model responded");

                conversation.push_assistant(response.clone())?;
                yield response.clone();

                // Let the assistant turn reach the consumer before tools start running
                tokio::task::yield_now().await;

                let requests = match Decision::from_message(&response) {
                    Decision::FinalAnswer(_) => {
                        tracing::debug!(round, "final answer");
                        break;
                    }
                    Decision::ToolRequests(requests) => requests,
                };
                tracing::debug!(round, count = requests.len(), "tool requests");

                let outputs = futures::future::join_all(
                    requests.iter().map(|request| self.dispatch_tool_call(request)),
                )
                .await;

                let mut results = Message::user();
                for (request, output) in requests.iter().zip(outputs) {
                    results = results.with_tool_response(request.id.clone(), output);
                }

                conversation.push_tool_results(results.clone())?;
                yield results;

                if round == self.max_rounds {
                    tracing::warn!(max_rounds = self.max_rounds, "round limit reached with tools still requested");
                }
            }
        }))
    }

    /// Drive the loop for `query` to completion
    pub async fn run(&self, query: &str) -> Result<AgentOutcome> {
        let mut conversation = Conversation::from_query(query);
        let mut rounds = 0;
        let mut stream = self.reply(query).await?;

        while let Some(message) = stream.try_next().await? {
            match message.role {
                Role::Assistant => {
                    rounds += 1;
                    conversation.push_assistant(message)?;
                }
                Role::User => conversation.push_tool_results(message)?,
            }
        }

        let last_text = conversation
            .messages()
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .map(Message::text)
            .unwrap_or_default();

        let finished = conversation
            .last()
            .map(|last| last.role == Role::Assistant)
            .unwrap_or(false);

        if finished {
            Ok(AgentOutcome::Answer {
                text: last_text,
                conversation,
            })
        } else {
            Ok(AgentOutcome::Exhausted {
                rounds,
                last_text,
                conversation,
            })
        }
    }
}
