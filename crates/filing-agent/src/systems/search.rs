//! Web search through the Serper Google search API.
use anyhow::Result;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub const SERPER_HOST: &str = "https://google.serper.dev";

const NO_RESULT: &str = "No good Google Search Result was found";

#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    host: String,
    api_key: Option<String>,
}

impl SearchClient {
    pub fn new(host: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        // Placeholder keys from example env files count as unset
        let api_key = api_key.filter(|key| !key.trim().is_empty() && key != "YOUR_SERPER_API_KEY");

        Ok(Self {
            client,
            host,
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Unrestricted web search
    pub async fn search(&self, query: &str) -> String {
        if !self.is_configured() {
            return "Error: SERPER_API_KEY not configured. Please set SERPER_API_KEY in your .env file."
                .to_string();
        }
        match self.run(query).await {
            Ok(results) => results,
            Err(e) => format!(
                "Error: Search failed - {}. Please check your SERPER_API_KEY configuration.",
                e
            ),
        }
    }

    /// Search restricted to one official domain
    pub async fn site_search(&self, query: &str, site: &str) -> String {
        if !self.is_configured() {
            return format!("Error: SERPER_API_KEY not configured. Cannot search {}.", site);
        }
        match self.run(&format!("site:{} {}", site, query)).await {
            Ok(results) => results,
            Err(e) => format!(
                "Error: Search failed for {} - {}. Please check your SERPER_API_KEY configuration.",
                site, e
            ),
        }
    }

    async fn run(&self, query: &str) -> Result<String> {
        let url = format!("{}/search", self.host.trim_end_matches('/'));
        let api_key = self.api_key.as_deref().unwrap_or_default();

        tracing::debug!(query, "running web search");
        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query }))
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        Ok(format_results(&body))
    }
}

/// Flatten a Serper response into text the model can read
pub fn format_results(body: &Value) -> String {
    let mut snippets = Vec::new();

    let answer_box = &body["answerBox"];
    if let Some(answer) = answer_box["answer"]
        .as_str()
        .or_else(|| answer_box["snippet"].as_str())
    {
        snippets.push(answer.replace('\n', " "));
    }

    let knowledge_graph = &body["knowledgeGraph"];
    if let Some(title) = knowledge_graph["title"].as_str() {
        if let Some(entity_type) = knowledge_graph["type"].as_str() {
            snippets.push(format!("{}: {}.", title, entity_type));
        }
        if let Some(description) = knowledge_graph["description"].as_str() {
            snippets.push(description.to_string());
        }
        if let Some(attributes) = knowledge_graph["attributes"].as_object() {
            for (attribute, value) in attributes {
                if let Some(value) = value.as_str() {
                    snippets.push(format!("{} {}: {}.", title, attribute, value));
                }
            }
        }
    }

    if let Some(organic) = body["organic"].as_array() {
        for result in organic {
            let title = result["title"].as_str().unwrap_or_default();
            let snippet = result["snippet"].as_str().unwrap_or_default();
            let link = result["link"].as_str().unwrap_or_default();
            if title.is_empty() && snippet.is_empty() {
                continue;
            }
            snippets.push(format!("{}\n{}\nURL: {}", title, snippet, link));
        }
    }

    if snippets.is_empty() {
        NO_RESULT.to_string()
    } else {
        snippets.join("\n\n")
    }
}
