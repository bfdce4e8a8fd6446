//! Fetch a document and reduce it to readable text.
use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use scraper::{Html, Node};
use std::time::Duration;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_MAX_CHARS: usize = 8000;

const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "nav", "footer", "header"];

#[derive(Clone)]
pub struct DocumentReader {
    client: Client,
    max_chars: usize,
}

impl DocumentReader {
    pub fn new(user_agent: &str, timeout: Duration, max_chars: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, max_chars })
    }

    /// Fetch `url` and return at most `max_chars` characters of its text
    pub async fn read(&self, url: &str) -> String {
        let response = match self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => response,
            Err(e) => return format!("Error: Could not retrieve URL. Reason: {}", e),
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let lowered = content_type.to_lowercase();

        let is_html = lowered.contains("text/html") || lowered.contains("application/xhtml");
        if !is_html && !lowered.contains("text/plain") {
            return format!(
                "Error: Content type is not text/html. It is {}. Cannot process.",
                content_type
            );
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return format!("Error: Could not retrieve URL. Reason: {}", e),
        };

        let text = if is_html { visible_text(&body) } else { body };
        tracing::debug!(url, chars = text.chars().count(), "document retrieved");
        truncate_chars(&text, self.max_chars)
    }
}

/// Visible text of an HTML page, one space between text runs
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts = Vec::new();
    let mut stack = vec![document.tree.root()];

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Element(element) if SKIPPED_ELEMENTS.contains(&element.name()) => continue,
            Node::Text(text) => {
                let words: Vec<&str> = text.split_whitespace().collect();
                if !words.is_empty() {
                    parts.push(words.join(" "));
                }
            }
            _ => {}
        }
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }

    parts.join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
