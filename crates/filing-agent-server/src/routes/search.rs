use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use filing_agent::agent::AgentOutcome;
use filing_agent::filing::{parse_filing, CompanyFiling};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub data: Option<CompanyFiling>,
    pub error: Option<String>,
}

impl SearchResponse {
    fn found(filing: CompanyFiling) -> Self {
        Self {
            success: true,
            data: Some(filing),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

async fn search(State(state): State<AppState>, Json(request): Json<SearchRequest>) -> Response {
    let query = request.query.trim();
    if query.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SearchResponse::failed("Query must not be empty".to_string())),
        )
            .into_response();
    }

    tracing::info!(query, "filing search");
    let agent = state.agent();

    let response = match agent.run(query).await {
        Ok(AgentOutcome::Answer { text, .. }) => match parse_filing(&text) {
            Ok(filing) => {
                tracing::info!(company = %filing.company_name, url = %filing.document_url, "filing found");
                SearchResponse::found(filing)
            }
            Err(e) => SearchResponse::failed(format!(
                "Failed to parse structured output: {}. Raw response: {}",
                e,
                e.raw()
            )),
        },
        Ok(AgentOutcome::Exhausted {
            rounds, last_text, ..
        }) => SearchResponse::failed(format!(
            "Failed to parse structured output: no final answer after {} rounds. Raw response: {}",
            rounds, last_text
        )),
        Err(e) => {
            tracing::error!("search failed: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": format!("Internal server error: {}", e) })),
            )
                .into_response();
        }
    };

    (StatusCode::OK, Json(response)).into_response()
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/search", post(search))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use filing_agent::models::message::Message;
    use filing_agent::models::tool::{Tool, ToolCall};
    use filing_agent::providers::base::{Provider, Usage};
    use filing_agent::systems::{FilingSystem, SystemConfig};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Gives the same turn every time, or fails when there is none
    struct FixedProvider(Option<Message>);

    #[async_trait]
    impl Provider for FixedProvider {
        async fn complete(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[Tool],
        ) -> anyhow::Result<(Message, Usage)> {
            match &self.0 {
                Some(message) => Ok((message.clone(), Usage::default())),
                None => Err(anyhow!("quota exceeded")),
            }
        }
    }

    fn app(turn: Option<Message>) -> Router {
        let system = FilingSystem::new(SystemConfig {
            registry_host: "http://127.0.0.1:9".to_string(),
            ..SystemConfig::default()
        })
        .unwrap();

        routes(AppState {
            provider: Arc::new(FixedProvider(turn)),
            system: Arc::new(system),
            max_rounds: 2,
        })
    }

    async fn post_query(app: Router, query: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/search")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "query": query }).to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_answer_becomes_filing() {
        let answer = json!({
            "contract_name": "Form 10-K",
            "company_name": "Apple Inc.",
            "description": "Annual report for fiscal year ending September 30, 2024.",
            "filing_date": "2024-10-28",
            "source_of_information": "SEC EDGAR",
            "country": "United States",
            "language": "English",
            "applicable_law": "Securities Exchange Act of 1934",
            "relevant_clause": "Item 1A. Risk Factors",
            "document_url": "https://www.sec.gov/Archives/edgar/data/320193/000032019324000106/aapl-20240928.htm"
        });
        let app = app(Some(Message::assistant().with_text(answer.to_string())));

        let (status, body) = post_query(app, "Find Apple's risk factors in their latest 10-K").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], answer);
        assert_eq!(body["error"], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let (status, body) = post_query(app(None), "   ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"], Value::Null);
    }

    #[tokio::test]
    async fn test_unparseable_answer() {
        let app = app(Some(
            Message::assistant().with_text("I could not find that filing."),
        ));

        let (status, body) = post_query(app, "Find Initech's 10-K").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("Failed to parse structured output:"));
        assert!(error.ends_with("Raw response: I could not find that filing."));
    }

    #[tokio::test]
    async fn test_round_limit_is_a_validation_failure() {
        let app = app(Some(Message::assistant().with_tool_request(
            "1",
            Ok(ToolCall::new("fallback_search", json!({"query": "Initech"}))),
        )));

        let (status, body) = post_query(app, "Find Initech's 10-K").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("no final answer after 2 rounds"));
    }

    #[tokio::test]
    async fn test_reasoning_failure_is_500() {
        let (status, body) = post_query(app(None), "Find Microsoft's 10-K").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error: quota exceeded");
    }
}
