use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use serde_json::{json, Value};

const SERVICE_NAME: &str = "AI Legal Filing Assistant";

#[derive(Debug, Serialize)]
struct ExampleQuery {
    description: &'static str,
    query: &'static str,
}

#[derive(Debug, Serialize)]
struct ExamplesResponse {
    examples: Vec<ExampleQuery>,
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": format!("{} API", SERVICE_NAME),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Search and extract structured data from official company filings",
        "endpoints": {
            "/search": "POST - Search for company filings",
            "/health": "GET - Health check",
            "/examples": "GET - Example queries"
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME
    }))
}

async fn examples() -> Json<ExamplesResponse> {
    Json(ExamplesResponse {
        examples: vec![
            ExampleQuery {
                description: "Search for Microsoft's latest 10-K filing",
                query: "Find Microsoft's most recent 10-K annual report",
            },
            ExampleQuery {
                description: "Search for a Brazilian company's reference form",
                query: "Find Petrobras Formulário de Referência",
            },
            ExampleQuery {
                description: "Search for a Canadian company's annual report",
                query: "Find Shopify's latest annual report on SEDAR",
            },
            ExampleQuery {
                description: "Search for Apple's risk factors",
                query: "Find Apple's risk factors in their latest 10-K",
            },
        ],
    })
}

pub fn routes() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/examples", get(examples))
}
