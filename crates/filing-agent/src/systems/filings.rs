use anyhow::Result;
use async_trait::async_trait;
use indoc::indoc;
use serde_json::json;
use std::time::Duration;

use super::document::{DocumentReader, BROWSER_USER_AGENT, DEFAULT_MAX_CHARS};
use super::fallback::FallbackCatalog;
use super::registry::{RegistryClient, RegistryIndex, SEC_DATA_HOST};
use super::search::{SearchClient, SERPER_HOST};
use super::{input_from_args, System};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};

const SEC_SITE: &str = "sec.gov";
const SEDAR_SITE: &str = "sedarplus.ca";
const CVM_SITE: &str = "cvm.gov.br";

/// Credentials, hosts and limits for the filing tools
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub search_api_key: Option<String>,
    pub search_host: String,
    pub search_timeout_secs: u64,
    pub registry_host: String,
    pub document_timeout_secs: u64,
    pub user_agent: String,
    pub max_document_chars: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            search_api_key: None,
            search_host: SERPER_HOST.to_string(),
            search_timeout_secs: 30,
            registry_host: SEC_DATA_HOST.to_string(),
            document_timeout_secs: 10,
            user_agent: BROWSER_USER_AGENT.to_string(),
            max_document_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// Search and retrieval tools over official filing registries
pub struct FilingSystem {
    tools: Vec<Tool>,
    search: SearchClient,
    registry: RegistryClient,
    documents: DocumentReader,
    catalog: FallbackCatalog,
}

fn single_input_tool(name: &str, description: &str, param: &str, param_description: &str) -> Tool {
    Tool::new(
        name,
        description,
        json!({
            "type": "object",
            "required": [param],
            "properties": {
                param: {
                    "type": "string",
                    "description": param_description
                }
            }
        }),
    )
}

impl FilingSystem {
    pub fn new(config: SystemConfig) -> Result<Self> {
        Self::with_tables(config, RegistryIndex::default(), FallbackCatalog::default())
    }

    /// Build the system with custom lookup tables
    pub fn with_tables(
        config: SystemConfig,
        index: RegistryIndex,
        catalog: FallbackCatalog,
    ) -> Result<Self> {
        let registry_timeout = Duration::from_secs(config.document_timeout_secs);
        let search = SearchClient::new(
            config.search_host,
            config.search_api_key,
            Duration::from_secs(config.search_timeout_secs),
        )?;
        let registry = RegistryClient::new(
            config.registry_host,
            index,
            &config.user_agent,
            registry_timeout,
        )?;
        let documents = DocumentReader::new(
            &config.user_agent,
            Duration::from_secs(config.document_timeout_secs),
            config.max_document_chars,
        )?;

        let tools = vec![
            single_input_tool(
                "search_sec_edgar",
                "Use this to search for US company filings on the SEC EDGAR database. Input should be a company name and the form type, e.g., 'Microsoft 10-K'.",
                "query",
                "Company name and form type.",
            ),
            single_input_tool(
                "real_sec_search",
                "Use this for real-time SEC EDGAR searches using their public API. Input should be a company name.",
                "company_name",
                "Name of the company, e.g. 'Microsoft'.",
            ),
            single_input_tool(
                "search_sedar_plus",
                "Use this to search for Canadian company filings on the SEDAR+ database. Input should be a company name and the form type.",
                "query",
                "Company name and form type.",
            ),
            single_input_tool(
                "search_cvm_empresas_net",
                "Use this to search for Brazilian company filings on the CVM Empresas.NET database. Input should be a company name and the form type, e.g., 'Petrobras Formulário de Referência'.",
                "query",
                "Company name and form type.",
            ),
            single_input_tool(
                "read_document_from_url",
                "Use this to read the full text content of a document from a specific URL. The input MUST be a valid URL.",
                "url",
                "Absolute http(s) URL of the document.",
            ),
            single_input_tool(
                "general_web_search",
                "Use this as a fallback for general research or if you cannot find the document in the official databases.",
                "query",
                "Free-text search query.",
            ),
            single_input_tool(
                "fallback_search",
                "Use this when other search tools fail or return errors. This provides data for well-known filings without any network access.",
                "query",
                "Free-text search query naming the company.",
            ),
        ];

        Ok(Self {
            tools,
            search,
            registry,
            documents,
            catalog,
        })
    }

    async fn search_sec_edgar(&self, query: &str) -> String {
        let result = self.search.site_search(query, SEC_SITE).await;
        if !result.contains("Error:") {
            return result;
        }
        tracing::debug!(query, "site search unavailable, using registry index");
        self.registry.index().direct_search(query)
    }
}

#[async_trait]
impl System for FilingSystem {
    fn name(&self) -> &str {
        "FilingSystem"
    }

    fn description(&self) -> &str {
        "Finds official company filings on SEC EDGAR, SEDAR+ and CVM Empresas.NET and reads their contents."
    }

    fn instructions(&self) -> &str {
        indoc! {r#"
            Prefer the official registries for the company's jurisdiction: SEC EDGAR for the
            United States, SEDAR+ for Canada, CVM Empresas.NET for Brazil. Tool failures are
            reported as text starting with "Error:"; when that happens, try fallback_search.
        "#}
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
        let args = &tool_call.arguments;
        match tool_call.name.as_str() {
            "search_sec_edgar" => Ok(self.search_sec_edgar(&input_from_args(args, "query")?).await),
            "real_sec_search" => Ok(self
                .registry
                .lookup(&input_from_args(args, "company_name")?)
                .await),
            "search_sedar_plus" => Ok(self
                .search
                .site_search(&input_from_args(args, "query")?, SEDAR_SITE)
                .await),
            "search_cvm_empresas_net" => Ok(self
                .search
                .site_search(&input_from_args(args, "query")?, CVM_SITE)
                .await),
            "read_document_from_url" => {
                Ok(self.documents.read(&input_from_args(args, "url")?).await)
            }
            "general_web_search" => Ok(self.search.search(&input_from_args(args, "query")?).await),
            "fallback_search" => Ok(self.catalog.search(&input_from_args(args, "query")?)),
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}
