//! Direct lookups against the SEC EDGAR registry.
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub const SEC_DATA_HOST: &str = "https://data.sec.gov";
pub const EDGAR_COMPANY_SEARCH: &str = "https://www.sec.gov/edgar/searchedgar/companysearch";

lazy_static! {
    static ref FIRST_WORD: Regex = Regex::new(r"\w+").unwrap();
}

/// Company name → SEC Central Index Key
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryIndex {
    ciks: HashMap<String, String>,
}

impl Default for RegistryIndex {
    fn default() -> Self {
        Self::from_entries([
            ("microsoft", "0000789019"),
            ("apple", "0000320193"),
            ("amazon", "0001018724"),
            ("google", "0001652044"),
            ("alphabet", "0001652044"),
            ("tesla", "0001318605"),
            ("netflix", "0001065280"),
            ("meta", "0001326801"),
            ("facebook", "0001326801"),
        ])
    }
}

impl RegistryIndex {
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            ciks: entries
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        }
    }

    pub fn cik(&self, company: &str) -> Option<&str> {
        self.ciks
            .get(&company.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Resolve a free-text query by its first word, without any network access
    pub fn direct_search(&self, query: &str) -> String {
        let found = FIRST_WORD
            .find(query)
            .map(|m| m.as_str().to_lowercase())
            .and_then(|company| self.cik(&company).map(|cik| (company, cik)));

        match found {
            Some((company, cik)) => format!(
                "Found SEC EDGAR filings for {}. Direct search URL: {}",
                title_case(&company),
                edgar_filings_url(cik)
            ),
            None => format!(
                "Real SEC EDGAR search attempted for: {}. Please visit {} for manual search.",
                query, EDGAR_COMPANY_SEARCH
            ),
        }
    }
}

/// Canonical EDGAR browse URL for a company's 10-K filings
pub fn edgar_filings_url(cik: &str) -> String {
    format!(
        "https://www.sec.gov/cgi-bin/browse-edgar?action=getcompany&CIK={}&type=10-K&dateb=&owner=exclude&count=10",
        cik
    )
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    host: String,
    index: RegistryIndex,
}

impl RegistryClient {
    pub fn new(
        host: String,
        index: RegistryIndex,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            host,
            index,
        })
    }

    pub fn index(&self) -> &RegistryIndex {
        &self.index
    }

    /// Look a company up in the registry's submissions API
    pub async fn lookup(&self, company_name: &str) -> String {
        let company = company_name.trim();
        let Some(cik) = self.index.cik(company) else {
            return format!(
                "Real SEC search attempted for {}. Please visit {} for manual search.",
                company, EDGAR_COMPANY_SEARCH
            );
        };

        let filings_url = edgar_filings_url(cik);
        let company_url = format!(
            "{}/submissions/CIK{:0>10}.json",
            self.host.trim_end_matches('/'),
            cik
        );

        let response = match self
            .client
            .get(&company_url)
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return format!("Error: Real SEC search failed: {}", e),
        };

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), company, "registry lookup not successful");
            return format!(
                "Real SEC search attempted for {}. Filings URL: {}",
                company, filings_url
            );
        }

        let entity_name = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|data| data["entityName"].as_str().map(String::from))
            .unwrap_or_else(|| title_case(&company.to_lowercase()));

        format!(
            "Real SEC search successful for {}. Company CIK: {}. Filings URL: {}",
            entity_name, cik, filings_url
        )
    }
}
