//! The filing record produced by a successful run, and the validator that builds it
//! from the model's final answer.
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Placeholder for required fields the model did not provide
pub const UNKNOWN: &str = "Unknown";

/// Sentinel used when no specific section applies
pub const NOT_APPLICABLE: &str = "N/A";

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap();
}

/// Metadata describing an official company filing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFiling {
    /// Official name of the form, e.g. "Form 10-K" or "Formulário de Referência"
    pub contract_name: String,
    pub company_name: String,
    /// Short summary of the document relevant to the query
    pub description: String,
    /// Expected as YYYY-MM-DD, surfaced as-is when malformed
    pub filing_date: String,
    /// Platform the filing was found on, e.g. "SEC EDGAR"
    pub source_of_information: String,
    pub country: String,
    pub language: String,
    #[serde(default)]
    pub applicable_law: Option<String>,
    #[serde(default = "not_applicable")]
    pub relevant_clause: String,
    pub document_url: String,
}

fn not_applicable() -> String {
    NOT_APPLICABLE.to_string()
}

impl CompanyFiling {
    fn required_fields(&self) -> [(&'static str, &str); 8] {
        [
            ("contract_name", self.contract_name.as_str()),
            ("company_name", self.company_name.as_str()),
            ("description", self.description.as_str()),
            ("filing_date", self.filing_date.as_str()),
            ("source_of_information", self.source_of_information.as_str()),
            ("country", self.country.as_str()),
            ("language", self.language.as_str()),
            ("document_url", self.document_url.as_str()),
        ]
    }

    /// Names of required fields that are empty or whitespace
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.required_fields()
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn has_iso_date(&self) -> bool {
        NaiveDate::parse_from_str(self.filing_date.trim(), "%Y-%m-%d").is_ok()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("no JSON object found in response")]
    NoJsonObject { raw: String },
}

impl ValidationError {
    pub fn raw(&self) -> &str {
        match self {
            ValidationError::NoJsonObject { raw } => raw,
        }
    }
}

/// Build a filing from the model's final answer.
///
/// The answer is first read as a record that already has the expected shape. If that
/// fails, field names are reconciled against known synonyms, registry metadata is
/// inferred from the document URL, and anything still missing becomes "Unknown".
pub fn parse_filing(text: &str) -> Result<CompanyFiling, ValidationError> {
    let candidate = extract_json(text);

    if let Ok(filing) = serde_json::from_str::<CompanyFiling>(candidate) {
        if filing.missing_fields().is_empty() {
            check_date(&filing);
            return Ok(filing);
        }
        tracing::debug!(missing = ?filing.missing_fields(), "filing has empty fields, reconciling");
    }

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => {
            let filing = reconcile(&object);
            check_date(&filing);
            Ok(filing)
        }
        _ => Err(ValidationError::NoJsonObject {
            raw: text.to_string(),
        }),
    }
}

fn check_date(filing: &CompanyFiling) {
    if !filing.has_iso_date() {
        tracing::warn!(filing_date = %filing.filing_date, "filing date is not an ISO-8601 date");
    }
}

/// Narrow the answer down to the JSON object it most likely contains
fn extract_json(text: &str) -> &str {
    if let Some(captures) = FENCED_JSON.captures(text) {
        if let Some(body) = captures.get(1) {
            return body.as_str();
        }
    }
    // Prose may contain stray braces, so try each `{` until one opens a complete object
    text.match_indices('{')
        .find_map(|(start, _)| leading_object(&text[start..]))
        .unwrap_or_else(|| text.trim())
}

/// The JSON object at the very start of `text`, ignoring whatever follows it
fn leading_object(text: &str) -> Option<&str> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(Ok(Value::Object(_))) => Some(&text[..stream.byte_offset()]),
        _ => None,
    }
}

fn lookup(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

struct Registry {
    domain: &'static str,
    source: &'static str,
    country: &'static str,
    language: &'static str,
    law: Option<&'static str>,
}

const REGISTRIES: &[Registry] = &[
    Registry {
        domain: "sec.gov",
        source: "SEC EDGAR",
        country: "United States",
        language: "English",
        law: Some("Securities Exchange Act of 1934"),
    },
    Registry {
        domain: "sedarplus.ca",
        source: "SEDAR+",
        country: "Canada",
        language: "English",
        law: None,
    },
    Registry {
        domain: "cvm.gov.br",
        source: "CVM Empresas.NET",
        country: "Brazil",
        language: "Portuguese",
        law: Some("Lei 6.404/76"),
    },
];

fn registry_for(url: &str) -> Option<&'static Registry> {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))?;
    REGISTRIES
        .iter()
        .find(|r| host == r.domain || host.ends_with(&format!(".{}", r.domain)))
}

fn infer(
    value: Option<String>,
    registry: Option<&Registry>,
    pick: fn(&Registry) -> &'static str,
) -> String {
    value
        .or_else(|| registry.map(|r| pick(r).to_string()))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn reconcile(object: &Map<String, Value>) -> CompanyFiling {
    let document_url = lookup(object, &["document_url", "url", "link", "source_url"]);
    let registry = document_url.as_deref().and_then(registry_for);

    let or_unknown = |value: Option<String>| value.unwrap_or_else(|| UNKNOWN.to_string());

    CompanyFiling {
        contract_name: or_unknown(lookup(
            object,
            &["contract_name", "filing_type", "filing_name", "form_type", "form"],
        )),
        company_name: or_unknown(lookup(object, &["company_name", "company", "entity_name"])),
        description: or_unknown(lookup(object, &["description", "summary"])),
        filing_date: or_unknown(lookup(object, &["filing_date", "date", "filed_on"])),
        source_of_information: infer(
            lookup(object, &["source_of_information", "source", "platform"]),
            registry,
            |r| r.source,
        ),
        country: infer(lookup(object, &["country", "jurisdiction"]), registry, |r| r.country),
        language: infer(lookup(object, &["language"]), registry, |r| r.language),
        applicable_law: lookup(object, &["applicable_law", "governing_law"])
            .or_else(|| registry.and_then(|r| r.law.map(String::from))),
        relevant_clause: lookup(object, &["relevant_clause", "relevant_section"])
            .unwrap_or_else(not_applicable),
        document_url: or_unknown(document_url),
    }
}
