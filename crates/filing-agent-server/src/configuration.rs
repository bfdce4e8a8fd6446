use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use filing_agent::agent::DEFAULT_MAX_ROUNDS;
use filing_agent::providers::{
    configs::{GoogleProviderConfig, ProviderConfig, DEFAULT_PROVIDER_TIMEOUT_SECS},
    google,
};
use filing_agent::systems::{search::SERPER_HOST, SystemConfig};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidAddress {
            reason: e.to_string(),
            addr,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    Google {
        #[serde(default = "default_google_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_google_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
        #[serde(default = "default_provider_timeout")]
        timeout_secs: u64,
    },
}

impl ProviderSettings {
    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::Google {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout_secs,
            } => ProviderConfig::Google(GoogleProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout_secs,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_search_host")]
    pub host: String,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            host: default_search_host(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl SearchSettings {
    pub fn into_system_config(self) -> SystemConfig {
        SystemConfig {
            search_api_key: self.api_key,
            search_host: self.host,
            search_timeout_secs: self.timeout_secs,
            ..SystemConfig::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?;

        // Variables used by earlier deployments, overridden by FILING_*.
        // The Gemini key only ever fills the google provider section.
        if let Ok(api_key) = std::env::var("GOOGLE_API_KEY") {
            builder = builder
                .set_default("provider.type", "google")?
                .set_default("provider.api_key", api_key)?;
        }
        if let Ok(api_key) = std::env::var("SERPER_API_KEY") {
            builder = builder.set_default("search.api_key", api_key)?;
        }

        let config = builder
            .add_source(
                Environment::with_prefix("FILING")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let Some(field) = missing_field(&err.to_string()) {
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    });
                }
                match err {
                    config::ConfigError::NotFound(field) => Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&qualify(None, &field)),
                    }),
                    other => Err(ConfigError::Other(other)),
                }
            }
        }
    }
}

/// Dotted key of the field named in a "missing field" deserialization error
fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let (field, rest) = rest.split_once('`')?;
    let parent = rest
        .strip_prefix(" for key `")
        .and_then(|r| r.strip_suffix('`'))
        .filter(|key| !key.is_empty());

    Some(qualify(parent, field))
}

fn qualify(parent: Option<&str>, field: &str) -> String {
    match (parent, field) {
        (Some(parent), field) => format!("{}.{}", parent, field),
        (None, field) if field.contains('.') => field.to_string(),
        // Only the provider section has required fields
        (None, "provider") => "provider.type".to_string(),
        (None, field) => format!("provider.{}", field),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_google_host() -> String {
    google::GOOGLE_HOST.to_string()
}

fn default_google_model() -> String {
    google::GOOGLE_MODEL.to_string()
}

fn default_provider_timeout() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}

fn default_search_host() -> String {
    SERPER_HOST.to_string()
}

fn default_search_timeout() -> u64 {
    30
}

fn default_max_rounds() -> usize {
    DEFAULT_MAX_ROUNDS
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("FILING_") || key == "GOOGLE_API_KEY" || key == "SERPER_API_KEY" {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("FILING_PROVIDER__TYPE", "google");
        env::set_var("FILING_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.search.api_key, None);
        assert_eq!(settings.search.host, "https://google.serper.dev");
        assert_eq!(settings.search.timeout_secs, 30);
        assert_eq!(settings.agent.max_rounds, 20);

        if let ProviderSettings::Google {
            host,
            api_key,
            model,
            temperature,
            timeout_secs,
            ..
        } = settings.provider
        {
            assert_eq!(host, "https://generativelanguage.googleapis.com");
            assert_eq!(api_key, "test-key");
            assert_eq!(model, "gemini-2.5-pro");
            assert_eq!(temperature, None);
            assert_eq!(timeout_secs, 120);
        } else {
            panic!("Expected Google provider");
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clean_env();
        env::set_var("FILING_SERVER__PORT", "8080");
        env::set_var("FILING_PROVIDER__TYPE", "google");
        env::set_var("FILING_PROVIDER__API_KEY", "test-key");
        env::set_var("FILING_PROVIDER__MODEL", "gemini-2.5-flash");
        env::set_var("FILING_PROVIDER__TEMPERATURE", "0.2");
        env::set_var("FILING_PROVIDER__MAX_TOKENS", "2000");
        env::set_var("FILING_AGENT__MAX_ROUNDS", "8");
        env::set_var("FILING_SEARCH__TIMEOUT_SECS", "5");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.agent.max_rounds, 8);
        assert_eq!(settings.search.timeout_secs, 5);

        let ProviderConfig::Google(config) = settings.provider.into_config();
        assert_eq!(config.host, "https://generativelanguage.googleapis.com");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(2000));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_legacy_google_key_is_not_reused_for_other_providers() {
        clean_env();
        env::set_var("GOOGLE_API_KEY", "legacy-google");
        env::set_var("FILING_PROVIDER__TYPE", "openai");

        assert!(Settings::new().is_err());

        clean_env();
    }

    #[test]
    #[serial]
    fn test_legacy_variables_are_fallbacks() {
        clean_env();
        env::set_var("GOOGLE_API_KEY", "legacy-google");
        env::set_var("SERPER_API_KEY", "legacy-serper");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.search.api_key.as_deref(), Some("legacy-serper"));
        match &settings.provider {
            ProviderSettings::Google { api_key, .. } => assert_eq!(api_key, "legacy-google"),
            other => panic!("Expected Google provider, got {:?}", other),
        }

        // Prefixed variables win
        env::set_var("FILING_SEARCH__API_KEY", "current-serper");
        let settings = Settings::new().unwrap();
        assert_eq!(settings.search.api_key.as_deref(), Some("current-serper"));

        let system = settings.search.into_system_config();
        assert_eq!(system.search_api_key.as_deref(), Some("current-serper"));
        assert_eq!(system.document_timeout_secs, 10);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_provider_type() {
        clean_env();

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "FILING_PROVIDER__TYPE")
            }
            other => panic!("Expected missing provider type, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_parsing() {
        assert_eq!(
            missing_field("missing field `api_key` for key `provider`").as_deref(),
            Some("provider.api_key")
        );
        assert_eq!(missing_field("missing field `type`").as_deref(), Some("provider.type"));
        assert_eq!(missing_field("invalid type: string"), None);
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server = ServerSettings::default();
        assert_eq!(server.socket_addr().unwrap().to_string(), "127.0.0.1:8000");

        let bad = ServerSettings {
            host: "not a host".to_string(),
            port: 1,
        };
        assert!(matches!(
            bad.socket_addr(),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }
}
